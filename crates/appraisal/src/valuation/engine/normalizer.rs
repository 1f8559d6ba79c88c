use super::super::error::ValuationError;

/// Per-unit-area price after the negotiation discount is taken off the sale price.
pub fn normalize_price(
    sale_price: f64,
    covered_area: f64,
    discount: f64,
) -> Result<f64, ValuationError> {
    if !sale_price.is_finite() || sale_price < 0.0 {
        return Err(ValuationError::invalid(
            "sale_price",
            format!("sale price must be a non-negative number, got {sale_price}"),
        ));
    }
    if !covered_area.is_finite() || covered_area <= 0.0 {
        return Err(ValuationError::invalid(
            "covered_area",
            format!("covered area must be greater than zero, got {covered_area}"),
        ));
    }
    let discount = validate_discount(discount)?;

    Ok(sale_price * (1.0 - discount / 100.0) / covered_area)
}

pub(crate) fn validate_discount(discount: f64) -> Result<f64, ValuationError> {
    if !discount.is_finite() || !(0.0..=100.0).contains(&discount) {
        return Err(ValuationError::invalid(
            "discount",
            format!("negotiation discount must be between 0 and 100, got {discount}"),
        ));
    }
    Ok(discount)
}
