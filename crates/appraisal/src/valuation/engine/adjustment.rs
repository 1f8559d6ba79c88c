use super::super::factors::FactorValues;

/// Apply the summed factor percentages to a normalized price.
///
/// Values are trusted: bounds are enforced when a factor is assigned, not here.
pub fn compose_adjustment(normalized_price: f64, factors: &FactorValues) -> f64 {
    apply_total_adjustment(normalized_price, factors.total())
}

pub fn apply_total_adjustment(normalized_price: f64, total_adjustment: f64) -> f64 {
    normalized_price * (1.0 + total_adjustment / 100.0)
}
