use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ValuationError;
use super::factors::{AdjustmentFactorKind, FactorValues};

/// Broad classification of the appraised unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[default]
    Apartment,
    House,
    Townhouse,
    Office,
    Retail,
    Warehouse,
    Land,
}

/// Construction quality grade recorded for the subject property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    Economy,
    #[default]
    Standard,
    Good,
    VeryGood,
    Luxury,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParkingCategory {
    #[default]
    None,
    Shared,
    Private,
}

impl ParkingCategory {
    pub const fn label(self) -> &'static str {
        match self {
            ParkingCategory::None => "no parking",
            ParkingCategory::Shared => "shared parking",
            ParkingCategory::Private => "private parking",
        }
    }
}

/// Surface breakdown in square units. Only `covered` is mandatory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaBreakdown {
    pub covered: f64,
    #[serde(default)]
    pub semi_covered: f64,
    #[serde(default)]
    pub uncovered: f64,
    #[serde(default)]
    pub balcony: f64,
    #[serde(default)]
    pub land: f64,
}

impl AreaBreakdown {
    pub fn covered(covered: f64) -> Self {
        Self {
            covered,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self, scope: &str) -> Result<(), ValuationError> {
        if !self.covered.is_finite() || self.covered <= 0.0 {
            return Err(ValuationError::invalid(
                format!("{scope}.covered"),
                format!("covered area must be greater than zero, got {}", self.covered),
            ));
        }

        let optional = [
            ("semi_covered", self.semi_covered),
            ("uncovered", self.uncovered),
            ("balcony", self.balcony),
            ("land", self.land),
        ];
        for (name, value) in optional {
            if !value.is_finite() || value < 0.0 {
                return Err(ValuationError::invalid(
                    format!("{scope}.{name}"),
                    format!("area must be a non-negative number, got {value}"),
                ));
            }
        }

        Ok(())
    }
}

/// The property being appraised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProperty {
    #[serde(default)]
    pub property_type: PropertyType,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub age_years: Option<u16>,
    #[serde(default)]
    pub quality: QualityGrade,
    pub areas: AreaBreakdown,
    #[serde(default)]
    pub parking: ParkingCategory,
}

impl SubjectProperty {
    pub fn new(areas: AreaBreakdown) -> Self {
        Self {
            property_type: PropertyType::default(),
            address: String::new(),
            locality: String::new(),
            neighborhood: String::new(),
            age_years: None,
            quality: QualityGrade::default(),
            areas,
            parking: ParkingCategory::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValuationError> {
        self.areas.validate("subject.areas")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComparableId(pub u32);

impl fmt::Display for ComparableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn default_weight() -> f64 {
    1.0
}

/// Caller-supplied description of a comparable sale before it joins a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableListing {
    #[serde(default)]
    pub address: String,
    pub sale_price: f64,
    pub areas: AreaBreakdown,
    #[serde(default)]
    pub sold_on: Option<NaiveDate>,
    #[serde(default)]
    pub factors: BTreeMap<AdjustmentFactorKind, f64>,
    /// Relative influence under the weighted-mean method.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl ComparableListing {
    pub fn new(sale_price: f64, areas: AreaBreakdown) -> Self {
        Self {
            address: String::new(),
            sale_price,
            areas,
            sold_on: None,
            factors: BTreeMap::new(),
            weight: default_weight(),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_factor(mut self, factor: AdjustmentFactorKind, value: f64) -> Self {
        self.factors.insert(factor, value);
        self
    }

    /// Field-level validation shared by manual entry and bulk import.
    pub fn validate(&self) -> Result<(), ValuationError> {
        if !self.sale_price.is_finite() || self.sale_price <= 0.0 {
            return Err(ValuationError::invalid(
                "comparable.sale_price",
                format!("sale price must be greater than zero, got {}", self.sale_price),
            ));
        }
        validate_weight(self.weight)?;
        self.areas.validate("comparable.areas")
    }
}

pub(crate) fn validate_weight(weight: f64) -> Result<(), ValuationError> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(ValuationError::invalid(
            "comparable.weight",
            format!("weight must be a positive number, got {weight}"),
        ));
    }
    Ok(())
}

/// A comparable sale in the working set, with its derived per-unit-area prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparable {
    pub id: ComparableId,
    pub address: String,
    pub sale_price: f64,
    pub areas: AreaBreakdown,
    pub sold_on: Option<NaiveDate>,
    pub weight: f64,
    pub(crate) factors: FactorValues,
    pub(crate) normalized_price: f64,
    pub(crate) adjusted_price: f64,
}

impl Comparable {
    pub(crate) fn from_listing(id: ComparableId, listing: ComparableListing) -> Self {
        Self {
            id,
            address: listing.address,
            sale_price: listing.sale_price,
            areas: listing.areas,
            sold_on: listing.sold_on,
            weight: listing.weight,
            factors: FactorValues::default(),
            normalized_price: 0.0,
            adjusted_price: 0.0,
        }
    }

    pub fn factors(&self) -> &FactorValues {
        &self.factors
    }

    /// Sale price per covered unit after the negotiation discount.
    pub fn normalized_price(&self) -> f64 {
        self.normalized_price
    }

    /// Normalized price after applying every assigned adjustment factor.
    pub fn adjusted_price(&self) -> f64 {
        self.adjusted_price
    }

    pub fn total_adjustment(&self) -> f64 {
        self.factors.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_requires_positive_covered_area() {
        let subject = SubjectProperty::new(AreaBreakdown::covered(0.0));
        match subject.validate() {
            Err(ValuationError::InvalidInput { field, .. }) => {
                assert_eq!(field, "subject.areas.covered");
            }
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[test]
    fn negative_secondary_area_is_rejected() {
        let areas = AreaBreakdown {
            balcony: -2.0,
            ..AreaBreakdown::covered(50.0)
        };
        let err = areas.validate("subject.areas").expect_err("negative balcony");
        assert!(err.to_string().contains("subject.areas.balcony"));
    }

    #[test]
    fn listing_defaults_fill_optional_fields() {
        let listing: ComparableListing = serde_json::from_value(serde_json::json!({
            "sale_price": 125000.0,
            "areas": { "covered": 100.0 }
        }))
        .expect("listing deserializes");

        assert_eq!(listing.weight, 1.0);
        assert!(listing.factors.is_empty());
        assert_eq!(listing.areas.semi_covered, 0.0);
        listing.validate().expect("listing is valid");
    }

    #[test]
    fn listing_rejects_zero_price() {
        let listing = ComparableListing::new(0.0, AreaBreakdown::covered(80.0));
        assert_eq!(
            listing.validate().map_err(|err| err.kind()),
            Err("invalid_input")
        );
    }
}
