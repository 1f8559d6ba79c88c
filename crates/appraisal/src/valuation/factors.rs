use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ValuationError;

/// Qualitative differences a comparable can be corrected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentFactorKind {
    Location,
    Condition,
    Age,
    Quality,
    Size,
    Layout,
    Amenities,
}

impl AdjustmentFactorKind {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Location,
            Self::Condition,
            Self::Age,
            Self::Quality,
            Self::Size,
            Self::Layout,
            Self::Amenities,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Condition => "condition",
            Self::Age => "age",
            Self::Quality => "quality",
            Self::Size => "size",
            Self::Layout => "layout",
            Self::Amenities => "amenities",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::Condition => "Condition",
            Self::Age => "Age",
            Self::Quality => "Construction quality",
            Self::Size => "Size",
            Self::Layout => "Layout",
            Self::Amenities => "Amenities",
        }
    }

    const fn standard_weight(self) -> f64 {
        match self {
            Self::Location => 20.0,
            Self::Condition => 15.0,
            Self::Age | Self::Quality | Self::Size => 10.0,
            Self::Layout | Self::Amenities => 5.0,
        }
    }
}

impl fmt::Display for AdjustmentFactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for AdjustmentFactorKind {
    type Err = ValuationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|factor| factor.key() == needle)
            .ok_or_else(|| {
                ValuationError::invalid("factor", format!("unknown adjustment factor '{value}'"))
            })
    }
}

/// Catalog entry exposed to callers building adjustment forms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorEntry {
    pub factor: AdjustmentFactorKind,
    pub label: &'static str,
    pub weight: f64,
}

/// Process-wide mapping of factor to its maximum absolute percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorCatalog {
    weights: BTreeMap<AdjustmentFactorKind, f64>,
}

impl FactorCatalog {
    pub fn standard() -> Self {
        let weights = AdjustmentFactorKind::ordered()
            .into_iter()
            .map(|factor| (factor, factor.standard_weight()))
            .collect();
        Self { weights }
    }

    /// Build a custom catalog. Weights must be finite and positive, and each factor listed once.
    pub fn new<I>(entries: I) -> Result<Self, ValuationError>
    where
        I: IntoIterator<Item = (AdjustmentFactorKind, f64)>,
    {
        let mut weights = BTreeMap::new();
        for (factor, weight) in entries {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(ValuationError::invalid(
                    format!("weight.{}", factor.key()),
                    format!("weight must be a positive number, got {weight}"),
                ));
            }
            if weights.insert(factor, weight).is_some() {
                return Err(ValuationError::invalid(
                    format!("weight.{}", factor.key()),
                    "factor listed more than once",
                ));
            }
        }

        if weights.is_empty() {
            return Err(ValuationError::invalid(
                "catalog",
                "at least one adjustment factor is required",
            ));
        }

        Ok(Self { weights })
    }

    pub fn weight(&self, factor: AdjustmentFactorKind) -> Option<f64> {
        self.weights.get(&factor).copied()
    }

    pub fn entries(&self) -> Vec<FactorEntry> {
        self.weights
            .iter()
            .map(|(factor, weight)| FactorEntry {
                factor: *factor,
                label: factor.label(),
                weight: *weight,
            })
            .collect()
    }

    /// Accept `value` only when it lies within the factor's weight bound.
    pub fn check(&self, factor: AdjustmentFactorKind, value: f64) -> Result<f64, ValuationError> {
        let weight = self.bound(factor, value)?;
        if value.abs() > weight {
            return Err(ValuationError::OutOfRange {
                factor,
                value,
                weight,
            });
        }
        Ok(value)
    }

    /// Pull `value` back into `[-weight, +weight]` instead of rejecting it.
    pub fn clamp(&self, factor: AdjustmentFactorKind, value: f64) -> Result<f64, ValuationError> {
        let weight = self.bound(factor, value)?;
        Ok(value.clamp(-weight, weight))
    }

    fn bound(&self, factor: AdjustmentFactorKind, value: f64) -> Result<f64, ValuationError> {
        if !value.is_finite() {
            return Err(ValuationError::invalid(
                format!("factor.{}", factor.key()),
                "adjustment must be a finite number",
            ));
        }
        self.weight(factor).ok_or_else(|| {
            ValuationError::invalid(
                format!("factor.{}", factor.key()),
                "factor is not part of the active catalog",
            )
        })
    }
}

impl Default for FactorCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Percentage values currently assigned to one comparable. Unset factors read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FactorValues(BTreeMap<AdjustmentFactorKind, f64>);

impl FactorValues {
    pub fn get(&self, factor: AdjustmentFactorKind) -> f64 {
        self.0.get(&factor).copied().unwrap_or(0.0)
    }

    pub fn is_set(&self, factor: AdjustmentFactorKind) -> bool {
        self.0.contains_key(&factor)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AdjustmentFactorKind, f64)> + '_ {
        self.0.iter().map(|(factor, value)| (*factor, *value))
    }

    /// Sum of every assigned percentage.
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub(crate) fn assign(&mut self, factor: AdjustmentFactorKind, value: f64) {
        self.0.insert(factor, value);
    }

    pub(crate) fn clear(&mut self, factor: AdjustmentFactorKind) -> bool {
        self.0.remove(&factor).is_some()
    }

    pub(crate) fn as_map(&self) -> &BTreeMap<AdjustmentFactorKind, f64> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_covers_every_factor() {
        let catalog = FactorCatalog::standard();
        assert_eq!(catalog.entries().len(), AdjustmentFactorKind::ordered().len());
        assert_eq!(catalog.weight(AdjustmentFactorKind::Location), Some(20.0));
        assert_eq!(catalog.weight(AdjustmentFactorKind::Amenities), Some(5.0));
    }

    #[test]
    fn check_rejects_values_beyond_weight() {
        let catalog = FactorCatalog::standard();
        assert_eq!(catalog.check(AdjustmentFactorKind::Layout, -5.0), Ok(-5.0));

        match catalog.check(AdjustmentFactorKind::Layout, 5.5) {
            Err(ValuationError::OutOfRange { factor, weight, .. }) => {
                assert_eq!(factor, AdjustmentFactorKind::Layout);
                assert_eq!(weight, 5.0);
            }
            other => panic!("expected out of range, got {other:?}"),
        }
    }

    #[test]
    fn clamp_pulls_values_into_bounds() {
        let catalog = FactorCatalog::standard();
        assert_eq!(catalog.clamp(AdjustmentFactorKind::Age, 42.0), Ok(10.0));
        assert_eq!(catalog.clamp(AdjustmentFactorKind::Age, -42.0), Ok(-10.0));
        assert!(catalog.clamp(AdjustmentFactorKind::Age, f64::NAN).is_err());
    }

    #[test]
    fn custom_catalog_rejects_non_positive_weights() {
        let err = FactorCatalog::new([(AdjustmentFactorKind::Size, 0.0)])
            .expect_err("zero weight rejected");
        assert_eq!(err.kind(), "invalid_input");

        let catalog = FactorCatalog::new([(AdjustmentFactorKind::Size, 8.0)]).expect("valid");
        assert!(catalog.check(AdjustmentFactorKind::Location, 1.0).is_err());
    }

    #[test]
    fn factor_keys_parse_case_insensitively() {
        assert_eq!(
            " Location ".parse::<AdjustmentFactorKind>(),
            Ok(AdjustmentFactorKind::Location)
        );
        assert!("view".parse::<AdjustmentFactorKind>().is_err());
    }
}
