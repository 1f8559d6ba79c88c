mod adjustment;
mod aggregation;
mod composition;
mod normalizer;

pub use adjustment::{apply_total_adjustment, compose_adjustment};
pub use aggregation::{aggregate, aggregate_prices, AggregationMethod, PricePoint};
pub use composition::{
    compose_value, AreaKind, AreaPartial, CompositionBreakdown, ParkingRates, BALCONY_COEFFICIENT,
    COVERED_COEFFICIENT, SEMI_COVERED_COEFFICIENT, UNCOVERED_COEFFICIENT,
};
pub use normalizer::normalize_price;

pub(crate) use normalizer::validate_discount;

use super::domain::{Comparable, SubjectProperty};
use super::error::ValuationError;
use super::factors::FactorCatalog;

/// Derived prices for one comparable at a given discount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparablePricing {
    pub normalized_price: f64,
    pub adjusted_price: f64,
}

/// Read-only configuration shared by every calculation in a session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValuationEngine {
    catalog: FactorCatalog,
    parking_rates: ParkingRates,
}

impl ValuationEngine {
    pub fn new(catalog: FactorCatalog, parking_rates: ParkingRates) -> Self {
        Self {
            catalog,
            parking_rates,
        }
    }

    pub fn catalog(&self) -> &FactorCatalog {
        &self.catalog
    }

    pub fn parking_rates(&self) -> &ParkingRates {
        &self.parking_rates
    }

    /// Normalize then adjust a comparable's sale price.
    pub fn price(
        &self,
        comparable: &Comparable,
        discount: f64,
    ) -> Result<ComparablePricing, ValuationError> {
        let normalized_price =
            normalize_price(comparable.sale_price, comparable.areas.covered, discount)?;
        let adjusted_price = compose_adjustment(normalized_price, comparable.factors());
        Ok(ComparablePricing {
            normalized_price,
            adjusted_price,
        })
    }

    pub fn compose(
        &self,
        subject: &SubjectProperty,
        reference_price: f64,
    ) -> CompositionBreakdown {
        compose_value(
            &subject.areas,
            subject.parking,
            reference_price,
            &self.parking_rates,
        )
    }
}
