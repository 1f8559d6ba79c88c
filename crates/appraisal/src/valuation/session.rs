use chrono::NaiveDate;
use tracing::debug;

use super::domain::{validate_weight, Comparable, ComparableId, ComparableListing, SubjectProperty};
use super::engine::{
    aggregate, compose_adjustment, validate_discount, AggregationMethod, CompositionBreakdown,
    PricePoint, ValuationEngine,
};
use super::error::ValuationError;
use super::factors::AdjustmentFactorKind;
use super::report::ValuationReport;

/// Comparables needed before the workflow may move past comparable collection.
pub const MINIMUM_COMPARABLES: usize = 4;
pub const DEFAULT_DISCOUNT: f64 = 10.0;

/// Working state of one appraisal.
///
/// Every mutating call recomputes its downstream values before returning:
/// discount → normalized and adjusted prices → reference price. The composed
/// value is derived on demand from the cached reference price.
#[derive(Debug, Clone)]
pub struct ValuationSession {
    engine: ValuationEngine,
    subject: SubjectProperty,
    discount: f64,
    method: AggregationMethod,
    comparables: Vec<Comparable>,
    next_id: u32,
    reference_price: Option<f64>,
}

impl ValuationSession {
    pub fn new(subject: SubjectProperty) -> Result<Self, ValuationError> {
        Self::with_engine(
            subject,
            ValuationEngine::default(),
            DEFAULT_DISCOUNT,
            AggregationMethod::default(),
        )
    }

    pub fn with_engine(
        subject: SubjectProperty,
        engine: ValuationEngine,
        discount: f64,
        method: AggregationMethod,
    ) -> Result<Self, ValuationError> {
        subject.validate()?;
        let discount = validate_discount(discount)?;

        Ok(Self {
            engine,
            subject,
            discount,
            method,
            comparables: Vec::new(),
            next_id: 1,
            reference_price: None,
        })
    }

    pub fn engine(&self) -> &ValuationEngine {
        &self.engine
    }

    pub fn subject(&self) -> &SubjectProperty {
        &self.subject
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn method(&self) -> AggregationMethod {
        self.method
    }

    pub fn comparables(&self) -> &[Comparable] {
        &self.comparables
    }

    pub fn comparable(&self, id: ComparableId) -> Option<&Comparable> {
        self.comparables.iter().find(|comparable| comparable.id == id)
    }

    /// Cached reference price; `None` until at least one comparable is priced.
    pub fn reference_price(&self) -> Option<f64> {
        self.reference_price
    }

    /// Validate, price, and append a comparable. Initial factors go through the bounded path.
    pub fn add_comparable(
        &mut self,
        listing: ComparableListing,
    ) -> Result<ComparableId, ValuationError> {
        let comparable = self.build_comparable(ComparableId(self.next_id), listing)?;
        let id = comparable.id;

        self.next_id += 1;
        self.comparables.push(comparable);
        self.refresh_reference()?;

        debug!(comparable = %id, count = self.comparables.len(), "comparable added");
        Ok(id)
    }

    /// Replace a comparable's data in place, keeping its identifier.
    pub fn update_comparable(
        &mut self,
        id: ComparableId,
        listing: ComparableListing,
    ) -> Result<(), ValuationError> {
        let index = self.index_of(id)?;
        let comparable = self.build_comparable(id, listing)?;
        self.comparables[index] = comparable;
        self.refresh_reference()?;
        Ok(())
    }

    pub fn remove_comparable(&mut self, id: ComparableId) -> Result<Comparable, ValuationError> {
        let index = self.index_of(id)?;
        let removed = self.comparables.remove(index);
        self.refresh_reference()?;

        debug!(comparable = %id, count = self.comparables.len(), "comparable removed");
        Ok(removed)
    }

    /// Change the negotiation discount and reprice every comparable in one pass.
    ///
    /// An invalid discount leaves the session untouched.
    pub fn set_discount(&mut self, discount: f64) -> Result<(), ValuationError> {
        let discount = validate_discount(discount)?;

        let repriced = self
            .comparables
            .iter()
            .map(|comparable| self.engine.price(comparable, discount))
            .collect::<Result<Vec<_>, _>>()?;

        for (comparable, pricing) in self.comparables.iter_mut().zip(repriced) {
            comparable.normalized_price = pricing.normalized_price;
            comparable.adjusted_price = pricing.adjusted_price;
        }
        self.discount = discount;
        self.refresh_reference()?;
        Ok(())
    }

    /// Assign a factor value, failing with `OutOfRange` when it exceeds the factor's weight.
    pub fn set_factor(
        &mut self,
        id: ComparableId,
        factor: AdjustmentFactorKind,
        value: f64,
    ) -> Result<f64, ValuationError> {
        let value = self.engine.catalog().check(factor, value)?;
        self.assign_factor(id, factor, value)
    }

    /// Assign a factor value, clamping it into the factor's bound.
    pub fn set_factor_clamped(
        &mut self,
        id: ComparableId,
        factor: AdjustmentFactorKind,
        value: f64,
    ) -> Result<f64, ValuationError> {
        let value = self.engine.catalog().clamp(factor, value)?;
        self.assign_factor(id, factor, value)
    }

    /// Drop a factor so it contributes zero again. Returns whether it was set.
    pub fn clear_factor(
        &mut self,
        id: ComparableId,
        factor: AdjustmentFactorKind,
    ) -> Result<bool, ValuationError> {
        let index = self.index_of(id)?;
        let cleared = self.comparables[index].factors.clear(factor);
        if cleared {
            self.readjust(index);
            self.refresh_reference()?;
        }
        Ok(cleared)
    }

    pub fn set_weight(&mut self, id: ComparableId, weight: f64) -> Result<(), ValuationError> {
        validate_weight(weight)?;
        let index = self.index_of(id)?;
        self.comparables[index].weight = weight;
        self.refresh_reference()?;
        Ok(())
    }

    pub fn set_method(&mut self, method: AggregationMethod) -> Result<(), ValuationError> {
        self.method = method;
        self.refresh_reference()
    }

    pub fn has_quorum(&self) -> bool {
        self.comparables.len() >= MINIMUM_COMPARABLES
    }

    /// Gate for leaving comparable collection.
    pub fn ensure_quorum(&self) -> Result<(), ValuationError> {
        if self.has_quorum() {
            Ok(())
        } else {
            Err(ValuationError::InsufficientData {
                required: MINIMUM_COMPARABLES,
                actual: self.comparables.len(),
            })
        }
    }

    /// Compose the subject's total value from the cached reference price.
    pub fn compose(&self) -> Result<CompositionBreakdown, ValuationError> {
        let reference_price = self.reference_price.ok_or_else(|| {
            ValuationError::InvalidState(
                "a reference price is required before composing the valuation".to_string(),
            )
        })?;
        Ok(self.engine.compose(&self.subject, reference_price))
    }

    pub fn report(&self, prepared_on: NaiveDate) -> ValuationReport {
        ValuationReport::from_session(self, prepared_on)
    }

    fn build_comparable(
        &self,
        id: ComparableId,
        listing: ComparableListing,
    ) -> Result<Comparable, ValuationError> {
        listing.validate()?;

        let mut initial = Vec::with_capacity(listing.factors.len());
        for (factor, value) in &listing.factors {
            initial.push((*factor, self.engine.catalog().check(*factor, *value)?));
        }

        let mut comparable = Comparable::from_listing(id, listing);
        for (factor, value) in initial {
            comparable.factors.assign(factor, value);
        }

        let pricing = self.engine.price(&comparable, self.discount)?;
        comparable.normalized_price = pricing.normalized_price;
        comparable.adjusted_price = pricing.adjusted_price;
        Ok(comparable)
    }

    fn assign_factor(
        &mut self,
        id: ComparableId,
        factor: AdjustmentFactorKind,
        value: f64,
    ) -> Result<f64, ValuationError> {
        let index = self.index_of(id)?;
        self.comparables[index].factors.assign(factor, value);
        self.readjust(index);
        self.refresh_reference()?;
        Ok(value)
    }

    fn readjust(&mut self, index: usize) {
        let comparable = &mut self.comparables[index];
        comparable.adjusted_price =
            compose_adjustment(comparable.normalized_price, &comparable.factors);
    }

    /// Only an empty working set leaves the reference undefined; other failures propagate.
    fn refresh_reference(&mut self) -> Result<(), ValuationError> {
        let points: Vec<PricePoint> = self
            .comparables
            .iter()
            .map(|comparable| PricePoint {
                price: comparable.adjusted_price,
                weight: comparable.weight,
            })
            .collect();

        self.reference_price = match aggregate(&points, self.method) {
            Ok(price) => Some(price),
            Err(ValuationError::InsufficientData { .. }) => None,
            Err(err) => {
                self.reference_price = None;
                return Err(err);
            }
        };
        debug!(
            method = self.method.key(),
            reference_price = ?self.reference_price,
            "reference price refreshed"
        );
        Ok(())
    }

    fn index_of(&self, id: ComparableId) -> Result<usize, ValuationError> {
        self.comparables
            .iter()
            .position(|comparable| comparable.id == id)
            .ok_or_else(|| {
                ValuationError::invalid("comparable_id", format!("no comparable with id {id}"))
            })
    }
}
