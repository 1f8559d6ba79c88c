//! Comparable-sales valuation: normalization, adjustment, aggregation, and composition.
//!
//! A [`ValuationSession`] owns the working set for one appraisal and keeps every derived
//! price current as the discount, factors, weights, or method change. The service and
//! router layers expose sessions to external callers without adding calculation logic.

pub mod domain;
pub mod engine;
pub mod error;
pub mod factors;
pub mod import;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use domain::{
    AreaBreakdown, Comparable, ComparableId, ComparableListing, ParkingCategory, PropertyType,
    QualityGrade, SubjectProperty,
};
pub use engine::{
    aggregate, aggregate_prices, compose_adjustment, compose_value, normalize_price,
    AggregationMethod, AreaKind, CompositionBreakdown, ParkingRates, PricePoint, ValuationEngine,
};
pub use error::ValuationError;
pub use factors::{AdjustmentFactorKind, FactorCatalog, FactorEntry, FactorValues};
pub use import::{ComparableImportError, ComparableImporter};
pub use report::{ComparableRow, ValuationReport};
pub use repository::{
    modify_in_place, AppraisalId, AppraisalRecord, AppraisalView, RepositoryError,
    SessionRepository,
};
pub use router::appraisal_router;
pub use service::{
    AppraisalService, AppraisalServiceError, CreateAppraisal, SessionDefaults, ValuationRequest,
};
pub use session::{ValuationSession, DEFAULT_DISCOUNT, MINIMUM_COMPARABLES};
