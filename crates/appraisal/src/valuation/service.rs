use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};

use super::domain::{ComparableId, ComparableListing, SubjectProperty};
use super::engine::{AggregationMethod, ValuationEngine};
use super::error::ValuationError;
use super::factors::{AdjustmentFactorKind, FactorCatalog};
use super::report::ValuationReport;
use super::repository::{AppraisalId, AppraisalRecord, RepositoryError, SessionRepository};
use super::session::{ValuationSession, DEFAULT_DISCOUNT};

/// Values applied to new sessions when the caller leaves them out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionDefaults {
    pub discount: f64,
    pub method: AggregationMethod,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            discount: DEFAULT_DISCOUNT,
            method: AggregationMethod::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppraisal {
    pub subject: SubjectProperty,
    #[serde(default)]
    pub discount: Option<f64>,
    #[serde(default)]
    pub method: Option<AggregationMethod>,
}

/// Everything needed for a one-shot valuation without a stored session.
#[derive(Debug, Clone, Deserialize)]
pub struct ValuationRequest {
    pub subject: SubjectProperty,
    #[serde(default)]
    pub comparables: Vec<ComparableListing>,
    #[serde(default)]
    pub discount: Option<f64>,
    #[serde(default)]
    pub method: Option<AggregationMethod>,
}

/// Service driving appraisal sessions through the repository.
pub struct AppraisalService<R> {
    repository: Arc<R>,
    engine: ValuationEngine,
    defaults: SessionDefaults,
}

static APPRAISAL_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_appraisal_id() -> AppraisalId {
    let id = APPRAISAL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AppraisalId(format!("apr-{id:06}"))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl<R> AppraisalService<R>
where
    R: SessionRepository + 'static,
{
    pub fn new(repository: Arc<R>, engine: ValuationEngine, defaults: SessionDefaults) -> Self {
        Self {
            repository,
            engine,
            defaults,
        }
    }

    pub fn catalog(&self) -> &FactorCatalog {
        self.engine.catalog()
    }

    /// Open a session for a subject property.
    pub fn create(&self, request: CreateAppraisal) -> Result<AppraisalRecord, AppraisalServiceError> {
        let session = self.open_session(request.subject, request.discount, request.method)?;
        let record = AppraisalRecord {
            appraisal_id: next_appraisal_id(),
            created_on: today(),
            session,
        };

        let stored = self.repository.insert(record)?;
        info!(appraisal = %stored.appraisal_id.0, "appraisal session created");
        Ok(stored)
    }

    pub fn get(&self, appraisal_id: &AppraisalId) -> Result<AppraisalRecord, AppraisalServiceError> {
        let record = self
            .repository
            .fetch(appraisal_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn add_comparable(
        &self,
        appraisal_id: &AppraisalId,
        listing: ComparableListing,
    ) -> Result<(ComparableId, AppraisalRecord), AppraisalServiceError> {
        let (comparable_id, record) =
            self.mutate(appraisal_id, |session| session.add_comparable(listing))?;

        info!(
            appraisal = %appraisal_id.0,
            comparable = %comparable_id,
            "comparable added to appraisal"
        );
        Ok((comparable_id, record))
    }

    pub fn remove_comparable(
        &self,
        appraisal_id: &AppraisalId,
        comparable_id: ComparableId,
    ) -> Result<AppraisalRecord, AppraisalServiceError> {
        self.mutate(appraisal_id, |session| session.remove_comparable(comparable_id))
            .map(|(_, record)| record)
    }

    pub fn set_factor(
        &self,
        appraisal_id: &AppraisalId,
        comparable_id: ComparableId,
        factor: AdjustmentFactorKind,
        value: f64,
    ) -> Result<AppraisalRecord, AppraisalServiceError> {
        self.mutate(appraisal_id, |session| {
            session.set_factor(comparable_id, factor, value)
        })
        .map(|(_, record)| record)
    }

    pub fn set_weight(
        &self,
        appraisal_id: &AppraisalId,
        comparable_id: ComparableId,
        weight: f64,
    ) -> Result<AppraisalRecord, AppraisalServiceError> {
        self.mutate(appraisal_id, |session| session.set_weight(comparable_id, weight))
            .map(|(_, record)| record)
    }

    pub fn set_discount(
        &self,
        appraisal_id: &AppraisalId,
        discount: f64,
    ) -> Result<AppraisalRecord, AppraisalServiceError> {
        self.mutate(appraisal_id, |session| session.set_discount(discount))
            .map(|(_, record)| record)
    }

    pub fn set_method(
        &self,
        appraisal_id: &AppraisalId,
        method: AggregationMethod,
    ) -> Result<AppraisalRecord, AppraisalServiceError> {
        self.mutate(appraisal_id, |session| session.set_method(method))
            .map(|(_, record)| record)
    }

    /// Check the comparable quorum before the workflow leaves comparable collection.
    pub fn advance(&self, appraisal_id: &AppraisalId) -> Result<AppraisalRecord, AppraisalServiceError> {
        let record = self.get(appraisal_id)?;
        record.session.ensure_quorum()?;
        Ok(record)
    }

    /// Run a full valuation in one call without touching the repository.
    pub fn valuate(&self, request: ValuationRequest) -> Result<ValuationReport, AppraisalServiceError> {
        let mut session = self.open_session(request.subject, request.discount, request.method)?;
        for listing in request.comparables {
            session.add_comparable(listing)?;
        }
        if session.reference_price().is_none() {
            return Err(ValuationError::InsufficientData {
                required: 1,
                actual: session.comparables().len(),
            }
            .into());
        }

        debug!(
            comparables = session.comparables().len(),
            reference_price = ?session.reference_price(),
            "one-shot valuation computed"
        );
        Ok(session.report(today()))
    }

    fn open_session(
        &self,
        subject: SubjectProperty,
        discount: Option<f64>,
        method: Option<AggregationMethod>,
    ) -> Result<ValuationSession, ValuationError> {
        ValuationSession::with_engine(
            subject,
            self.engine.clone(),
            discount.unwrap_or(self.defaults.discount),
            method.unwrap_or(self.defaults.method),
        )
    }

    /// Apply one session mutation under the repository lock. Failed mutations are not stored.
    fn mutate<T, F>(
        &self,
        appraisal_id: &AppraisalId,
        apply: F,
    ) -> Result<(T, AppraisalRecord), AppraisalServiceError>
    where
        F: FnOnce(&mut ValuationSession) -> Result<T, ValuationError>,
    {
        let (outcome, record) = self
            .repository
            .modify(appraisal_id, |record: &mut AppraisalRecord| {
                apply(&mut record.session).map_err(AppraisalServiceError::from)
            })?;
        debug!(
            appraisal = %appraisal_id.0,
            reference_price = ?record.session.reference_price(),
            "appraisal updated"
        );
        Ok((outcome, record))
    }

    /// Date stamped on reports rendered for API responses.
    pub fn report_date(&self) -> NaiveDate {
        today()
    }
}

/// Error raised by the appraisal service.
#[derive(Debug, thiserror::Error)]
pub enum AppraisalServiceError {
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
