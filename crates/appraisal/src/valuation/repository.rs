use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::report::ValuationReport;
use super::session::ValuationSession;

/// Identifier wrapper for appraisal sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppraisalId(pub String);

/// Repository record holding one live valuation session.
#[derive(Debug, Clone)]
pub struct AppraisalRecord {
    pub appraisal_id: AppraisalId,
    pub created_on: NaiveDate,
    pub session: ValuationSession,
}

impl AppraisalRecord {
    pub fn view(&self, prepared_on: NaiveDate) -> AppraisalView {
        AppraisalView {
            appraisal_id: self.appraisal_id.clone(),
            created_on: self.created_on,
            report: self.session.report(prepared_on),
        }
    }
}

/// Storage abstraction so the service can be exercised without a backing store.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, record: AppraisalRecord) -> Result<AppraisalRecord, RepositoryError>;
    fn fetch(&self, id: &AppraisalId) -> Result<Option<AppraisalRecord>, RepositoryError>;

    /// Read, change, and store one record as a single step.
    ///
    /// Implementations hold their lock for the whole call so concurrent edits to the
    /// same appraisal are serialized. `apply` works on a staged copy; the stored record
    /// is replaced only when it succeeds. Returns the closure's value and the stored record.
    fn modify<T, E, F>(&self, id: &AppraisalId, apply: F) -> Result<(T, AppraisalRecord), E>
    where
        F: FnOnce(&mut AppraisalRecord) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Shared body of [`SessionRepository::modify`] for map-backed stores.
///
/// The caller must already hold the lock guarding `records`.
pub fn modify_in_place<T, E, F>(
    records: &mut HashMap<AppraisalId, AppraisalRecord>,
    id: &AppraisalId,
    apply: F,
) -> Result<(T, AppraisalRecord), E>
where
    F: FnOnce(&mut AppraisalRecord) -> Result<T, E>,
    E: From<RepositoryError>,
{
    let slot = records.get_mut(id).ok_or(RepositoryError::NotFound)?;
    let mut staged = slot.clone();
    let outcome = apply(&mut staged)?;
    *slot = staged.clone();
    Ok((outcome, staged))
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("appraisal already exists")]
    Conflict,
    #[error("appraisal not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Serialized shape of an appraisal returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct AppraisalView {
    pub appraisal_id: AppraisalId,
    pub created_on: NaiveDate,
    pub report: ValuationReport,
}
