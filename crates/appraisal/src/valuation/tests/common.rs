use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use serde_json::Value;

use crate::valuation::domain::{
    AreaBreakdown, ComparableListing, ParkingCategory, PropertyType, QualityGrade,
    SubjectProperty,
};
use crate::valuation::engine::ValuationEngine;
use crate::valuation::factors::AdjustmentFactorKind;
use crate::valuation::repository::{
    modify_in_place, AppraisalId, AppraisalRecord, RepositoryError, SessionRepository,
};
use crate::valuation::service::{AppraisalService, SessionDefaults};
use crate::valuation::session::ValuationSession;

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

pub(super) fn subject() -> SubjectProperty {
    SubjectProperty {
        property_type: PropertyType::Apartment,
        address: "Av. Santa Fe 2150, 4B".to_string(),
        locality: "CABA".to_string(),
        neighborhood: "Recoleta".to_string(),
        age_years: Some(25),
        quality: QualityGrade::Good,
        areas: AreaBreakdown {
            covered: 100.0,
            semi_covered: 20.0,
            uncovered: 30.0,
            balcony: 10.0,
            land: 0.0,
        },
        parking: ParkingCategory::None,
    }
}

/// Normalizes to 1000/m² without discount and adjusts +13% to 1130/m².
pub(super) fn premium_listing() -> ComparableListing {
    ComparableListing::new(100_000.0, AreaBreakdown::covered(100.0))
        .with_address("Arenales 1800")
        .with_factor(AdjustmentFactorKind::Location, 10.0)
        .with_factor(AdjustmentFactorKind::Condition, 3.0)
}

/// Normalizes to 1200/m² without discount and adjusts -10% to 1080/m².
pub(super) fn dated_listing() -> ComparableListing {
    ComparableListing::new(120_000.0, AreaBreakdown::covered(100.0))
        .with_address("Juncal 2400")
        .with_factor(AdjustmentFactorKind::Age, -10.0)
}

pub(super) fn plain_listing(sale_price: f64, covered: f64) -> ComparableListing {
    ComparableListing::new(sale_price, AreaBreakdown::covered(covered))
}

pub(super) fn session_without_discount() -> ValuationSession {
    let mut session = ValuationSession::new(subject()).expect("valid subject");
    session.set_discount(0.0).expect("zero discount accepted");
    session
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<AppraisalId, AppraisalRecord>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, record: AppraisalRecord) -> Result<AppraisalRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.appraisal_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.appraisal_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &AppraisalId) -> Result<Option<AppraisalRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn modify<T, E, F>(&self, id: &AppraisalId, apply: F) -> Result<(T, AppraisalRecord), E>
    where
        F: FnOnce(&mut AppraisalRecord) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        modify_in_place(&mut guard, id, apply)
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _record: AppraisalRecord) -> Result<AppraisalRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _id: &AppraisalId) -> Result<Option<AppraisalRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn modify<T, E, F>(&self, _id: &AppraisalId, _apply: F) -> Result<(T, AppraisalRecord), E>
    where
        F: FnOnce(&mut AppraisalRecord) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("store offline".to_string()).into())
    }
}

pub(super) fn service_with<R>(repository: R) -> AppraisalService<R>
where
    R: SessionRepository + 'static,
{
    AppraisalService::new(
        Arc::new(repository),
        ValuationEngine::default(),
        SessionDefaults::default(),
    )
}

pub(super) fn memory_service() -> AppraisalService<MemoryRepository> {
    service_with(MemoryRepository::default())
}

pub(super) fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
