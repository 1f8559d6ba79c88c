use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ComparableId, ComparableListing};
use super::engine::AggregationMethod;
use super::error::ValuationError;
use super::factors::AdjustmentFactorKind;
use super::repository::{AppraisalId, AppraisalRecord, RepositoryError, SessionRepository};
use super::service::{AppraisalService, AppraisalServiceError, CreateAppraisal, ValuationRequest};

type SharedService<R> = Arc<AppraisalService<R>>;

#[derive(Debug, Deserialize)]
pub(crate) struct FactorValueRequest {
    pub(crate) value: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WeightRequest {
    pub(crate) weight: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiscountRequest {
    pub(crate) discount: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MethodRequest {
    pub(crate) method: AggregationMethod,
}

/// Router builder exposing the appraisal wizard endpoints.
pub fn appraisal_router<R>(service: SharedService<R>) -> Router
where
    R: SessionRepository + 'static,
{
    Router::new()
        .route("/api/v1/factors", get(catalog_handler::<R>))
        .route("/api/v1/appraisals", post(create_handler::<R>))
        .route("/api/v1/appraisals/valuate", post(valuate_handler::<R>))
        .route("/api/v1/appraisals/:appraisal_id", get(fetch_handler::<R>))
        .route(
            "/api/v1/appraisals/:appraisal_id/comparables",
            post(add_comparable_handler::<R>),
        )
        .route(
            "/api/v1/appraisals/:appraisal_id/comparables/:comparable_id",
            delete(remove_comparable_handler::<R>),
        )
        .route(
            "/api/v1/appraisals/:appraisal_id/comparables/:comparable_id/factors/:factor",
            put(set_factor_handler::<R>),
        )
        .route(
            "/api/v1/appraisals/:appraisal_id/comparables/:comparable_id/weight",
            put(set_weight_handler::<R>),
        )
        .route(
            "/api/v1/appraisals/:appraisal_id/discount",
            put(set_discount_handler::<R>),
        )
        .route(
            "/api/v1/appraisals/:appraisal_id/method",
            put(set_method_handler::<R>),
        )
        .route(
            "/api/v1/appraisals/:appraisal_id/advance",
            post(advance_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn catalog_handler<R>(State(service): State<SharedService<R>>) -> Response
where
    R: SessionRepository + 'static,
{
    let factors = service.catalog().entries();
    (StatusCode::OK, Json(json!({ "factors": factors }))).into_response()
}

pub(crate) async fn create_handler<R>(
    State(service): State<SharedService<R>>,
    Json(request): Json<CreateAppraisal>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.create(request) {
        Ok(record) => record_response(&service, StatusCode::CREATED, &record),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn valuate_handler<R>(
    State(service): State<SharedService<R>>,
    Json(request): Json<ValuationRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.valuate(request) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fetch_handler<R>(
    State(service): State<SharedService<R>>,
    Path(appraisal_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.get(&AppraisalId(appraisal_id)) {
        Ok(record) => record_response(&service, StatusCode::OK, &record),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_comparable_handler<R>(
    State(service): State<SharedService<R>>,
    Path(appraisal_id): Path<String>,
    Json(listing): Json<ComparableListing>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.add_comparable(&AppraisalId(appraisal_id), listing) {
        Ok((comparable_id, record)) => {
            let payload = json!({
                "comparable_id": comparable_id,
                "appraisal": record.view(service.report_date()),
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_comparable_handler<R>(
    State(service): State<SharedService<R>>,
    Path((appraisal_id, comparable_id)): Path<(String, u32)>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result =
        service.remove_comparable(&AppraisalId(appraisal_id), ComparableId(comparable_id));
    respond_with_record(&service, result)
}

pub(crate) async fn set_factor_handler<R>(
    State(service): State<SharedService<R>>,
    Path((appraisal_id, comparable_id, factor)): Path<(String, u32, String)>,
    Json(request): Json<FactorValueRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let factor = match factor.parse::<AdjustmentFactorKind>() {
        Ok(factor) => factor,
        Err(error) => return error_response(error.into()),
    };

    let result = service.set_factor(
        &AppraisalId(appraisal_id),
        ComparableId(comparable_id),
        factor,
        request.value,
    );
    respond_with_record(&service, result)
}

pub(crate) async fn set_weight_handler<R>(
    State(service): State<SharedService<R>>,
    Path((appraisal_id, comparable_id)): Path<(String, u32)>,
    Json(request): Json<WeightRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.set_weight(
        &AppraisalId(appraisal_id),
        ComparableId(comparable_id),
        request.weight,
    );
    respond_with_record(&service, result)
}

pub(crate) async fn set_discount_handler<R>(
    State(service): State<SharedService<R>>,
    Path(appraisal_id): Path<String>,
    Json(request): Json<DiscountRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.set_discount(&AppraisalId(appraisal_id), request.discount);
    respond_with_record(&service, result)
}

pub(crate) async fn set_method_handler<R>(
    State(service): State<SharedService<R>>,
    Path(appraisal_id): Path<String>,
    Json(request): Json<MethodRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.set_method(&AppraisalId(appraisal_id), request.method);
    respond_with_record(&service, result)
}

pub(crate) async fn advance_handler<R>(
    State(service): State<SharedService<R>>,
    Path(appraisal_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.advance(&AppraisalId(appraisal_id));
    respond_with_record(&service, result)
}

fn respond_with_record<R>(
    service: &AppraisalService<R>,
    result: Result<AppraisalRecord, AppraisalServiceError>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match result {
        Ok(record) => record_response(service, StatusCode::OK, &record),
        Err(error) => error_response(error),
    }
}

fn record_response<R>(
    service: &AppraisalService<R>,
    status: StatusCode,
    record: &AppraisalRecord,
) -> Response
where
    R: SessionRepository + 'static,
{
    (status, Json(record.view(service.report_date()))).into_response()
}

pub(crate) fn error_response(error: AppraisalServiceError) -> Response {
    let (status, kind) = match &error {
        AppraisalServiceError::Valuation(err) => (valuation_status(err), err.kind()),
        AppraisalServiceError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        AppraisalServiceError::Repository(RepositoryError::Conflict) => {
            (StatusCode::CONFLICT, "conflict")
        }
        AppraisalServiceError::Repository(RepositoryError::Unavailable(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "unavailable")
        }
    };

    let payload = json!({
        "error": error.to_string(),
        "kind": kind,
    });
    (status, Json(payload)).into_response()
}

pub(crate) fn valuation_status(error: &ValuationError) -> StatusCode {
    match error {
        ValuationError::InvalidInput { .. } | ValuationError::OutOfRange { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ValuationError::InsufficientData { .. } | ValuationError::InvalidState(_) => {
            StatusCode::CONFLICT
        }
    }
}
