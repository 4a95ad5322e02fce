use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use super::domain::{ApplicationId, ApplicationSubmission, ValidationError};
use super::repository::{ApplicationRepository, AttachmentStore};
use super::service::{ApplicationServiceError, IncentiveApplicationService};

/// Router builder exposing intake, review, aggregation, and export endpoints.
pub fn application_router<R, S>(service: Arc<IncentiveApplicationService<R, S>>) -> Router
where
    R: ApplicationRepository + 'static,
    S: AttachmentStore + 'static,
{
    Router::new()
        .route(
            "/api/applications",
            get(list_handler::<R, S>).post(submit_handler::<R, S>),
        )
        .route("/api/applications/excel", get(export_handler::<R, S>))
        .route(
            "/api/applications/:application_id",
            get(detail_handler::<R, S>)
                .patch(review_handler::<R, S>)
                .delete(delete_handler::<R, S>),
        )
        .route("/api/stores", get(stores_handler::<R, S>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportQuery {
    #[serde(rename = "approvedOnly")]
    approved_only: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatusUpdate {
    #[serde(default)]
    status: Value,
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (status, axum::Json(payload)).into_response()
}

/// Logs the full failure and answers with a generic message.
fn internal_error(err: ApplicationServiceError, message: &'static str) -> Response {
    error!(error = %err, "{message}");
    error_body(StatusCode::INTERNAL_SERVER_ERROR, message)
}

pub(crate) async fn submit_handler<R, S>(
    State(service): State<Arc<IncentiveApplicationService<R, S>>>,
    payload: Result<axum::Json<ApplicationSubmission>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: AttachmentStore + 'static,
{
    let submission = match payload {
        Ok(axum::Json(submission)) => submission,
        Err(rejection) => {
            debug!(error = %rejection, "submission body rejected");
            let message = ValidationError::MissingField("body").to_string();
            return error_body(StatusCode::BAD_REQUEST, message);
        }
    };

    match service.submit(submission) {
        Ok(receipt) => {
            let payload = json!({
                "success": true,
                "id": receipt.application.id,
                "warnings": receipt.warnings,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(ApplicationServiceError::Validation(err)) => {
            error_body(StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(other) => internal_error(other, "failed to save application"),
    }
}

pub(crate) async fn list_handler<R, S>(
    State(service): State<Arc<IncentiveApplicationService<R, S>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: AttachmentStore + 'static,
{
    let outcome = match query.kind.as_deref() {
        Some("stats") => service.stats().map(|stats| axum::Json(stats).into_response()),
        Some("summaries") => service
            .agency_summaries()
            .map(|summaries| axum::Json(summaries).into_response()),
        _ => service.list().map(|apps| axum::Json(apps).into_response()),
    };

    outcome.unwrap_or_else(|err| internal_error(err, "failed to load applications"))
}

pub(crate) async fn detail_handler<R, S>(
    State(service): State<Arc<IncentiveApplicationService<R, S>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: AttachmentStore + 'static,
{
    match service.get(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(ApplicationServiceError::NotFound) => {
            error_body(StatusCode::NOT_FOUND, "application not found")
        }
        Err(other) => internal_error(other, "failed to load application"),
    }
}

pub(crate) async fn review_handler<R, S>(
    State(service): State<Arc<IncentiveApplicationService<R, S>>>,
    Path(application_id): Path<String>,
    payload: Result<axum::Json<StatusUpdate>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: AttachmentStore + 'static,
{
    let update = match payload {
        Ok(axum::Json(update)) => update,
        Err(rejection) => return error_body(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let status = update.status.as_str().unwrap_or_default();

    match service.transition(&ApplicationId(application_id), status) {
        Ok(application) => {
            let payload = json!({
                "success": true,
                "application": application,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(ApplicationServiceError::InvalidStatus(err)) => {
            error_body(StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(ApplicationServiceError::NotFound) => {
            error_body(StatusCode::NOT_FOUND, "application not found")
        }
        Err(other) => internal_error(other, "failed to update application"),
    }
}

pub(crate) async fn delete_handler<R, S>(
    State(service): State<Arc<IncentiveApplicationService<R, S>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: AttachmentStore + 'static,
{
    match service.delete(&ApplicationId(application_id)) {
        Ok(()) => (StatusCode::OK, axum::Json(json!({ "success": true }))).into_response(),
        Err(ApplicationServiceError::NotFound) => {
            error_body(StatusCode::NOT_FOUND, "application not found")
        }
        Err(other) => internal_error(other, "failed to delete application"),
    }
}

pub(crate) async fn export_handler<R, S>(
    State(service): State<Arc<IncentiveApplicationService<R, S>>>,
    Query(query): Query<ExportQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: AttachmentStore + 'static,
{
    let approved_only = query.approved_only.as_deref() != Some("false");
    match service.export_report(approved_only).await {
        Ok(report) => {
            let headers = [
                (header::CONTENT_TYPE, report.content_type.to_string()),
                (header::CONTENT_DISPOSITION, report.content_disposition()),
            ];
            (StatusCode::OK, headers, report.bytes).into_response()
        }
        Err(other) => internal_error(other, "failed to generate report"),
    }
}

pub(crate) async fn stores_handler<R, S>(
    State(service): State<Arc<IncentiveApplicationService<R, S>>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: AttachmentStore + 'static,
{
    match service.stores() {
        Ok(stores) => (StatusCode::OK, axum::Json(stores)).into_response(),
        Err(other) => internal_error(other, "failed to load stores"),
    }
}
