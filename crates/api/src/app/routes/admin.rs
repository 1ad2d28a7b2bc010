//! Operator endpoints: email queue inspection, dead-letter replay, test-data
//! cleanup. Mounted behind the admin secret gate.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;

use investi_core::ApplicationId;
use investi_infra::email_queue::EmailJobId;
use investi_intake::ApplicationKind;

use crate::app::{dto, errors, services::AppServices};

const DEFAULT_FAILED_LIMIT: usize = 50;
const MAX_FAILED_LIMIT: usize = 500;

pub fn router() -> Router {
    Router::new()
        .route("/email-queue", get(email_queue_overview))
        .route("/email-queue/:id/retry", post(retry_email))
        .route("/intake-counts", get(intake_counts))
        .route("/applications/:kind/:id", delete(delete_application))
}

pub async fn email_queue_overview(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::ListParams>,
) -> axum::response::Response {
    let stats = match services.queue.queue_stats().await {
        Ok(s) => s,
        Err(e) => return errors::store_error_to_response(e),
    };
    let limit = params.limit_or(DEFAULT_FAILED_LIMIT, MAX_FAILED_LIMIT);
    let failed = match services.queue.list_failed(limit).await {
        Ok(jobs) => jobs,
        Err(e) => return errors::store_error_to_response(e),
    };
    (StatusCode::OK, Json(dto::QueueOverview { stats, failed })).into_response()
}

pub async fn retry_email(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<EmailJobId>() else {
        return errors::failure(StatusCode::BAD_REQUEST, "invalid email job id");
    };
    match services.queue.retry_failed(id).await {
        Ok(job) => (StatusCode::OK, Json(json!({ "success": true, "job": job }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn intake_counts(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.intake.counts().await {
        Ok(counts) => (StatusCode::OK, Json(counts)).into_response(),
        Err(e) => errors::intake_error_to_response(e),
    }
}

pub async fn delete_application(
    Extension(services): Extension<Arc<AppServices>>,
    Path((kind, id)): Path<(String, String)>,
) -> axum::response::Response {
    let kind = match kind.parse::<ApplicationKind>() {
        Ok(k) => k,
        Err(e) => return errors::failure(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let id = match id.parse::<ApplicationId>() {
        Ok(id) => id,
        Err(e) => return errors::failure(StatusCode::BAD_REQUEST, e.to_string()),
    };
    match services.intake.delete_application(kind, id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(e) => errors::intake_error_to_response(e),
    }
}
