use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::json;

use investi_infra::intake_service::{ActionFailure, ActionResult, IntakeError};
use investi_infra::store::StoreError;

/// `{ "error": message }` with the given status.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

/// `{ "success": false, "error": message }` with the given status.
pub fn failure(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({ "success": false, "error": message.into() })),
    )
        .into_response()
}

pub fn action_status(failure: Option<ActionFailure>) -> StatusCode {
    match failure {
        None => StatusCode::OK,
        Some(ActionFailure::Invalid) => StatusCode::BAD_REQUEST,
        Some(ActionFailure::Duplicate) => StatusCode::CONFLICT,
        Some(ActionFailure::Store) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Serialize an intake result with the status its outcome maps to.
pub fn action_response<T: Serialize>(result: ActionResult<T>) -> axum::response::Response {
    (action_status(result.failure), axum::Json(result)).into_response()
}

pub fn intake_error_to_response(err: IntakeError) -> axum::response::Response {
    match err {
        IntakeError::NotFound(msg) => failure(StatusCode::NOT_FOUND, format!("{msg} not found")),
        IntakeError::Store(e) => store_error_to_response(e),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound(msg) => failure(StatusCode::NOT_FOUND, format!("{msg} not found")),
        StoreError::Duplicate(_) => failure(StatusCode::CONFLICT, "Already exists"),
        StoreError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}
