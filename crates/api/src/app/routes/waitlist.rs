use std::sync::Arc;

use axum::{Json, body::Bytes, extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::json;

use investi_infra::intake_service::ActionFailure;
use investi_intake::WaitlistSubmission;

use crate::app::{dto, errors, services::AppServices};

/// `POST /api/waitlist` with `{ "email": "..." }`.
pub async fn join(Extension(services): Extension<Arc<AppServices>>, body: Bytes) -> axum::response::Response {
    let Some(email) = dto::waitlist_email(&body) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "Invalid email");
    };

    let result = services
        .intake
        .join_waitlist(WaitlistSubmission { email: Some(email) })
        .await;

    match result.failure {
        None => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Some(ActionFailure::Invalid) => errors::json_error(StatusCode::BAD_REQUEST, "Invalid email"),
        Some(ActionFailure::Duplicate) => {
            errors::json_error(StatusCode::CONFLICT, "Email already registered")
        }
        Some(ActionFailure::Store) => {
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}
