//! Scheduler-triggered email queue processing.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new().route("/process-emails", get(process_emails).post(process_emails))
}

/// Process one batch. The secret check happens in middleware, before this
/// handler (and therefore the processor) is reached.
pub async fn process_emails(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let summary = match services.queue.process_queue(services.cron_batch_size).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "email queue processing failed");
            return errors::failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process email queue");
        }
    };

    let queue = match services.queue.queue_stats().await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!(error = %e, "email queue stats failed");
            return errors::failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read email queue stats");
        }
    };

    (
        StatusCode::OK,
        Json(dto::CronResponse {
            success: true,
            summary,
            queue,
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
        .into_response()
}
