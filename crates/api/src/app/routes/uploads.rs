//! Resume upload. The raw request body is the file.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use investi_infra::blob::{BlobError, MAX_RESUME_BYTES, ResumeUpload};

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/resume", post(upload_resume))
        // The handler enforces its own limit so oversize files get a 400.
        .layer(DefaultBodyLimit::disable())
}

pub async fn upload_resume(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::UploadParams>,
    body: Body,
) -> axum::response::Response {
    let Some(filename) = params.filename.filter(|f| !f.trim().is_empty()) else {
        return errors::failure(StatusCode::BAD_REQUEST, "filename is required");
    };

    let bytes = match axum::body::to_bytes(body, MAX_RESUME_BYTES).await {
        Ok(b) => b,
        Err(_) => {
            return errors::failure(
                StatusCode::BAD_REQUEST,
                BlobError::TooLarge { max: MAX_RESUME_BYTES }.to_string(),
            );
        }
    };

    let upload = match ResumeUpload::validate(&filename, bytes.len()) {
        Ok(u) => u,
        Err(e) => return errors::failure(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match services
        .blobs
        .put(&upload.key, upload.format.content_type(), bytes.to_vec())
        .await
    {
        Ok(url) => {
            tracing::info!(key = %upload.key, size = bytes.len(), "resume uploaded");
            (StatusCode::OK, Json(dto::UploadResponse { success: true, url })).into_response()
        }
        Err(e) if e.is_client_error() => errors::failure(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            tracing::error!(error = %e, "resume upload failed");
            errors::failure(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed")
        }
    }
}
