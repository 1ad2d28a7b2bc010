use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use investi_core::ValidationErrors;
use investi_infra::email_queue::{EmailJob, ProcessSummary, QueueStats};
use investi_infra::intake_service::ActionResult;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

impl ListParams {
    pub fn limit_or(&self, default: usize, max: usize) -> usize {
        self.limit.unwrap_or(default).clamp(1, max)
    }
}

/// Decode a form body. Malformed JSON or a wrongly typed field is reported
/// the same way as a validation failure, against a `body` pseudo-field.
pub fn parse_form<T: DeserializeOwned, R>(body: &[u8]) -> Result<T, ActionResult<R>> {
    serde_json::from_slice(body).map_err(|e| {
        ActionResult::invalid(ValidationErrors::single("body", format!("invalid request body: {e}")))
    })
}

/// Pull a string `email` field out of an arbitrary JSON body.
pub fn waitlist_email(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("email")?.as_str().map(str::to_string)
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CronResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: ProcessSummary,
    pub queue: QueueStats,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct QueueOverview {
    pub stats: QueueStats,
    pub failed: Vec<EmailJob>,
}
