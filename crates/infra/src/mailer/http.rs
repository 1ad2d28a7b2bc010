//! Reqwest-backed transactional email sender.
//!
//! Speaks the Resend-style API: a JSON POST of `{from, to, subject, html}`
//! authenticated with a bearer key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;

use super::{EmailSender, RenderedEmail, SendError};

pub const DEFAULT_ENDPOINT: &str = "https://api.resend.com/emails";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Provider error bodies are truncated to this many bytes in `SendError`.
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

pub struct HttpEmailSender {
    client: Client,
    endpoint: Url,
    api_key: String,
    from: String,
}

impl std::fmt::Debug for HttpEmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmailSender")
            .field("endpoint", &self.endpoint.as_str())
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl HttpEmailSender {
    /// # Errors
    ///
    /// Returns `SendError::Config` for an unparseable endpoint or when the
    /// reqwest client cannot be constructed.
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self, SendError> {
        Self::with_timeout(endpoint, api_key, from, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: &str,
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SendError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SendError::Config(format!("invalid email endpoint {endpoint:?}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SendError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, email: &RenderedEmail) -> Result<(), SendError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                from: &self.from,
                to: &email.to,
                subject: &email.subject,
                html: &email.html,
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SendError::Rejected {
            status: status.as_u16(),
            body: truncate(body, MAX_ERROR_BODY),
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> SendError {
    if error.is_timeout() {
        SendError::Transport(format!("email provider timed out: {error}"))
    } else {
        SendError::Transport(error.to_string())
    }
}

fn truncate(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}
