//! Email rendering and delivery.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub mod http;
pub mod templates;

pub use http::HttpEmailSender;
pub use templates::{TemplateError, TemplateId, TemplateRegistry};

/// A fully rendered message ready for the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The provider answered with a non-2xx status.
    #[error("provider rejected email ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("sender misconfigured: {0}")]
    Config(String),
}

/// Outbound email provider.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &RenderedEmail) -> Result<(), SendError>;
}

#[async_trait]
impl<S: EmailSender + ?Sized> EmailSender for Arc<S> {
    async fn send(&self, email: &RenderedEmail) -> Result<(), SendError> {
        (**self).send(email).await
    }
}

/// Logs every message and reports success. Used when no provider key is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: &RenderedEmail) -> Result<(), SendError> {
        tracing::info!(
            target: "mailer",
            to = %email.to,
            subject = %email.subject,
            html_len = email.html.len(),
            "email not sent (no provider configured)"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Recording {
    sent: Vec<RenderedEmail>,
    fail_all: bool,
    failing: Vec<String>,
}

/// In-memory sender for tests: records delivered mail and can be told to fail.
#[derive(Debug, Default, Clone)]
pub struct RecordingEmailSender {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message.
    pub fn fail_all(&self, fail: bool) {
        if let Ok(mut r) = self.inner.lock() {
            r.fail_all = fail;
        }
    }

    /// Reject messages addressed to `recipient`.
    pub fn fail_recipient(&self, recipient: impl Into<String>) {
        if let Ok(mut r) = self.inner.lock() {
            r.failing.push(recipient.into());
        }
    }

    pub fn sent(&self) -> Vec<RenderedEmail> {
        self.inner.lock().map(|r| r.sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, email: &RenderedEmail) -> Result<(), SendError> {
        let mut r = self
            .inner
            .lock()
            .map_err(|_| SendError::Transport("recording sender poisoned".into()))?;
        if r.fail_all || r.failing.iter().any(|f| f == &email.to) {
            return Err(SendError::Rejected {
                status: 422,
                body: format!("refusing {}", email.to),
            });
        }
        r.sent.push(email.clone());
        Ok(())
    }
}
