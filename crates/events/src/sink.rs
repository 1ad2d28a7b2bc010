//! Analytics sinks (best-effort, fire-and-forget).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use crate::event::{Event, IntakeEvent};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("analytics sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for intake events.
///
/// Callers treat every error as non-fatal: it is logged and dropped.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn track(&self, event: &IntakeEvent) -> Result<(), AnalyticsError>;
}

#[async_trait]
impl<S> AnalyticsSink for Arc<S>
where
    S: AnalyticsSink + ?Sized,
{
    async fn track(&self, event: &IntakeEvent) -> Result<(), AnalyticsError> {
        (**self).track(event).await
    }
}

/// Emits each event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalyticsSink;

#[async_trait]
impl AnalyticsSink for TracingAnalyticsSink {
    async fn track(&self, event: &IntakeEvent) -> Result<(), AnalyticsError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| AnalyticsError::Unavailable(format!("serialize: {e}")))?;
        tracing::info!(
            target: "analytics",
            event_type = event.event_type(),
            version = event.version(),
            payload = %payload,
            "analytics event"
        );
        Ok(())
    }
}

/// In-memory sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAnalyticsSink {
    events: Mutex<Vec<IntakeEvent>>,
}

impl InMemoryAnalyticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything tracked so far.
    pub fn events(&self) -> Vec<IntakeEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AnalyticsSink for InMemoryAnalyticsSink {
    async fn track(&self, event: &IntakeEvent) -> Result<(), AnalyticsError> {
        self.events
            .lock()
            .map_err(|_| AnalyticsError::Unavailable("lock poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}
