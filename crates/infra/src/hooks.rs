//! Post-commit side channels.
//!
//! Hooks run only after the primary write succeeded. Each hook is its own
//! error boundary: a failure is logged at `warn` and never reaches the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use investi_core::EmailAddress;
use investi_events::{AnalyticsSink, IntakeEvent};
use investi_intake::{
    CareerApplication, FounderApplication, InvestorApplication, NewsletterSubscription,
    WaitlistEntry,
};

use crate::email_queue::EmailQueue;
use crate::mailer::TemplateId;

/// A record that has just been persisted.
#[derive(Debug, Clone)]
pub enum CommittedRecord {
    Founder(FounderApplication),
    Investor(InvestorApplication),
    Career(CareerApplication),
    Newsletter(NewsletterSubscription),
    Waitlist(WaitlistEntry),
}

impl CommittedRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            CommittedRecord::Founder(_) => "founder",
            CommittedRecord::Investor(_) => "investor",
            CommittedRecord::Career(_) => "career",
            CommittedRecord::Newsletter(_) => "newsletter",
            CommittedRecord::Waitlist(_) => "waitlist",
        }
    }

    /// Recipient, template and template data of the confirmation email.
    pub fn confirmation_email(&self) -> (EmailAddress, TemplateId, serde_json::Value) {
        match self {
            CommittedRecord::Founder(app) => (
                app.details.email.clone(),
                TemplateId::FounderApplicationReceived,
                json!({ "name": app.details.full_name, "company": app.details.company_name }),
            ),
            CommittedRecord::Investor(app) => (
                app.details.email.clone(),
                TemplateId::InvestorApplicationReceived,
                json!({ "name": app.details.full_name, "firm": app.details.company_name }),
            ),
            CommittedRecord::Career(app) => (
                app.details.email.clone(),
                TemplateId::CareerApplicationReceived,
                json!({ "name": app.details.full_name, "position": app.details.position }),
            ),
            CommittedRecord::Newsletter(sub) => (
                sub.details.email.clone(),
                TemplateId::NewsletterWelcome,
                json!({ "name": sub.details.name }),
            ),
            CommittedRecord::Waitlist(entry) => {
                (entry.email.clone(), TemplateId::WaitlistWelcome, json!({}))
            }
        }
    }

    pub fn event(&self) -> IntakeEvent {
        match self {
            CommittedRecord::Founder(app) => IntakeEvent::founder_submitted(app),
            CommittedRecord::Investor(app) => IntakeEvent::investor_submitted(app),
            CommittedRecord::Career(app) => IntakeEvent::career_submitted(app),
            CommittedRecord::Newsletter(sub) => IntakeEvent::newsletter_subscribed(sub),
            CommittedRecord::Waitlist(entry) => IntakeEvent::waitlist_joined(entry),
        }
    }
}

#[derive(Debug, Error)]
#[error("{hook}: {message}")]
pub struct HookError {
    pub hook: &'static str,
    pub message: String,
}

#[async_trait]
pub trait PostCommitHook: Send + Sync {
    fn name(&self) -> &'static str;

    async fn after_commit(&self, record: &CommittedRecord) -> Result<(), HookError>;
}

/// Enqueues the confirmation/welcome email for the record.
#[derive(Debug, Clone)]
pub struct ConfirmationEmailHook {
    queue: EmailQueue,
}

impl ConfirmationEmailHook {
    pub fn new(queue: EmailQueue) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl PostCommitHook for ConfirmationEmailHook {
    fn name(&self) -> &'static str {
        "confirmation_email"
    }

    async fn after_commit(&self, record: &CommittedRecord) -> Result<(), HookError> {
        let (to, template, data) = record.confirmation_email();
        self.queue
            .enqueue(to, template, data)
            .await
            .map(|_| ())
            .map_err(|e| HookError {
                hook: self.name(),
                message: e.to_string(),
            })
    }
}

/// Emits the record's analytics event.
pub struct AnalyticsHook {
    sink: Arc<dyn AnalyticsSink>,
    detached: bool,
}

impl AnalyticsHook {
    /// Emit on a spawned task so the caller never waits on the sink.
    pub fn detached(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { sink, detached: true }
    }

    /// Emit before returning; errors surface to the hook runner.
    pub fn inline(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { sink, detached: false }
    }
}

#[async_trait]
impl PostCommitHook for AnalyticsHook {
    fn name(&self) -> &'static str {
        "analytics"
    }

    async fn after_commit(&self, record: &CommittedRecord) -> Result<(), HookError> {
        let event = record.event();
        if self.detached {
            let sink = self.sink.clone();
            tokio::spawn(async move {
                if let Err(e) = sink.track(&event).await {
                    warn!(hook = "analytics", error = %e, "post-commit hook failed");
                }
            });
            return Ok(());
        }
        self.sink.track(&event).await.map_err(|e| HookError {
            hook: self.name(),
            message: e.to_string(),
        })
    }
}

/// Runs every hook in order, isolating failures.
#[derive(Clone, Default)]
pub struct HookRunner {
    hooks: Vec<Arc<dyn PostCommitHook>>,
}

impl std::fmt::Debug for HookRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.hooks.iter().map(|h| h.name()).collect();
        f.debug_struct("HookRunner").field("hooks", &names).finish()
    }
}

impl HookRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: impl PostCommitHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Returns the number of hooks that failed.
    pub async fn run(&self, record: &CommittedRecord) -> usize {
        let mut failures = 0;
        for hook in &self.hooks {
            if let Err(e) = hook.after_commit(record).await {
                failures += 1;
                warn!(hook = hook.name(), record = record.kind(), error = %e, "post-commit hook failed");
            }
        }
        failures
    }
}
