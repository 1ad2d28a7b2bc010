//! Batch processor: claim, render, send, record.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use investi_core::EmailAddress;

use super::store::{ClaimRequest, EmailQueueStore};
use super::types::{
    AttemptOutcome, EmailJob, EmailJobId, ProcessSummary, QueueStats, RetryPolicy,
};
use crate::mailer::{EmailSender, TemplateId, TemplateRegistry};
use crate::store::StoreError;

/// Shortest claim lease accepted. A lease must outlive the send it covers, or
/// an overlapping run would reclaim a job that is still in flight.
pub const MIN_CLAIM_LEASE: Duration = Duration::from_secs(1);

/// Longest claim lease accepted.
pub const MAX_CLAIM_LEASE: Duration = Duration::from_secs(86_400);

/// Email queue configuration.
#[derive(Debug, Clone)]
pub struct EmailQueueConfig {
    pub policy: RetryPolicy,
    /// Claim lease; an in-flight job older than this is claimable again
    pub lease: Duration,
    /// Maximum sends in flight within one batch
    pub concurrency: usize,
}

impl Default for EmailQueueConfig {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            lease: Duration::from_secs(600),
            concurrency: 4,
        }
    }
}

impl EmailQueueConfig {
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Clamped to `MIN_CLAIM_LEASE..=MAX_CLAIM_LEASE`.
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease.clamp(MIN_CLAIM_LEASE, MAX_CLAIM_LEASE);
        self
    }
}

/// The email queue service.
///
/// Cheap to clone; all state lives in the store.
#[derive(Clone)]
pub struct EmailQueue {
    store: Arc<dyn EmailQueueStore>,
    sender: Arc<dyn EmailSender>,
    templates: Arc<TemplateRegistry>,
    config: EmailQueueConfig,
}

impl std::fmt::Debug for EmailQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailQueue").field("config", &self.config).finish_non_exhaustive()
    }
}

impl EmailQueue {
    pub fn new(
        store: Arc<dyn EmailQueueStore>,
        sender: Arc<dyn EmailSender>,
        config: EmailQueueConfig,
    ) -> Self {
        Self {
            store,
            sender,
            templates: Arc::new(TemplateRegistry::new()),
            config,
        }
    }

    /// Insert a pending job. Never contacts the provider.
    #[instrument(skip(self, recipient, data))]
    pub async fn enqueue(
        &self,
        recipient: EmailAddress,
        template: TemplateId,
        data: serde_json::Value,
    ) -> Result<EmailJobId, StoreError> {
        let job = EmailJob::new(recipient, template.as_str(), data);
        let id = self.store.enqueue(job).await?;
        debug!(job_id = %id, "email enqueued");
        Ok(id)
    }

    /// Claim up to `max_batch` jobs and attempt each once.
    ///
    /// Individual send failures are recorded on their job; only a failure to
    /// claim is returned as an error.
    #[instrument(skip(self))]
    pub async fn process_queue(&self, max_batch: usize) -> Result<ProcessSummary, StoreError> {
        let request = ClaimRequest {
            limit: max_batch,
            now: Utc::now(),
            lease: self.config.lease,
            max_attempts: self.config.policy.max_attempts,
        };
        let jobs = self.store.claim_batch(request).await?;

        let mut summary = ProcessSummary {
            processed: jobs.len() as u64,
            ..ProcessSummary::default()
        };
        if jobs.is_empty() {
            return Ok(summary);
        }

        let outcomes: Vec<Option<AttemptOutcome>> = stream::iter(jobs)
            .map(|job| self.attempt(job))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes.into_iter().flatten() {
            summary.record(outcome);
        }

        info!(
            processed = summary.processed,
            sent = summary.sent,
            retried = summary.retried,
            failed = summary.failed,
            "email batch processed"
        );
        Ok(summary)
    }

    /// One send attempt on a claimed job. `None` when the outcome could not
    /// be recorded.
    async fn attempt(&self, mut job: EmailJob) -> Option<AttemptOutcome> {
        let result = match self
            .templates
            .render(&job.template, job.recipient.as_str(), &job.data)
        {
            Ok(email) => self.sender.send(&email).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let now = Utc::now();
        let outcome = match result {
            Ok(()) => job.mark_sent(now),
            Err(error) => {
                let outcome = job.mark_failed(error.clone(), &self.config.policy, now);
                if outcome == AttemptOutcome::DeadLettered {
                    warn!(job_id = %job.id, attempts = job.attempts, error = %error, "email dead-lettered");
                } else {
                    debug!(job_id = %job.id, attempts = job.attempts, error = %error, "email send failed, will retry");
                }
                outcome
            }
        };

        match self.store.record_attempt(&job).await {
            Ok(true) => Some(outcome),
            Ok(false) => {
                warn!(job_id = %job.id, "claim lost before outcome was recorded");
                None
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "failed to record email attempt");
                None
            }
        }
    }

    pub async fn queue_stats(&self) -> Result<QueueStats, StoreError> {
        self.store.stats().await
    }

    pub async fn list_failed(&self, limit: usize) -> Result<Vec<EmailJob>, StoreError> {
        self.store.list_failed(limit).await
    }

    /// Replay a dead-lettered job.
    #[instrument(skip(self))]
    pub async fn retry_failed(&self, id: EmailJobId) -> Result<EmailJob, StoreError> {
        let job = self.store.retry_failed(id).await?;
        info!(job_id = %id, "dead-lettered email requeued");
        Ok(job)
    }
}
