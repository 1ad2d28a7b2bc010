//! Core email-job types and policies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use investi_core::EmailAddress;

/// Unique email job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailJobId(pub Uuid);

impl EmailJobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for EmailJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EmailJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EmailJobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Email job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailJobStatus {
    /// Waiting to be claimed (new, or awaiting retry)
    Pending,
    /// Claimed by a processor run
    InFlight,
    /// Delivered to the provider
    Sent,
    /// Exhausted its attempts (dead letter)
    Failed,
}

impl EmailJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailJobStatus::Pending => "pending",
            EmailJobStatus::InFlight => "in_flight",
            EmailJobStatus::Sent => "sent",
            EmailJobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EmailJobStatus::Sent | EmailJobStatus::Failed)
    }
}

impl std::str::FromStr for EmailJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_flight" => Ok(Self::InFlight),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown email job status: {other}")),
        }
    }
}

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    #[default]
    Fixed,
    /// Linear backoff: base * attempt
    Linear,
    /// Exponential backoff: base * 2^(attempt - 1)
    Exponential,
}

/// Retry policy configuration.
///
/// The default retries on the next scheduled run (zero delay) and gives up
/// after three attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first (minimum 1)
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::from_secs(60 * 60),
            strategy: BackoffStrategy::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Retry on the next run, up to `max_attempts` total attempts.
    pub fn next_run(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// Create a policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt),
            BackoffStrategy::Exponential => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }

    /// Whether a job that has made `attempts` attempts may try again.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

/// A queued email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailJob {
    pub id: EmailJobId,
    pub recipient: EmailAddress,
    /// Template identifier (see `mailer::templates`)
    pub template: String,
    /// Template data (JSON object)
    pub data: serde_json::Value,
    pub status: EmailJobStatus,
    /// Attempts made so far; incremented when the job is claimed
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Earliest time a pending job may be claimed (None = immediately)
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// What happened to a claimed job after its send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Sent,
    /// Failed, back to pending for a later run
    Retrying,
    /// Failed for the last time
    DeadLettered,
}

impl EmailJob {
    pub fn new(recipient: EmailAddress, template: impl Into<String>, data: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: EmailJobId::new(),
            recipient,
            template: template.into(),
            data,
            status: EmailJobStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
            next_attempt_at: None,
            claimed_at: None,
            sent_at: None,
        }
    }

    /// Pending and past its backoff.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == EmailJobStatus::Pending && self.next_attempt_at.map_or(true, |at| at <= now)
    }

    /// In flight with a claim older than `lease`.
    pub fn lease_expired(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        let Ok(lease) = chrono::Duration::from_std(lease) else {
            return false;
        };
        self.status == EmailJobStatus::InFlight
            && self.claimed_at.map_or(true, |at| {
                at.checked_add_signed(lease).is_some_and(|deadline| deadline <= now)
            })
    }

    /// Claim for one attempt.
    pub fn mark_claimed(&mut self, now: DateTime<Utc>) {
        self.status = EmailJobStatus::InFlight;
        self.attempts += 1;
        self.claimed_at = Some(now);
        self.updated_at = now;
    }

    pub fn mark_sent(&mut self, now: DateTime<Utc>) -> AttemptOutcome {
        self.status = EmailJobStatus::Sent;
        self.sent_at = Some(now);
        self.last_error = None;
        self.next_attempt_at = None;
        self.updated_at = now;
        AttemptOutcome::Sent
    }

    /// Record a failed attempt: back to pending while attempts remain under
    /// the ceiling, terminal `failed` otherwise.
    pub fn mark_failed(&mut self, error: String, policy: &RetryPolicy, now: DateTime<Utc>) -> AttemptOutcome {
        self.last_error = Some(error);
        self.updated_at = now;

        if policy.should_retry(self.attempts) {
            let delay = policy.delay_for_attempt(self.attempts);
            self.status = EmailJobStatus::Pending;
            self.next_attempt_at = chrono::Duration::from_std(delay)
                .ok()
                .filter(|d| !d.is_zero())
                .and_then(|d| now.checked_add_signed(d));
            AttemptOutcome::Retrying
        } else {
            self.status = EmailJobStatus::Failed;
            self.next_attempt_at = None;
            AttemptOutcome::DeadLettered
        }
    }

    /// Move a dead-lettered job back to pending with a fresh attempt budget.
    pub fn requeue(&mut self, now: DateTime<Utc>) {
        self.status = EmailJobStatus::Pending;
        self.attempts = 0;
        self.next_attempt_at = None;
        self.claimed_at = None;
        self.updated_at = now;
    }
}

/// Job counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: u64,
    pub in_flight: u64,
    pub sent: u64,
    pub failed: u64,
    pub total: u64,
}

impl QueueStats {
    pub fn record(&mut self, status: EmailJobStatus, count: u64) {
        match status {
            EmailJobStatus::Pending => self.pending += count,
            EmailJobStatus::InFlight => self.in_flight += count,
            EmailJobStatus::Sent => self.sent += count,
            EmailJobStatus::Failed => self.failed += count,
        }
        self.total += count;
    }
}

/// Aggregate result of one `process_queue` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    /// Jobs claimed by this run
    pub processed: u64,
    pub sent: u64,
    /// Jobs that reached terminal failure in this run
    pub failed: u64,
    /// Jobs returned to pending for a later run
    pub retried: u64,
}

impl ProcessSummary {
    pub fn record(&mut self, outcome: AttemptOutcome) {
        match outcome {
            AttemptOutcome::Sent => self.sent += 1,
            AttemptOutcome::Retrying => self.retried += 1,
            AttemptOutcome::DeadLettered => self.failed += 1,
        }
    }
}
