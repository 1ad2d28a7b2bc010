//! Email job storage.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{EmailJob, EmailJobId, EmailJobStatus, QueueStats};
use crate::store::StoreError;

/// Parameters of one atomic claim.
#[derive(Debug, Clone, Copy)]
pub struct ClaimRequest {
    /// Maximum jobs to claim
    pub limit: usize,
    pub now: DateTime<Utc>,
    /// How long a claim protects a job from other processors
    pub lease: Duration,
    /// Attempt ceiling; stranded jobs that already used it are failed, not reclaimed
    pub max_attempts: u32,
}

/// Email job store abstraction.
///
/// The processor exclusively owns status transitions after `enqueue`.
#[async_trait]
pub trait EmailQueueStore: Send + Sync {
    /// Insert a pending job.
    async fn enqueue(&self, job: EmailJob) -> Result<EmailJobId, StoreError>;

    /// Atomically claim up to `limit` jobs, oldest first: pending jobs that are
    /// due, plus in-flight jobs whose lease expired. Claimed jobs come back
    /// `in_flight` with `attempts` already incremented.
    ///
    /// Two concurrent calls never return the same job.
    async fn claim_batch(&self, request: ClaimRequest) -> Result<Vec<EmailJob>, StoreError>;

    /// Persist the outcome of an attempt on a claimed job.
    ///
    /// Returns `false` when the claim was lost (the lease expired and another
    /// run re-claimed the job), in which case nothing is written.
    async fn record_attempt(&self, job: &EmailJob) -> Result<bool, StoreError>;

    async fn get(&self, id: EmailJobId) -> Result<Option<EmailJob>, StoreError>;

    async fn stats(&self) -> Result<QueueStats, StoreError>;

    /// Dead-lettered jobs, most recently failed first.
    async fn list_failed(&self, limit: usize) -> Result<Vec<EmailJob>, StoreError>;

    /// Move a dead-lettered job back to pending with a fresh attempt budget.
    async fn retry_failed(&self, id: EmailJobId) -> Result<EmailJob, StoreError>;
}

/// In-memory email job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryEmailQueueStore {
    jobs: RwLock<HashMap<EmailJobId, EmailJob>>,
}

impl InMemoryEmailQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<EmailJobId, EmailJob>>, StoreError> {
        self.jobs.read().map_err(|_| StoreError::storage("email queue lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<EmailJobId, EmailJob>>, StoreError> {
        self.jobs.write().map_err(|_| StoreError::storage("email queue lock poisoned"))
    }
}

#[async_trait]
impl EmailQueueStore for InMemoryEmailQueueStore {
    async fn enqueue(&self, job: EmailJob) -> Result<EmailJobId, StoreError> {
        let mut jobs = self.write()?;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate(format!("email job {}", job.id)));
        }
        let id = job.id;
        jobs.insert(id, job);
        Ok(id)
    }

    async fn claim_batch(&self, request: ClaimRequest) -> Result<Vec<EmailJob>, StoreError> {
        let mut jobs = self.write()?;
        let now = request.now;

        // Claimable but already at the ceiling: fail rather than exceed it.
        for job in jobs.values_mut() {
            let claimable = job.is_due(now) || job.lease_expired(now, request.lease);
            if claimable && job.attempts >= request.max_attempts {
                job.status = EmailJobStatus::Failed;
                job.last_error
                    .get_or_insert_with(|| "attempt ceiling reached".to_string());
                job.updated_at = now;
            }
        }

        let mut candidates: Vec<_> = jobs
            .values()
            .filter(|j| j.attempts < request.max_attempts)
            .filter(|j| j.is_due(now) || j.lease_expired(now, request.lease))
            .map(|j| (j.created_at, j.id))
            .collect();

        // FIFO
        candidates.sort();
        candidates.truncate(request.limit);

        let mut claimed = Vec::with_capacity(candidates.len());
        for (_, id) in candidates {
            if let Some(job) = jobs.get_mut(&id) {
                job.mark_claimed(now);
                claimed.push(job.clone());
            }
        }
        Ok(claimed)
    }

    async fn record_attempt(&self, job: &EmailJob) -> Result<bool, StoreError> {
        let mut jobs = self.write()?;
        match jobs.get_mut(&job.id) {
            Some(current)
                if current.status == EmailJobStatus::InFlight && current.attempts == job.attempts =>
            {
                *current = job.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(format!("email job {}", job.id))),
        }
    }

    async fn get(&self, id: EmailJobId) -> Result<Option<EmailJob>, StoreError> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn stats(&self) -> Result<QueueStats, StoreError> {
        let jobs = self.read()?;
        let mut stats = QueueStats::default();
        for job in jobs.values() {
            stats.record(job.status, 1);
        }
        Ok(stats)
    }

    async fn list_failed(&self, limit: usize) -> Result<Vec<EmailJob>, StoreError> {
        let jobs = self.read()?;
        let mut failed: Vec<_> = jobs
            .values()
            .filter(|j| j.status == EmailJobStatus::Failed)
            .cloned()
            .collect();
        failed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        failed.truncate(limit);
        Ok(failed)
    }

    async fn retry_failed(&self, id: EmailJobId) -> Result<EmailJob, StoreError> {
        let mut jobs = self.write()?;
        match jobs.get_mut(&id) {
            Some(job) if job.status == EmailJobStatus::Failed => {
                job.requeue(Utc::now());
                Ok(job.clone())
            }
            _ => Err(StoreError::NotFound(format!("failed email job {id}"))),
        }
    }
}
