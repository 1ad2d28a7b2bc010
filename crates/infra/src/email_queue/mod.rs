//! Durable email queue with claim, retry and dead-letter handling.
//!
//! ## Design
//!
//! - `enqueue` only writes a pending row; it never talks to the provider
//! - `process_queue` is driven by an external scheduler (the cron endpoint)
//! - Jobs are claimed atomically (pending → in_flight) before any send, so
//!   overlapping invocations never pick up the same job
//! - A failed send goes back to pending until the retry ceiling, then to the
//!   terminal `failed` state (dead letter)
//! - A claim carries a lease; jobs stranded in flight by a truncated run are
//!   claimable again once the lease expires
//!
//! ## Components
//!
//! - `EmailJob`: the persisted job and its state transitions
//! - `EmailQueueStore`: persistence (in-memory or Postgres)
//! - `EmailQueue`: enqueue + batch processor

pub mod postgres;
pub mod processor;
pub mod store;
pub mod types;

pub use postgres::PostgresEmailQueueStore;
pub use processor::{EmailQueue, EmailQueueConfig, MAX_CLAIM_LEASE, MIN_CLAIM_LEASE};
pub use store::{ClaimRequest, EmailQueueStore, InMemoryEmailQueueStore};
pub use types::{
    AttemptOutcome, BackoffStrategy, EmailJob, EmailJobId, EmailJobStatus, ProcessSummary,
    QueueStats, RetryPolicy,
};
