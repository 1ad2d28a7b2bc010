//! Persistence for intake records.
//!
//! Two implementations share one contract: [`InMemoryIntakeStore`] for
//! tests/dev and [`PostgresIntakeStore`] for production. Both enforce email
//! uniqueness at the store level and report a violation as
//! [`StoreError::Duplicate`] rather than a generic failure.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use investi_core::{ApplicationId, EmailAddress};
use investi_intake::{
    ApplicationKind, CareerApplication, FounderApplication, InvestorApplication,
    NewCareerApplication, NewInvestorApplication, NewsletterSubscription, WaitlistEntry,
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryIntakeStore;
pub use postgres::{PostgresIntakeStore, run_migrations};

/// Store operation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Connectivity, serialization or any other unexpected backend failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate(_))
    }
}

/// Row counts per intake table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntakeCounts {
    pub founders: u64,
    pub investors: u64,
    pub careers: u64,
    pub newsletter: u64,
    pub waitlist: u64,
}

/// Intake record persistence.
///
/// Inserts are single-row and atomic: either the row exists afterwards or
/// nothing was written.
#[async_trait]
pub trait IntakeStore: Send + Sync {
    async fn founder_exists(&self, email: &EmailAddress) -> Result<bool, StoreError>;

    /// Fails with `Duplicate` when the email is already present.
    async fn insert_founder(&self, app: &FounderApplication) -> Result<(), StoreError>;

    /// Whether an investor with the same email, or the same folded
    /// name + firm pair, has already applied.
    async fn investor_exists(&self, candidate: &NewInvestorApplication) -> Result<bool, StoreError>;

    /// Fails with `Duplicate` when the email is already present.
    async fn insert_investor(&self, app: &InvestorApplication) -> Result<(), StoreError>;

    /// Whether the candidate's (email, folded position) key is already taken.
    async fn career_exists(&self, candidate: &NewCareerApplication) -> Result<bool, StoreError>;

    /// Fails with `Duplicate` when the (email, position) pair is already present.
    async fn insert_career(&self, app: &CareerApplication) -> Result<(), StoreError>;

    async fn subscription_exists(&self, email: &EmailAddress) -> Result<bool, StoreError>;

    /// Fails with `Duplicate` when the email is already subscribed.
    async fn insert_subscription(&self, sub: &NewsletterSubscription) -> Result<(), StoreError>;

    /// Fails with `Duplicate` when the email is already on the waitlist.
    async fn insert_waitlist(&self, entry: &WaitlistEntry) -> Result<(), StoreError>;

    /// Remove an application row (ops cleanup). Returns whether a row was deleted.
    async fn delete_application(&self, kind: ApplicationKind, id: ApplicationId) -> Result<bool, StoreError>;

    async fn counts(&self) -> Result<IntakeCounts, StoreError>;
}
