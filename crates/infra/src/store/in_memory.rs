//! In-memory intake store for tests/dev.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use investi_core::{ApplicationId, EmailAddress, SubscriptionId};
use investi_intake::{
    ApplicationKind, CareerApplication, FounderApplication, InvestorApplication,
    NewCareerApplication, NewInvestorApplication, NewsletterSubscription, WaitlistEntry,
};

use super::{IntakeCounts, IntakeStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    founders: BTreeMap<ApplicationId, FounderApplication>,
    investors: BTreeMap<ApplicationId, InvestorApplication>,
    careers: BTreeMap<ApplicationId, CareerApplication>,
    newsletter: BTreeMap<SubscriptionId, NewsletterSubscription>,
    waitlist: BTreeMap<SubscriptionId, WaitlistEntry>,
}

impl Tables {
    fn career_taken(&self, candidate: &NewCareerApplication) -> bool {
        let key = candidate.uniqueness_key();
        self.careers.values().any(|c| c.details.uniqueness_key() == key)
    }
}

/// In-memory intake store.
///
/// Each insert checks its uniqueness key and writes under a single write
/// lock, mirroring the unique indexes of the Postgres schema.
#[derive(Debug, Default)]
pub struct InMemoryIntakeStore {
    tables: RwLock<Tables>,
}

impl InMemoryIntakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::storage("intake store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::storage("intake store lock poisoned"))
    }
}

#[async_trait]
impl IntakeStore for InMemoryIntakeStore {
    async fn founder_exists(&self, email: &EmailAddress) -> Result<bool, StoreError> {
        Ok(self.read()?.founders.values().any(|f| &f.details.email == email))
    }

    async fn insert_founder(&self, app: &FounderApplication) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.founders.values().any(|f| f.details.email == app.details.email) {
            return Err(StoreError::Duplicate(format!("founder {}", app.details.email)));
        }
        t.founders.insert(app.id, app.clone());
        Ok(())
    }

    async fn investor_exists(&self, candidate: &NewInvestorApplication) -> Result<bool, StoreError> {
        Ok(self.read()?.investors.values().any(|i| i.is_duplicate_of(candidate)))
    }

    async fn insert_investor(&self, app: &InvestorApplication) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.investors.values().any(|i| i.details.email == app.details.email) {
            return Err(StoreError::Duplicate(format!("investor {}", app.details.email)));
        }
        t.investors.insert(app.id, app.clone());
        Ok(())
    }

    async fn career_exists(&self, candidate: &NewCareerApplication) -> Result<bool, StoreError> {
        Ok(self.read()?.career_taken(candidate))
    }

    async fn insert_career(&self, app: &CareerApplication) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.career_taken(&app.details) {
            return Err(StoreError::Duplicate(format!(
                "career {} / {}",
                app.details.email, app.details.position
            )));
        }
        t.careers.insert(app.id, app.clone());
        Ok(())
    }

    async fn subscription_exists(&self, email: &EmailAddress) -> Result<bool, StoreError> {
        Ok(self.read()?.newsletter.values().any(|s| &s.details.email == email))
    }

    async fn insert_subscription(&self, sub: &NewsletterSubscription) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.newsletter.values().any(|s| s.details.email == sub.details.email) {
            return Err(StoreError::Duplicate(format!("newsletter {}", sub.details.email)));
        }
        t.newsletter.insert(sub.id, sub.clone());
        Ok(())
    }

    async fn insert_waitlist(&self, entry: &WaitlistEntry) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.waitlist.values().any(|w| w.email == entry.email) {
            return Err(StoreError::Duplicate(format!("waitlist {}", entry.email)));
        }
        t.waitlist.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn delete_application(&self, kind: ApplicationKind, id: ApplicationId) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        let removed = match kind {
            ApplicationKind::Founder => t.founders.remove(&id).is_some(),
            ApplicationKind::Investor => t.investors.remove(&id).is_some(),
            ApplicationKind::Career => t.careers.remove(&id).is_some(),
        };
        Ok(removed)
    }

    async fn counts(&self) -> Result<IntakeCounts, StoreError> {
        let t = self.read()?;
        Ok(IntakeCounts {
            founders: t.founders.len() as u64,
            investors: t.investors.len() as u64,
            careers: t.careers.len() as u64,
            newsletter: t.newsletter.len() as u64,
            waitlist: t.waitlist.len() as u64,
        })
    }
}
