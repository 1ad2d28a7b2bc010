//! Intake pipeline: validate, dedupe, persist, then run post-commit hooks.
//!
//! ```text
//! Submission
//!   ↓
//! 1. Validate (all field violations collected)
//!   ↓
//! 2. Duplicate pre-check through the store
//!   ↓
//! 3. Insert one row (a unique violation here is also a duplicate)
//!   ↓
//! 4. Post-commit hooks (confirmation email, analytics), failures isolated
//! ```
//!
//! Every operation returns an [`ActionResult`]; nothing here panics or
//! propagates store errors to the caller.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument};

use investi_core::{ApplicationId, FieldViolation, ValidationErrors};
use investi_intake::{
    ApplicationKind, CareerApplication, CareerSubmission, FounderApplication, FounderSubmission,
    InvestorApplication, InvestorSubmission, NewsletterSubmission, NewsletterSubscription,
    WaitlistEntry, WaitlistSubmission,
};

use crate::hooks::{CommittedRecord, HookRunner};
use crate::store::{IntakeCounts, IntakeStore, StoreError};

pub const APPLICATION_EXISTS: &str = "Application already exists";
pub const ALREADY_SUBSCRIBED: &str = "Email already subscribed";
pub const ALREADY_REGISTERED: &str = "Email already registered";
pub const VALIDATION_FAILED: &str = "Validation failed";
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong";

/// Why an action did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFailure {
    Invalid,
    Duplicate,
    Store,
}

/// Uniform result envelope of every intake action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
    #[serde(skip)]
    pub failure: Option<ActionFailure>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: Some(message.into()),
            details: None,
            failure: None,
        }
    }

    fn failed(failure: ActionFailure, error: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            message: None,
            details: None,
            failure: Some(failure),
        }
    }

    pub fn invalid(errors: ValidationErrors) -> Self {
        Self {
            details: Some(errors.into_vec()),
            ..Self::failed(ActionFailure::Invalid, VALIDATION_FAILED)
        }
    }

    pub fn duplicate(error: &str) -> Self {
        Self::failed(ActionFailure::Duplicate, error)
    }

    pub fn store_failure() -> Self {
        Self::failed(ActionFailure::Store, SOMETHING_WENT_WRONG)
    }
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates intake actions over a store and a hook runner.
#[derive(Clone)]
pub struct IntakeService {
    store: Arc<dyn IntakeStore>,
    hooks: HookRunner,
}

impl std::fmt::Debug for IntakeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntakeService").field("hooks", &self.hooks).finish_non_exhaustive()
    }
}

impl IntakeService {
    pub fn new(store: Arc<dyn IntakeStore>, hooks: HookRunner) -> Self {
        Self { store, hooks }
    }

    #[instrument(skip_all, name = "submit_founder")]
    pub async fn submit_founder(&self, submission: FounderSubmission) -> ActionResult<FounderApplication> {
        let details = match submission.validate() {
            Ok(d) => d,
            Err(e) => return ActionResult::invalid(e),
        };
        let result = async {
            if self.store.founder_exists(&details.email).await? {
                return Ok(None);
            }
            let app = FounderApplication::new(details);
            self.store.insert_founder(&app).await?;
            Ok::<_, StoreError>(Some(app))
        }
        .await;
        self.complete(
            "founder",
            result,
            APPLICATION_EXISTS,
            "Application submitted successfully! We'll review it and get back to you soon.",
            CommittedRecord::Founder,
        )
        .await
    }

    #[instrument(skip_all, name = "submit_investor")]
    pub async fn submit_investor(&self, submission: InvestorSubmission) -> ActionResult<InvestorApplication> {
        let details = match submission.validate() {
            Ok(d) => d,
            Err(e) => return ActionResult::invalid(e),
        };
        let result = async {
            if self.store.investor_exists(&details).await? {
                return Ok(None);
            }
            let app = InvestorApplication::new(details);
            self.store.insert_investor(&app).await?;
            Ok::<_, StoreError>(Some(app))
        }
        .await;
        self.complete(
            "investor",
            result,
            APPLICATION_EXISTS,
            "Thank you for your interest! Our team will be in touch shortly.",
            CommittedRecord::Investor,
        )
        .await
    }

    #[instrument(skip_all, name = "submit_career")]
    pub async fn submit_career(&self, submission: CareerSubmission) -> ActionResult<CareerApplication> {
        let details = match submission.validate() {
            Ok(d) => d,
            Err(e) => return ActionResult::invalid(e),
        };
        let result = async {
            if self.store.career_exists(&details).await? {
                return Ok(None);
            }
            let app = CareerApplication::new(details);
            self.store.insert_career(&app).await?;
            Ok::<_, StoreError>(Some(app))
        }
        .await;
        self.complete(
            "career",
            result,
            APPLICATION_EXISTS,
            "Application received! We'll contact you if there's a fit.",
            CommittedRecord::Career,
        )
        .await
    }

    #[instrument(skip_all, name = "subscribe_newsletter")]
    pub async fn subscribe_newsletter(
        &self,
        submission: NewsletterSubmission,
    ) -> ActionResult<NewsletterSubscription> {
        let details = match submission.validate() {
            Ok(d) => d,
            Err(e) => return ActionResult::invalid(e),
        };
        let result = async {
            if self.store.subscription_exists(&details.email).await? {
                return Ok(None);
            }
            let sub = NewsletterSubscription::new(details);
            self.store.insert_subscription(&sub).await?;
            Ok::<_, StoreError>(Some(sub))
        }
        .await;
        self.complete(
            "newsletter",
            result,
            ALREADY_SUBSCRIBED,
            "Successfully subscribed to the newsletter!",
            CommittedRecord::Newsletter,
        )
        .await
    }

    /// The waitlist has no pre-check; the unique index alone decides.
    #[instrument(skip_all, name = "join_waitlist")]
    pub async fn join_waitlist(&self, submission: WaitlistSubmission) -> ActionResult<WaitlistEntry> {
        let email = match submission.validate() {
            Ok(e) => e,
            Err(e) => return ActionResult::invalid(e),
        };
        let entry = WaitlistEntry::new(email);
        let result = self.store.insert_waitlist(&entry).await.map(|()| Some(entry));
        self.complete(
            "waitlist",
            result,
            ALREADY_REGISTERED,
            "You're on the waitlist!",
            CommittedRecord::Waitlist,
        )
        .await
    }

    async fn complete<T: Clone>(
        &self,
        kind: &'static str,
        result: Result<Option<T>, StoreError>,
        duplicate_error: &str,
        success_message: &str,
        record: fn(T) -> CommittedRecord,
    ) -> ActionResult<T> {
        match result {
            Ok(Some(saved)) => {
                self.hooks.run(&record(saved.clone())).await;
                info!(kind, "intake record saved");
                ActionResult::ok(saved, success_message)
            }
            Ok(None) | Err(StoreError::Duplicate(_)) => {
                info!(kind, "duplicate submission rejected");
                ActionResult::duplicate(duplicate_error)
            }
            Err(e) => {
                error!(kind, error = %e, "intake store failure");
                ActionResult::store_failure()
            }
        }
    }

    /// Remove an application (test-data cleanup).
    #[instrument(skip(self))]
    pub async fn delete_application(&self, kind: ApplicationKind, id: ApplicationId) -> Result<(), IntakeError> {
        if self.store.delete_application(kind, id).await? {
            info!(kind = kind.as_str(), %id, "application deleted");
            Ok(())
        } else {
            Err(IntakeError::NotFound(format!("{} application {id}", kind.as_str())))
        }
    }

    pub async fn counts(&self) -> Result<IntakeCounts, IntakeError> {
        Ok(self.store.counts().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use investi_core::EmailAddress;
    use investi_events::{AnalyticsError, AnalyticsSink, IntakeEvent, InMemoryAnalyticsSink};
    use investi_intake::{NewCareerApplication, NewInvestorApplication};

    use crate::email_queue::{EmailQueue, EmailQueueConfig, EmailQueueStore, InMemoryEmailQueueStore};
    use crate::hooks::{AnalyticsHook, ConfirmationEmailHook};
    use crate::mailer::RecordingEmailSender;
    use crate::store::InMemoryIntakeStore;

    struct Harness {
        service: IntakeService,
        store: Arc<InMemoryIntakeStore>,
        queue: EmailQueue,
        sink: Arc<InMemoryAnalyticsSink>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryIntakeStore::new());
        let queue = EmailQueue::new(
            Arc::new(InMemoryEmailQueueStore::new()),
            Arc::new(RecordingEmailSender::new()),
            EmailQueueConfig::default(),
        );
        let sink = Arc::new(InMemoryAnalyticsSink::default());
        let hooks = HookRunner::new()
            .with(ConfirmationEmailHook::new(queue.clone()))
            .with(AnalyticsHook::inline(sink.clone()));
        Harness {
            service: IntakeService::new(store.clone(), hooks),
            store,
            queue,
            sink,
        }
    }

    fn founder(email: &str) -> FounderSubmission {
        FounderSubmission {
            full_name: Some("Ada Obi".into()),
            email: Some(email.into()),
            company_name: Some("Acme".into()),
            sector: Some("fintech".into()),
            stage: Some("seed".into()),
            pitch: Some("We make cross-border payments simple for SMEs.".into()),
            ..Default::default()
        }
    }

    fn investor(email: &str, name: &str, firm: &str) -> InvestorSubmission {
        InvestorSubmission {
            full_name: Some(name.into()),
            email: Some(email.into()),
            company_name: Some(firm.into()),
            investor_type: Some("angel".into()),
            investment_focus: Some(vec!["fintech".into()]),
            ticket_size: Some("50k_250k".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn founder_submission_persists_and_runs_hooks() {
        let h = harness();
        let result = h.service.submit_founder(founder("ada@example.com")).await;

        assert!(result.success);
        assert!(result.message.is_some());
        assert_eq!(h.store.counts().await.unwrap().founders, 1);
        assert_eq!(h.queue.queue_stats().await.unwrap().pending, 1);
        assert_eq!(h.sink.events().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_founder_email_is_rejected_case_insensitively() {
        let h = harness();
        assert!(h.service.submit_founder(founder("ada@example.com")).await.success);

        let again = h.service.submit_founder(founder("  ADA@Example.com ")).await;
        assert!(!again.success);
        assert_eq!(again.error.as_deref(), Some(APPLICATION_EXISTS));
        assert_eq!(again.failure, Some(ActionFailure::Duplicate));
        assert_eq!(h.store.counts().await.unwrap().founders, 1);
        // No second confirmation email.
        assert_eq!(h.queue.queue_stats().await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn invalid_submission_reports_every_field_and_writes_nothing() {
        let h = harness();
        let result = h.service.submit_founder(FounderSubmission::default()).await;

        assert_eq!(result.error.as_deref(), Some(VALIDATION_FAILED));
        let details = result.details.unwrap();
        for field in ["fullName", "email", "companyName", "sector", "stage", "pitch"] {
            assert!(details.iter().any(|v| v.field == field), "missing violation for {field}");
        }
        assert_eq!(h.store.counts().await.unwrap(), IntakeCounts::default());
        assert!(h.sink.events().is_empty());
    }

    #[tokio::test]
    async fn investor_with_empty_focus_is_invalid() {
        let h = harness();
        let mut sub = investor("vc@example.com", "Grace", "Fund");
        sub.investment_focus = Some(vec![]);

        let result = h.service.submit_investor(sub).await;
        assert_eq!(result.failure, Some(ActionFailure::Invalid));
        assert!(result.details.unwrap().iter().any(|v| v.field == "investmentFocus"));
    }

    #[tokio::test]
    async fn investor_identity_duplicate_is_rejected() {
        let h = harness();
        assert!(h.service.submit_investor(investor("a@fund.com", "Grace Hopper", "Navy Fund")).await.success);

        let again = h
            .service
            .submit_investor(investor("other@fund.com", "  grace   HOPPER ", "navy fund"))
            .await;
        assert_eq!(again.failure, Some(ActionFailure::Duplicate));
    }

    #[tokio::test]
    async fn career_dedupes_per_position() {
        let h = harness();
        let career = |position: &str| CareerSubmission {
            full_name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            position: Some(position.into()),
            years_experience: Some(3),
            ..Default::default()
        };

        assert!(h.service.submit_career(career("Backend Engineer")).await.success);
        assert!(h.service.submit_career(career("Designer")).await.success);
        let dup = h.service.submit_career(career("backend  engineer")).await;
        assert_eq!(dup.failure, Some(ActionFailure::Duplicate));
    }

    #[tokio::test]
    async fn newsletter_and_waitlist_duplicate_messages() {
        let h = harness();
        let news = || NewsletterSubmission {
            email: Some("n@example.com".into()),
            ..Default::default()
        };
        assert!(h.service.subscribe_newsletter(news()).await.success);
        assert_eq!(
            h.service.subscribe_newsletter(news()).await.error.as_deref(),
            Some(ALREADY_SUBSCRIBED)
        );

        let wait = || WaitlistSubmission { email: Some("w@example.com".into()) };
        assert!(h.service.join_waitlist(wait()).await.success);
        assert_eq!(
            h.service.join_waitlist(wait()).await.error.as_deref(),
            Some(ALREADY_REGISTERED)
        );
    }

    struct DownSink;

    #[async_trait]
    impl AnalyticsSink for DownSink {
        async fn track(&self, _event: &IntakeEvent) -> Result<(), AnalyticsError> {
            Err(AnalyticsError::Unavailable("offline".into()))
        }
    }

    struct DownQueueStore;

    #[async_trait]
    impl EmailQueueStore for DownQueueStore {
        async fn enqueue(&self, _job: crate::email_queue::EmailJob) -> Result<crate::email_queue::EmailJobId, StoreError> {
            Err(StoreError::storage("queue offline"))
        }
        async fn claim_batch(&self, _r: crate::email_queue::ClaimRequest) -> Result<Vec<crate::email_queue::EmailJob>, StoreError> {
            Err(StoreError::storage("queue offline"))
        }
        async fn record_attempt(&self, _job: &crate::email_queue::EmailJob) -> Result<bool, StoreError> {
            Err(StoreError::storage("queue offline"))
        }
        async fn get(&self, _id: crate::email_queue::EmailJobId) -> Result<Option<crate::email_queue::EmailJob>, StoreError> {
            Err(StoreError::storage("queue offline"))
        }
        async fn stats(&self) -> Result<crate::email_queue::QueueStats, StoreError> {
            Err(StoreError::storage("queue offline"))
        }
        async fn list_failed(&self, _limit: usize) -> Result<Vec<crate::email_queue::EmailJob>, StoreError> {
            Err(StoreError::storage("queue offline"))
        }
        async fn retry_failed(&self, _id: crate::email_queue::EmailJobId) -> Result<crate::email_queue::EmailJob, StoreError> {
            Err(StoreError::storage("queue offline"))
        }
    }

    #[tokio::test]
    async fn side_channel_failures_do_not_change_the_result() {
        let store = Arc::new(InMemoryIntakeStore::new());
        let queue = EmailQueue::new(
            Arc::new(DownQueueStore),
            Arc::new(RecordingEmailSender::new()),
            EmailQueueConfig::default(),
        );
        let hooks = HookRunner::new()
            .with(AnalyticsHook::inline(Arc::new(DownSink)))
            .with(ConfirmationEmailHook::new(queue));
        let service = IntakeService::new(store.clone(), hooks);

        let result = service.submit_founder(founder("ada@example.com")).await;
        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(store.counts().await.unwrap().founders, 1);
    }

    struct DownIntakeStore;

    #[async_trait]
    impl IntakeStore for DownIntakeStore {
        async fn founder_exists(&self, _e: &EmailAddress) -> Result<bool, StoreError> {
            Err(StoreError::storage("db down"))
        }
        async fn insert_founder(&self, _a: &FounderApplication) -> Result<(), StoreError> {
            Err(StoreError::storage("db down"))
        }
        async fn investor_exists(&self, _c: &NewInvestorApplication) -> Result<bool, StoreError> {
            Err(StoreError::storage("db down"))
        }
        async fn insert_investor(&self, _a: &InvestorApplication) -> Result<(), StoreError> {
            Err(StoreError::storage("db down"))
        }
        async fn career_exists(&self, _c: &NewCareerApplication) -> Result<bool, StoreError> {
            Err(StoreError::storage("db down"))
        }
        async fn insert_career(&self, _a: &CareerApplication) -> Result<(), StoreError> {
            Err(StoreError::storage("db down"))
        }
        async fn subscription_exists(&self, _e: &EmailAddress) -> Result<bool, StoreError> {
            Err(StoreError::storage("db down"))
        }
        async fn insert_subscription(&self, _s: &NewsletterSubscription) -> Result<(), StoreError> {
            Err(StoreError::storage("db down"))
        }
        async fn insert_waitlist(&self, _e: &WaitlistEntry) -> Result<(), StoreError> {
            Err(StoreError::storage("db down"))
        }
        async fn delete_application(&self, _k: ApplicationKind, _id: ApplicationId) -> Result<bool, StoreError> {
            Err(StoreError::storage("db down"))
        }
        async fn counts(&self) -> Result<IntakeCounts, StoreError> {
            Err(StoreError::storage("db down"))
        }
    }

    #[tokio::test]
    async fn store_failure_is_generic_and_skips_hooks() {
        let sink = Arc::new(InMemoryAnalyticsSink::default());
        let service = IntakeService::new(
            Arc::new(DownIntakeStore),
            HookRunner::new().with(AnalyticsHook::inline(sink.clone())),
        );

        let result = service.join_waitlist(WaitlistSubmission { email: Some("a@example.com".into()) }).await;
        assert_eq!(result.failure, Some(ActionFailure::Store));
        assert_eq!(result.error.as_deref(), Some(SOMETHING_WENT_WRONG));
        assert!(sink.events().is_empty());
        assert!(matches!(service.counts().await, Err(IntakeError::Store(_))));
    }

    #[tokio::test]
    async fn delete_application_reports_missing_rows() {
        let h = harness();
        let saved = h.service.submit_founder(founder("ada@example.com")).await.data.unwrap();

        h.service.delete_application(ApplicationKind::Founder, saved.id).await.unwrap();
        assert!(matches!(
            h.service.delete_application(ApplicationKind::Founder, saved.id).await,
            Err(IntakeError::NotFound(_))
        ));
    }
}
