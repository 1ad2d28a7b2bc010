use chrono::{DateTime, Utc};
use serde::Serialize;

use investi_core::{ApplicationId, SubscriptionId};
use investi_intake::{
    CareerApplication, FounderApplication, InvestorApplication, InvestorType, NewsletterSubscription,
    Sector, Stage, TicketSize, WaitlistEntry,
};

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "intake.founder.submitted").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Completed intake action.
///
/// Events carry identifiers and categorical properties only, never contact
/// details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntakeEvent {
    FounderApplicationSubmitted {
        application_id: ApplicationId,
        sector: Sector,
        stage: Stage,
        occurred_at: DateTime<Utc>,
    },
    InvestorApplicationSubmitted {
        application_id: ApplicationId,
        investor_type: InvestorType,
        ticket_size: TicketSize,
        focus_count: usize,
        occurred_at: DateTime<Utc>,
    },
    CareerApplicationSubmitted {
        application_id: ApplicationId,
        position: String,
        occurred_at: DateTime<Utc>,
    },
    NewsletterSubscribed {
        subscription_id: SubscriptionId,
        source: String,
        occurred_at: DateTime<Utc>,
    },
    WaitlistJoined {
        entry_id: SubscriptionId,
        occurred_at: DateTime<Utc>,
    },
}

impl IntakeEvent {
    pub fn founder_submitted(app: &FounderApplication) -> Self {
        Self::FounderApplicationSubmitted {
            application_id: app.id,
            sector: app.details.sector,
            stage: app.details.stage,
            occurred_at: app.created_at,
        }
    }

    pub fn investor_submitted(app: &InvestorApplication) -> Self {
        Self::InvestorApplicationSubmitted {
            application_id: app.id,
            investor_type: app.details.investor_type,
            ticket_size: app.details.ticket_size,
            focus_count: app.details.investment_focus.len(),
            occurred_at: app.created_at,
        }
    }

    pub fn career_submitted(app: &CareerApplication) -> Self {
        Self::CareerApplicationSubmitted {
            application_id: app.id,
            position: app.details.position.clone(),
            occurred_at: app.created_at,
        }
    }

    pub fn newsletter_subscribed(sub: &NewsletterSubscription) -> Self {
        Self::NewsletterSubscribed {
            subscription_id: sub.id,
            source: sub.details.source.clone(),
            occurred_at: sub.created_at,
        }
    }

    pub fn waitlist_joined(entry: &WaitlistEntry) -> Self {
        Self::WaitlistJoined {
            entry_id: entry.id,
            occurred_at: entry.created_at,
        }
    }
}

impl Event for IntakeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            IntakeEvent::FounderApplicationSubmitted { .. } => "intake.founder.submitted",
            IntakeEvent::InvestorApplicationSubmitted { .. } => "intake.investor.submitted",
            IntakeEvent::CareerApplicationSubmitted { .. } => "intake.career.submitted",
            IntakeEvent::NewsletterSubscribed { .. } => "intake.newsletter.subscribed",
            IntakeEvent::WaitlistJoined { .. } => "intake.waitlist.joined",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            IntakeEvent::FounderApplicationSubmitted { occurred_at, .. }
            | IntakeEvent::InvestorApplicationSubmitted { occurred_at, .. }
            | IntakeEvent::CareerApplicationSubmitted { occurred_at, .. }
            | IntakeEvent::NewsletterSubscribed { occurred_at, .. }
            | IntakeEvent::WaitlistJoined { occurred_at, .. } => *occurred_at,
        }
    }
}
