//! Intake domain: founder, investor and career applications, newsletter
//! subscriptions and waitlist entries.
//!
//! This crate turns untrusted form payloads into validated records and
//! defines the uniqueness keys each record is deduplicated on. It is pure
//! domain logic (no IO, no HTTP, no storage).

pub mod career;
pub mod choices;
pub mod founder;
pub mod investor;
pub mod kind;
pub mod newsletter;
pub mod waitlist;

pub use career::{CareerApplication, CareerSubmission, NewCareerApplication};
pub use choices::{InvestorType, Sector, Stage, TicketSize};
pub use founder::{FounderApplication, FounderSubmission, NewFounderApplication};
pub use investor::{InvestorApplication, InvestorIdentity, InvestorSubmission, NewInvestorApplication};
pub use kind::ApplicationKind;
pub use newsletter::{NewSubscription, NewsletterSubmission, NewsletterSubscription};
pub use waitlist::{WaitlistEntry, WaitlistSubmission};

/// Case-fold and whitespace-collapse a free-text value for use in a
/// uniqueness key.
pub fn fold_key(value: &str) -> String {
    value
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
