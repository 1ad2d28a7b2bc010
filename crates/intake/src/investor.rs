//! Investor applications.
//!
//! Investors are deduplicated on email, and additionally on the folded
//! `(full name, firm)` pair so the same person at the same firm cannot
//! re-apply under a second address.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use investi_core::validation::{MAX_LONG_TEXT, MAX_SHORT_TEXT};
use investi_core::{ApplicationId, EmailAddress, ValidationErrors, Validator};

use crate::choices::{InvestorType, Sector, Stage, TicketSize};
use crate::fold_key;

/// Raw investor form payload, exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorSubmission {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub investor_type: Option<String>,
    pub investment_focus: Option<Vec<String>>,
    pub preferred_stages: Option<Vec<String>>,
    pub ticket_size: Option<String>,
    pub linkedin: Option<String>,
    pub message: Option<String>,
}

/// A validated investor application, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvestorApplication {
    pub full_name: String,
    pub email: EmailAddress,
    pub phone: Option<String>,
    pub company_name: String,
    pub investor_type: InvestorType,
    pub investment_focus: Vec<Sector>,
    pub preferred_stages: Vec<Stage>,
    pub ticket_size: TicketSize,
    pub linkedin: Option<String>,
    pub message: Option<String>,
}

/// Secondary identity key: folded full name + folded firm name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvestorIdentity {
    pub name: String,
    pub company: String,
}

impl InvestorIdentity {
    pub fn new(full_name: &str, company_name: &str) -> Self {
        Self {
            name: fold_key(full_name),
            company: fold_key(company_name),
        }
    }
}

impl InvestorSubmission {
    pub fn validate(&self) -> Result<NewInvestorApplication, ValidationErrors> {
        let mut v = Validator::new();

        let full_name = v.required("fullName", self.full_name.as_deref(), MAX_SHORT_TEXT);
        let email = v.email("email", self.email.as_deref());
        let phone = v.optional("phone", self.phone.as_deref(), 40);
        let company_name = v.required("companyName", self.company_name.as_deref(), MAX_SHORT_TEXT);
        let investor_type = v.choice::<InvestorType>("investorType", self.investor_type.as_deref());
        let investment_focus =
            v.choices::<Sector>("investmentFocus", self.investment_focus.as_deref(), 1);
        let preferred_stages =
            v.choices::<Stage>("preferredStages", self.preferred_stages.as_deref(), 0);
        let ticket_size = v.choice::<TicketSize>("ticketSize", self.ticket_size.as_deref());
        let linkedin = v.optional_url("linkedin", self.linkedin.as_deref());
        let message = v.optional("message", self.message.as_deref(), MAX_LONG_TEXT);

        let (Some(email), Some(investor_type), Some(ticket_size), true) =
            (email, investor_type, ticket_size, v.is_clean())
        else {
            return Err(v.into_errors());
        };

        Ok(NewInvestorApplication {
            full_name,
            email,
            phone,
            company_name,
            investor_type,
            investment_focus,
            preferred_stages,
            ticket_size,
            linkedin,
            message,
        })
    }
}

impl NewInvestorApplication {
    pub fn identity(&self) -> InvestorIdentity {
        InvestorIdentity::new(&self.full_name, &self.company_name)
    }
}

/// A persisted investor application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorApplication {
    pub id: ApplicationId,
    #[serde(flatten)]
    pub details: NewInvestorApplication,
    pub created_at: DateTime<Utc>,
}

impl InvestorApplication {
    pub fn new(details: NewInvestorApplication) -> Self {
        Self {
            id: ApplicationId::new(),
            details,
            created_at: Utc::now(),
        }
    }

    /// Whether `candidate` would duplicate this application, by email or by
    /// the folded name + firm pair.
    pub fn is_duplicate_of(&self, candidate: &NewInvestorApplication) -> bool {
        self.details.email == candidate.email || self.details.identity() == candidate.identity()
    }
}
