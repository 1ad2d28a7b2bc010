//! Founder (startup) applications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use investi_core::validation::{MAX_LONG_TEXT, MAX_SHORT_TEXT};
use investi_core::{ApplicationId, EmailAddress, ValidationErrors, Validator};

use crate::choices::{Sector, Stage};

const MIN_PITCH_LEN: usize = 20;

/// Raw founder form payload, exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FounderSubmission {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub sector: Option<String>,
    pub stage: Option<String>,
    pub funding_sought: Option<String>,
    pub pitch: Option<String>,
    pub location: Option<String>,
}

/// A validated founder application, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFounderApplication {
    pub full_name: String,
    pub email: EmailAddress,
    pub phone: Option<String>,
    pub company_name: String,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub sector: Sector,
    pub stage: Stage,
    pub funding_sought: Option<String>,
    pub pitch: String,
    pub location: Option<String>,
}

impl FounderSubmission {
    pub fn validate(&self) -> Result<NewFounderApplication, ValidationErrors> {
        let mut v = Validator::new();

        let full_name = v.required("fullName", self.full_name.as_deref(), MAX_SHORT_TEXT);
        let email = v.email("email", self.email.as_deref());
        let phone = v.optional("phone", self.phone.as_deref(), 40);
        let company_name = v.required("companyName", self.company_name.as_deref(), MAX_SHORT_TEXT);
        let website = v.optional_url("website", self.website.as_deref());
        let linkedin = v.optional_url("linkedin", self.linkedin.as_deref());
        let sector = v.choice::<Sector>("sector", self.sector.as_deref());
        let stage = v.choice::<Stage>("stage", self.stage.as_deref());
        let funding_sought = v.optional("fundingSought", self.funding_sought.as_deref(), MAX_SHORT_TEXT);
        let pitch = v.required_between("pitch", self.pitch.as_deref(), MIN_PITCH_LEN, MAX_LONG_TEXT);
        let location = v.optional("location", self.location.as_deref(), MAX_SHORT_TEXT);

        let (Some(email), Some(sector), Some(stage), true) = (email, sector, stage, v.is_clean())
        else {
            return Err(v.into_errors());
        };

        Ok(NewFounderApplication {
            full_name,
            email,
            phone,
            company_name,
            website,
            linkedin,
            sector,
            stage,
            funding_sought,
            pitch,
            location,
        })
    }
}

/// A persisted founder application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FounderApplication {
    pub id: ApplicationId,
    #[serde(flatten)]
    pub details: NewFounderApplication,
    pub created_at: DateTime<Utc>,
}

impl FounderApplication {
    pub fn new(details: NewFounderApplication) -> Self {
        Self {
            id: ApplicationId::new(),
            details,
            created_at: Utc::now(),
        }
    }
}
