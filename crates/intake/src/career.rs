//! Career (job) applications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use investi_core::validation::{MAX_LONG_TEXT, MAX_SHORT_TEXT};
use investi_core::{ApplicationId, EmailAddress, ValidationErrors, Validator};

use crate::fold_key;

const MAX_YEARS_EXPERIENCE: i64 = 60;

/// Raw career form payload, exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerSubmission {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub linkedin: Option<String>,
    pub portfolio: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
    pub years_experience: Option<i64>,
}

/// A validated career application, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCareerApplication {
    pub full_name: String,
    pub email: EmailAddress,
    pub phone: Option<String>,
    pub position: String,
    pub linkedin: Option<String>,
    pub portfolio: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
    pub years_experience: u8,
}

impl CareerSubmission {
    pub fn validate(&self) -> Result<NewCareerApplication, ValidationErrors> {
        let mut v = Validator::new();

        let full_name = v.required("fullName", self.full_name.as_deref(), MAX_SHORT_TEXT);
        let email = v.email("email", self.email.as_deref());
        let phone = v.optional("phone", self.phone.as_deref(), 40);
        let position = v.required("position", self.position.as_deref(), MAX_SHORT_TEXT);
        let linkedin = v.optional_url("linkedin", self.linkedin.as_deref());
        let portfolio = v.optional_url("portfolio", self.portfolio.as_deref());
        let resume_url = v.optional("resumeUrl", self.resume_url.as_deref(), MAX_LONG_TEXT);
        let cover_letter = v.optional("coverLetter", self.cover_letter.as_deref(), MAX_LONG_TEXT);
        let years = v.range("yearsExperience", self.years_experience, 0, MAX_YEARS_EXPERIENCE);

        let (Some(email), Some(years), true) = (email, years, v.is_clean()) else {
            return Err(v.into_errors());
        };
        let Ok(years_experience) = u8::try_from(years) else {
            return Err(ValidationErrors::single("yearsExperience", "is out of range"));
        };

        Ok(NewCareerApplication {
            full_name,
            email,
            phone,
            position,
            linkedin,
            portfolio,
            resume_url,
            cover_letter,
            years_experience,
        })
    }
}

impl NewCareerApplication {
    /// Candidates may apply to several positions, once each.
    pub fn uniqueness_key(&self) -> (EmailAddress, String) {
        (self.email.clone(), fold_key(&self.position))
    }
}

/// A persisted career application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerApplication {
    pub id: ApplicationId,
    #[serde(flatten)]
    pub details: NewCareerApplication,
    pub created_at: DateTime<Utc>,
}

impl CareerApplication {
    pub fn new(details: NewCareerApplication) -> Self {
        Self {
            id: ApplicationId::new(),
            details,
            created_at: Utc::now(),
        }
    }
}
