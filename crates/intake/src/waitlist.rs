//! Waitlist entries: an email address and nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use investi_core::{EmailAddress, SubscriptionId, ValidationErrors, Validator};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaitlistSubmission {
    pub email: Option<String>,
}

impl WaitlistSubmission {
    pub fn validate(&self) -> Result<EmailAddress, ValidationErrors> {
        let mut v = Validator::new();
        match v.email("email", self.email.as_deref()) {
            Some(email) => Ok(email),
            None => Err(v.into_errors()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    pub id: SubscriptionId,
    pub email: EmailAddress,
    pub created_at: DateTime<Utc>,
}

impl WaitlistEntry {
    pub fn new(email: EmailAddress) -> Self {
        Self {
            id: SubscriptionId::new(),
            email,
            created_at: Utc::now(),
        }
    }
}
