//! Newsletter subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use investi_core::validation::MAX_SHORT_TEXT;
use investi_core::{EmailAddress, SubscriptionId, ValidationErrors, Validator};

/// Source tag recorded when the form does not send one.
pub const DEFAULT_SOURCE: &str = "website";

const MAX_SOURCE_LEN: usize = 50;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubmission {
    pub email: Option<String>,
    pub name: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    pub email: EmailAddress,
    pub name: Option<String>,
    pub source: String,
}

impl NewsletterSubmission {
    pub fn validate(&self) -> Result<NewSubscription, ValidationErrors> {
        let mut v = Validator::new();

        let email = v.email("email", self.email.as_deref());
        let name = v.optional("name", self.name.as_deref(), MAX_SHORT_TEXT);
        let source = match v.optional("source", self.source.as_deref(), MAX_SOURCE_LEN) {
            Some(tag) if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') => {
                tag.to_ascii_lowercase()
            }
            Some(_) => {
                v.violation("source", "may only contain letters, digits, '-' and '_'");
                String::new()
            }
            None => DEFAULT_SOURCE.to_string(),
        };

        let (Some(email), true) = (email, v.is_clean()) else {
            return Err(v.into_errors());
        };

        Ok(NewSubscription { email, name, source })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscription {
    pub id: SubscriptionId,
    #[serde(flatten)]
    pub details: NewSubscription,
    pub created_at: DateTime<Utc>,
}

impl NewsletterSubscription {
    pub fn new(details: NewSubscription) -> Self {
        Self {
            id: SubscriptionId::new(),
            details,
            created_at: Utc::now(),
        }
    }
}
