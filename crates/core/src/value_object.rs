//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

/// A syntactically valid, normalised (trimmed, lowercased) email address.
///
/// Normalisation is what makes the address usable as a uniqueness key:
/// `Ada@Example.COM` and `ada@example.com` are the same subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse and normalise an address of the shape `local@domain.tld`.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalised = raw.trim().to_lowercase();
        if normalised.is_empty() {
            return Err(DomainError::invalid_email("email is empty"));
        }
        if normalised.len() > MAX_EMAIL_LEN {
            return Err(DomainError::invalid_email(format!("email longer than {MAX_EMAIL_LEN} bytes")));
        }
        if normalised.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(DomainError::invalid_email("email contains whitespace"));
        }

        let (local, domain) = normalised
            .split_once('@')
            .ok_or_else(|| DomainError::invalid_email("email is missing '@'"))?;
        if domain.contains('@') {
            return Err(DomainError::invalid_email("email contains more than one '@'"));
        }
        if local.is_empty() || local.len() > MAX_LOCAL_LEN {
            return Err(DomainError::invalid_email("email local part has an invalid length"));
        }
        if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
            return Err(DomainError::invalid_email("email local part has misplaced dots"));
        }

        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 {
            return Err(DomainError::invalid_email("email domain has no top-level domain"));
        }
        for label in &labels {
            if label.is_empty()
                || label.starts_with('-')
                || label.ends_with('-')
                || !label.chars().all(|c| c.is_alphanumeric() || c == '-')
            {
                return Err(DomainError::invalid_email(format!("email domain label '{label}' is invalid")));
            }
        }
        if labels.last().map_or(true, |tld| tld.chars().count() < 2) {
            return Err(DomainError::invalid_email("email top-level domain is too short"));
        }

        Ok(Self(normalised))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, d)| d)
    }
}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
