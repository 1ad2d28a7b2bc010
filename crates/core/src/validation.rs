//! Per-field validation reporting for untrusted form input.
//!
//! Intake forms never stop at the first bad field: every rule runs and each
//! failure is recorded against its field name, so the caller can show all of
//! them at once.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_object::EmailAddress;

/// Maximum length of single-line text fields (names, companies, positions).
pub const MAX_SHORT_TEXT: usize = 200;

/// Maximum length of free-text fields (pitch, message, cover letter).
pub const MAX_LONG_TEXT: usize = 2000;

/// A single rule failure on one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Non-empty collection of field violations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Error)]
#[serde(transparent)]
#[error("{}", join_violations(.0))]
pub struct ValidationErrors(Vec<FieldViolation>);

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldViolation {
            field: field.into(),
            message: message.into(),
        }])
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether any violation was recorded against `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }

    pub fn into_vec(self) -> Vec<FieldViolation> {
        self.0
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accumulates field violations while a submission is being checked.
///
/// Every helper returns the cleaned value when the rule passes and records a
/// violation (returning `None` or an empty value) when it does not.
#[derive(Debug, Default)]
pub struct Validator {
    violations: Vec<FieldViolation>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation against `field`.
    pub fn violation(&mut self, field: &str, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Required, trimmed, length-bounded text.
    pub fn required(&mut self, field: &str, value: Option<&str>, max_len: usize) -> String {
        match value.map(str::trim) {
            None | Some("") => {
                self.violation(field, "is required");
                String::new()
            }
            Some(v) if v.chars().count() > max_len => {
                self.violation(field, format!("must be at most {max_len} characters"));
                String::new()
            }
            Some(v) => v.to_string(),
        }
    }

    /// Optional text; blank input is treated as absent.
    pub fn optional(&mut self, field: &str, value: Option<&str>, max_len: usize) -> Option<String> {
        let v = value.map(str::trim).filter(|v| !v.is_empty())?;
        if v.chars().count() > max_len {
            self.violation(field, format!("must be at most {max_len} characters"));
            return None;
        }
        Some(v.to_string())
    }

    /// Required text with a minimum length (e.g. a pitch).
    pub fn required_between(
        &mut self,
        field: &str,
        value: Option<&str>,
        min_len: usize,
        max_len: usize,
    ) -> String {
        let before = self.violations.len();
        let v = self.required(field, value, max_len);
        if self.violations.len() == before && v.chars().count() < min_len {
            self.violation(field, format!("must be at least {min_len} characters"));
        }
        v
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) -> Option<EmailAddress> {
        match value.map(str::trim) {
            None | Some("") => {
                self.violation(field, "is required");
                None
            }
            Some(v) => match EmailAddress::parse(v) {
                Ok(email) => Some(email),
                Err(_) => {
                    self.violation(field, "must be a valid email address");
                    None
                }
            },
        }
    }

    /// Optional absolute http(s) URL.
    pub fn optional_url(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let v = self.optional(field, value, MAX_SHORT_TEXT)?;
        let lower = v.to_ascii_lowercase();
        let rest = lower
            .strip_prefix("https://")
            .or_else(|| lower.strip_prefix("http://"));
        match rest {
            Some(host) if !host.is_empty() && !v.contains(char::is_whitespace) => Some(v),
            _ => {
                self.violation(field, "must be a valid http(s) URL");
                None
            }
        }
    }

    /// Required enumerated choice.
    pub fn choice<T: FromStr>(&mut self, field: &str, value: Option<&str>) -> Option<T> {
        match value.map(str::trim) {
            None | Some("") => {
                self.violation(field, "is required");
                None
            }
            Some(v) => match v.parse::<T>() {
                Ok(choice) => Some(choice),
                Err(_) => {
                    self.violation(field, format!("'{v}' is not a recognised option"));
                    None
                }
            },
        }
    }

    /// List of enumerated choices; `min_items` of zero allows an empty list.
    /// Duplicates are dropped, first occurrence wins.
    pub fn choices<T: FromStr + PartialEq>(
        &mut self,
        field: &str,
        values: Option<&[String]>,
        min_items: usize,
    ) -> Vec<T> {
        let values = values.unwrap_or_default();
        let mut out: Vec<T> = Vec::with_capacity(values.len());
        let mut bad = false;
        for raw in values {
            match raw.trim().parse::<T>() {
                Ok(choice) => {
                    if !out.contains(&choice) {
                        out.push(choice);
                    }
                }
                Err(_) => {
                    self.violation(field, format!("'{}' is not a recognised option", raw.trim()));
                    bad = true;
                }
            }
        }
        if !bad && out.len() < min_items {
            self.violation(field, format!("select at least {min_items} option(s)"));
        }
        out
    }

    /// Inclusive numeric range.
    pub fn range(&mut self, field: &str, value: Option<i64>, min: i64, max: i64) -> Option<i64> {
        match value {
            None => {
                self.violation(field, "is required");
                None
            }
            Some(v) if v < min || v > max => {
                self.violation(field, format!("must be between {min} and {max}"));
                None
            }
            Some(v) => Some(v),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// The violations gathered so far (may be empty).
    pub fn into_errors(self) -> ValidationErrors {
        ValidationErrors(self.violations)
    }

    /// `Ok(())` when no rule failed.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.violations))
        }
    }
}
