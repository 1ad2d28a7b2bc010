//! `investi-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, the email value object and the
//! per-field validation report shared by every intake form.

pub mod error;
pub mod id;
pub mod validation;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::{ApplicationId, SubscriptionId};
pub use validation::{FieldViolation, ValidationErrors, Validator};
pub use value_object::EmailAddress;
