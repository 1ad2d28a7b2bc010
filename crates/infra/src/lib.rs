//! Infrastructure layer: persistence, the email queue, email delivery, blob
//! storage and the intake service that composes them.

pub mod blob;
pub mod email_queue;
pub mod hooks;
pub mod intake_service;
pub mod mailer;
pub mod store;
