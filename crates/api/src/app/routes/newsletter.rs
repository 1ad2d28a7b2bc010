use std::sync::Arc;

use axum::{body::Bytes, extract::Extension};

use investi_intake::{NewsletterSubmission, NewsletterSubscription};

use crate::app::{dto, errors, services::AppServices};

pub async fn subscribe(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> axum::response::Response {
    let submission: NewsletterSubmission = match dto::parse_form::<_, NewsletterSubscription>(&body) {
        Ok(s) => s,
        Err(invalid) => return errors::action_response(invalid),
    };
    errors::action_response(services.intake.subscribe_newsletter(submission).await)
}
