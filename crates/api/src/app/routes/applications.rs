//! Founder, investor and career application forms.

use std::sync::Arc;

use axum::{Router, body::Bytes, extract::Extension, routing::post};

use investi_intake::{
    CareerApplication, CareerSubmission, FounderApplication, FounderSubmission,
    InvestorApplication, InvestorSubmission,
};

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/founder", post(submit_founder))
        .route("/investor", post(submit_investor))
        .route("/career", post(submit_career))
}

pub async fn submit_founder(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> axum::response::Response {
    let submission: FounderSubmission = match dto::parse_form::<_, FounderApplication>(&body) {
        Ok(s) => s,
        Err(invalid) => return errors::action_response(invalid),
    };
    errors::action_response(services.intake.submit_founder(submission).await)
}

pub async fn submit_investor(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> axum::response::Response {
    let submission: InvestorSubmission = match dto::parse_form::<_, InvestorApplication>(&body) {
        Ok(s) => s,
        Err(invalid) => return errors::action_response(invalid),
    };
    errors::action_response(services.intake.submit_investor(submission).await)
}

pub async fn submit_career(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> axum::response::Response {
    let submission: CareerSubmission = match dto::parse_form::<_, CareerApplication>(&body) {
        Ok(s) => s,
        Err(invalid) => return errors::action_response(invalid),
    };
    errors::action_response(services.intake.submit_career(submission).await)
}
