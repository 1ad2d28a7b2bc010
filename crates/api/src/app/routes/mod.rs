use axum::{Router, routing::post};

pub mod admin;
pub mod applications;
pub mod cron;
pub mod newsletter;
pub mod system;
pub mod uploads;
pub mod waitlist;

/// Public form and upload endpoints, mounted under `/api`.
pub fn router() -> Router {
    Router::new()
        .nest("/applications", applications::router())
        .route("/newsletter", post(newsletter::subscribe))
        .route("/waitlist", post(waitlist::join))
        .nest("/uploads", uploads::router())
}
