//! Service wiring: picks store, sender and blob backends from configuration
//! and composes them into the intake service and the email queue.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::{info, warn};

use investi_events::{AnalyticsSink, TracingAnalyticsSink};
use investi_infra::blob::{BlobStore, LocalBlobStore};
use investi_infra::email_queue::{
    EmailQueue, EmailQueueConfig, EmailQueueStore, InMemoryEmailQueueStore,
    PostgresEmailQueueStore, RetryPolicy,
};
use investi_infra::hooks::{AnalyticsHook, ConfirmationEmailHook, HookRunner};
use investi_infra::intake_service::IntakeService;
use investi_infra::mailer::{EmailSender, HttpEmailSender, LogEmailSender, SendError};
use investi_infra::store::{
    InMemoryIntakeStore, IntakeStore, PostgresIntakeStore, StoreError, run_migrations,
};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("schema migration failed: {0}")]
    Migration(#[from] StoreError),
    #[error("email sender: {0}")]
    Sender(#[from] SendError),
}

/// Storage and delivery backends the services are composed from.
pub struct Backends {
    pub intake: Arc<dyn IntakeStore>,
    pub queue: Arc<dyn EmailQueueStore>,
    pub sender: Arc<dyn EmailSender>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub blobs: Arc<dyn BlobStore>,
}

/// Everything a request handler needs.
pub struct AppServices {
    pub intake: IntakeService,
    pub queue: EmailQueue,
    pub blobs: Arc<dyn BlobStore>,
    pub cron_batch_size: usize,
    pub cron_secret: Option<String>,
    pub admin_secret: Option<String>,
}

impl AppServices {
    pub fn new(config: &AppConfig, backends: Backends) -> Self {
        let queue = EmailQueue::new(
            backends.queue,
            backends.sender,
            EmailQueueConfig::default()
                .with_policy(RetryPolicy::next_run(config.email.max_attempts))
                .with_lease(config.email.claim_lease),
        );

        let hooks = HookRunner::new()
            .with(ConfirmationEmailHook::new(queue.clone()))
            .with(AnalyticsHook::detached(backends.analytics));

        Self {
            intake: IntakeService::new(backends.intake, hooks),
            queue,
            blobs: backends.blobs,
            cron_batch_size: config.cron_batch_size,
            cron_secret: config.cron_secret.clone(),
            admin_secret: config.admin_secret.clone(),
        }
    }
}

/// Build production services from configuration.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, ServicesError> {
    let (intake, queue): (Arc<dyn IntakeStore>, Arc<dyn EmailQueueStore>) = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            run_migrations(&pool).await?;
            info!("using postgres stores");
            (
                Arc::new(PostgresIntakeStore::new(pool.clone())),
                Arc::new(PostgresEmailQueueStore::new(pool)),
            )
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory stores (data is lost on restart)");
            (
                Arc::new(InMemoryIntakeStore::new()),
                Arc::new(InMemoryEmailQueueStore::new()),
            )
        }
    };

    let sender: Arc<dyn EmailSender> = match &config.email.api_key {
        Some(key) => Arc::new(HttpEmailSender::new(
            &config.email.api_url,
            key.clone(),
            config.email.from.clone(),
        )?),
        None => {
            warn!("EMAIL_API_KEY not set; emails will be logged, not sent");
            Arc::new(LogEmailSender)
        }
    };

    let backends = Backends {
        intake,
        queue,
        sender,
        analytics: Arc::new(TracingAnalyticsSink),
        blobs: Arc::new(LocalBlobStore::new(
            config.upload_dir.clone(),
            config.upload_public_base_url.clone(),
        )),
    };

    Ok(AppServices::new(config, backends))
}
