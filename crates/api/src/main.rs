use std::sync::Arc;

use anyhow::Context;

use investi_api::app::{build_app, build_services};
use investi_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    investi_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.cron_secret.is_none() {
        tracing::warn!("CRON_SECRET not set; /api/cron/process-emails is unauthenticated");
    }

    let services = build_services(&config)
        .await
        .context("failed to initialise services")?;
    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
