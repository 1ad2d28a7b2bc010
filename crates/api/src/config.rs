//! Process configuration read from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use investi_infra::email_queue::{MAX_CLAIM_LEASE, MIN_CLAIM_LEASE};
use investi_infra::mailer::http::DEFAULT_ENDPOINT;

/// Hard ceiling on jobs claimed per cron invocation.
pub const MAX_CRON_BATCH: usize = 25;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    /// Provider key; `None` selects the log-only sender
    pub api_key: Option<String>,
    pub api_url: String,
    pub from: String,
    pub max_attempts: u32,
    pub claim_lease: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` runs on in-memory stores
    pub database_url: Option<String>,
    pub cron_secret: Option<String>,
    /// `None` locks the admin routes entirely
    pub admin_secret: Option<String>,
    pub email: EmailSettings,
    pub cron_batch_size: usize,
    pub upload_dir: PathBuf,
    pub upload_public_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            cron_secret: None,
            admin_secret: None,
            email: EmailSettings {
                api_key: None,
                api_url: DEFAULT_ENDPOINT.to_string(),
                from: "Investi <hello@investi.com>".to_string(),
                max_attempts: 3,
                claim_lease: Duration::from_secs(600),
            },
            cron_batch_size: 10,
            upload_dir: PathBuf::from("./uploads"),
            upload_public_base_url: "/uploads".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => parse("BIND_ADDR", raw)?,
            None => defaults.bind_addr,
        };

        let max_attempts = match get("EMAIL_MAX_ATTEMPTS") {
            Some(raw) => parse::<u32>("EMAIL_MAX_ATTEMPTS", raw.clone()).and_then(|n| {
                if n == 0 {
                    Err(ConfigError::Invalid { key: "EMAIL_MAX_ATTEMPTS", value: raw })
                } else {
                    Ok(n)
                }
            })?,
            None => defaults.email.max_attempts,
        };

        let claim_lease = match get("EMAIL_CLAIM_LEASE_SECS") {
            Some(raw) => {
                let lease = Duration::from_secs(parse("EMAIL_CLAIM_LEASE_SECS", raw.clone())?);
                if !(MIN_CLAIM_LEASE..=MAX_CLAIM_LEASE).contains(&lease) {
                    return Err(ConfigError::Invalid { key: "EMAIL_CLAIM_LEASE_SECS", value: raw });
                }
                lease
            }
            None => defaults.email.claim_lease,
        };

        let cron_batch_size = match get("CRON_BATCH_SIZE") {
            Some(raw) => parse::<usize>("CRON_BATCH_SIZE", raw)?.clamp(1, MAX_CRON_BATCH),
            None => defaults.cron_batch_size,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            cron_secret: get("CRON_SECRET"),
            admin_secret: get("ADMIN_SECRET"),
            email: EmailSettings {
                api_key: get("EMAIL_API_KEY"),
                api_url: get("EMAIL_API_URL").unwrap_or(defaults.email.api_url),
                from: get("EMAIL_FROM").unwrap_or(defaults.email.from),
                max_attempts,
                claim_lease,
            },
            cron_batch_size,
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            upload_public_base_url: get("UPLOAD_PUBLIC_BASE_URL")
                .unwrap_or(defaults.upload_public_base_url),
        })
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw })
}
