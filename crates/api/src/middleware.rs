use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::app::errors::json_error;

/// Shared-secret bearer gate.
#[derive(Clone)]
pub struct SecretGate {
    secret: Option<Arc<str>>,
    /// Let every request through when no secret is configured
    open_when_unset: bool,
}

impl std::fmt::Debug for SecretGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretGate")
            .field("configured", &self.secret.is_some())
            .field("open_when_unset", &self.open_when_unset)
            .finish()
    }
}

impl SecretGate {
    /// Cron gate: enforced only when a secret is configured.
    pub fn optional(secret: Option<&str>) -> Self {
        Self {
            secret: secret.map(Arc::from),
            open_when_unset: true,
        }
    }

    /// Admin gate: without a secret nothing gets through.
    pub fn required(secret: Option<&str>) -> Self {
        Self {
            secret: secret.map(Arc::from),
            open_when_unset: false,
        }
    }

    pub fn allows(&self, headers: &HeaderMap) -> bool {
        match &self.secret {
            None => self.open_when_unset,
            Some(secret) => extract_bearer(headers)
                .map(|token| constant_time_eq(token.as_bytes(), secret.as_bytes()))
                .unwrap_or(false),
        }
    }
}

pub async fn require_secret(
    State(gate): State<SecretGate>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !gate.allows(req.headers()) {
        tracing::warn!(path = %req.uri().path(), "rejected request with missing or wrong bearer secret");
        return json_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    next.run(req).await
}

/// One log line per request.
pub async fn trace_requests(req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    use super::*;

    fn headers(auth: Option<&str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(v) = auth {
            h.insert(AUTHORIZATION, HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[test]
    fn optional_gate_is_open_without_secret() {
        let gate = SecretGate::optional(None);
        assert!(gate.allows(&headers(None)));
    }

    #[test]
    fn required_gate_is_closed_without_secret() {
        let gate = SecretGate::required(None);
        assert!(!gate.allows(&headers(Some("Bearer anything"))));
    }

    #[test]
    fn configured_secret_must_match_exactly() {
        let gate = SecretGate::optional(Some("s3cret"));
        assert!(gate.allows(&headers(Some("Bearer s3cret"))));
        assert!(!gate.allows(&headers(Some("Bearer s3cre"))));
        assert!(!gate.allows(&headers(Some("Basic s3cret"))));
        assert!(!gate.allows(&headers(Some("Bearer "))));
        assert!(!gate.allows(&headers(None)));
    }
}
