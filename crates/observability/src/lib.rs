//! Process-wide tracing setup shared by the server binary and tests.

/// Initialize tracing with the defaults read from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogConfig::from_env());
}

/// Subscriber configuration (filter, output format).
pub mod tracing;
