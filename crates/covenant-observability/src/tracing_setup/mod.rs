//! Tracing setup: structured logging with span definitions.

pub mod spans;

use tracing_subscriber::EnvFilter;

use covenant_core::config::ObservabilityConfig;

/// Environment variable holding the log filter directive.
pub const LOG_ENV_VAR: &str = "COVENANT_LOG";

/// Initialize the tracing subscriber with structured JSON output.
///
/// Respects `COVENANT_LOG`; falls back to `config.log_level`. Returns `false`
/// when a global subscriber was already installed (embedding hosts, tests).
pub fn init_tracing(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .try_init()
        .is_ok()
}

/// Initialize tracing with a custom filter string (for testing or embedding).
pub fn init_tracing_with_filter(filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(true)
        .json()
        .try_init()
        .is_ok()
}
