use tracing_subscriber::EnvFilter;

use crate::infra::{config::LogConfig, error::SetupError};

/// Installs the global `tracing` subscriber for hosts that do not bring
/// their own. The configured level is the default directive; `RUST_LOG`
/// wins when set. Fails when a subscriber is already installed, so an
/// embedding application that configures tracing itself must simply skip
/// this call.
pub fn init(config: &LogConfig) -> Result<(), SetupError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(SetupError::LoggingInit)
}
