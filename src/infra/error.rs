use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while assembling the engine's environment, before any
/// sync work starts. Runtime degradations (fetch, send, push) never land
/// here; the orchestrator reports those as notices.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot read engine config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("engine config {path} is not valid TOML: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot install the log subscriber: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}
