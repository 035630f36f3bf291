//! CLI error types.

use figura_config::ConfigError;
use figura_diagrams::DiagramError;
use figura_watch::WatchError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Diagram(#[from] DiagramError),

    #[error("{0}")]
    Watch(#[from] WatchError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Hint naming the tooling a failed render needs.
    pub(crate) fn remediation(&self) -> Option<&str> {
        match self {
            Self::Diagram(err) => err.remediation(),
            _ => None,
        }
    }
}
