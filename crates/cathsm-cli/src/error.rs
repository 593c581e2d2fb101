use cathsm::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write '{path}': {source}", path = path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} of {total} sequences failed")]
    BatchFailed { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// A follow-up suggestion printed under the error, when one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::Engine(e) if e.is_invalid_token() => Some(
                "The stored API token was rejected and has been removed; run again to log in, or pass --token.",
            ),
            CliError::Engine(EngineError::Credentials(_)) => {
                Some("Provide --token, or --user/--pass, or set API_TOKEN / API_USER / API_PASSWORD.")
            }
            CliError::BatchFailed { .. } => {
                Some("See the log output (or --log-file) for the failing sequences.")
            }
            _ => None,
        }
    }
}
