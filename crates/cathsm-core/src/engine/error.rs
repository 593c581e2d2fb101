use crate::core::credentials::CredentialError;
use crate::core::http::ClientError;
use crate::core::io::fasta::FastaError;
use crate::core::models::submission::PayloadLoadError;
use crate::core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Payload(#[from] PayloadLoadError),

    #[error(transparent)]
    Fasta(#[from] FastaError),

    #[error("Job {job_id} failed with status '{status}': {message}")]
    JobFailed {
        job_id: String,
        status: String,
        message: String,
    },

    #[error("Job {job_id} still pending after {attempts} status checks ({elapsed_secs}s)")]
    PollTimeout {
        job_id: String,
        attempts: u32,
        elapsed_secs: u64,
    },

    #[error("No results: {0}")]
    NoResults(String),

    #[error("Cannot {operation} a job in state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("Failed to write '{path}': {source}")]
    Output {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write hit table '{path}': {source}")]
    HitTable { path: String, source: csv::Error },
}

impl EngineError {
    /// True when the server rejected the stored token, i.e. logging in again may help.
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, EngineError::Client(ClientError::InvalidToken(_)))
    }
}
