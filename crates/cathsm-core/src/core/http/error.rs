use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Unknown action '{0}': no endpoint registered under this name")]
    UnknownAction(String),

    #[error("Endpoint '{0}' is already registered")]
    DuplicateEndpoint(String),

    #[error("Malformed URL template for '{action}': {reason}")]
    MalformedTemplate { action: String, reason: String },

    #[error("URL template for '{action}' requires field '{placeholder}'")]
    MissingPlaceholder { action: String, placeholder: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("HTTP {status} from '{action}' (expected {expected}): {body}")]
    Http {
        action: String,
        status: u16,
        expected: u16,
        body: String,
    },

    #[error("Invalid response from '{action}': {reason}")]
    InvalidResponse { action: String, reason: String },

    #[error("Payload must serialize to a flat record: {0}")]
    Payload(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ClientError {
    /// HTTP status carried by the error, if it came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
