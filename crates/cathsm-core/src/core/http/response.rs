use super::error::ClientError;
use super::transport::RawResponse;
use serde_json::Value;
use tracing::error;

const INVALID_TOKEN_PATTERN: &str = "invalid token";
const UNAUTHORIZED: u16 = 401;

/// A server response with its body parsed as JSON when the content type allows it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub action: String,
    pub status: u16,
    pub body: String,
    pub json: Option<Value>,
}

impl ApiResponse {
    pub fn from_raw(action: &str, raw: RawResponse) -> Self {
        let is_json = raw
            .content_type
            .as_deref()
            .is_none_or(|ct| ct.to_ascii_lowercase().contains("json"));
        let json = if is_json {
            serde_json::from_str(&raw.body).ok()
        } else {
            None
        };

        Self {
            action: action.to_string(),
            status: raw.status,
            body: raw.body,
            json,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn mentions_invalid_token(&self) -> bool {
        self.body.to_ascii_lowercase().contains(INVALID_TOKEN_PATTERN)
    }

    /// Classifies the response against the status code expected for its action and returns
    /// the parsed JSON body.
    pub fn expect(self, expected: u16) -> Result<Value, ClientError> {
        if self.status != expected {
            error!(
                "Request '{}' failed: status={} (expected {}), msg={}",
                self.action, self.status, expected, self.body
            );
            return Err(self.into_error(expected));
        }

        let action = self.action;
        match self.json {
            Some(value) => Ok(value),
            None => serde_json::from_str(&self.body).map_err(|e| ClientError::InvalidResponse {
                action,
                reason: format!("body is not valid JSON ({e})"),
            }),
        }
    }

    fn into_error(self, expected: u16) -> ClientError {
        if self.mentions_invalid_token() {
            ClientError::InvalidToken(self.body)
        } else if self.status == UNAUTHORIZED {
            ClientError::Authentication(self.body)
        } else {
            ClientError::Http {
                action: self.action,
                status: self.status,
                expected,
                body: self.body,
            }
        }
    }
}
