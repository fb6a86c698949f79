//! Error type for identity backend operations.

use thiserror::Error;

/// Codes synthesized on the client, never sent by the service.
pub const UNEXPECTED_RESPONSE: &str = "unexpected_response";
pub const STATE_MISMATCH: &str = "state_mismatch";
pub const STORAGE_FAILED: &str = "storage_failed";

/// A failed identity operation, as reported by the service or synthesized
/// by the client transport layer.
///
/// `code` is a short machine-readable string (see [`crate::codes`]);
/// `message` is human-oriented context. Callers match on the code, not
/// the message.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct BackendError {
    pub code: String,
    pub message: String,
}

impl BackendError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_code(&self, code: &str) -> bool {
        self.code == code
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            Self::new(
                crate::codes::NETWORK_REQUEST_FAILED,
                format!("request failed: {}", err),
            )
        } else {
            Self::new(UNEXPECTED_RESPONSE, format!("bad response: {}", err))
        }
    }
}

impl From<felt_storage::StorageError> for BackendError {
    fn from(err: felt_storage::StorageError) -> Self {
        Self::new(STORAGE_FAILED, err.to_string())
    }
}

/// Result type for identity backend operations.
pub type IdentityResult<T> = Result<T, BackendError>;
