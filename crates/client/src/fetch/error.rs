//! Network collaborator error types.

use std::sync::Arc;

use railbook_core::Error;

/// Errors from the network collaborator.
///
/// A non-2xx status is not an error here: the response is returned and the
/// policy decides what it means.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// Request timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Host unreachable: offline, DNS failure, connection refused.
    #[error("offline: {0}")]
    Offline(String),

    /// Response body exceeded the configured limit.
    #[error("response too large: {0}")]
    TooLarge(String),

    /// Request could not be built or sent.
    #[error("request failed: {0}")]
    Request(Arc<reqwest::Error>),

    /// Request descriptor rejected before sending.
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout(err.to_string())
        } else if err.is_connect() {
            NetworkError::Offline(err.to_string())
        } else {
            NetworkError::Request(Arc::new(err))
        }
    }
}

impl From<NetworkError> for Error {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Timeout(msg) => Error::FetchTimeout(msg),
            NetworkError::Offline(msg) => Error::NetworkFailed(msg),
            NetworkError::TooLarge(msg) => Error::HttpError(msg),
            NetworkError::Request(e) => Error::NetworkFailed(e.to_string()),
            NetworkError::Invalid(msg) => Error::InvalidInput(msg),
        }
    }
}
