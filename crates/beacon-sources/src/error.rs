use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single `scan()` call.
///
/// The orchestrator only cares which side of the line a failure falls on:
/// transient failures are retried with backoff, configuration failures
/// disable the adapter for the rest of the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Rate limit, network failure, timeout, or a malformed upstream payload.
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// Missing or rejected credentials, or an unusable adapter setup.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl FetchError {
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, FetchError::Configuration(_))
    }

    /// Classify a non-success HTTP status.
    ///
    /// 401/403 only mean bad credentials when the request carried some;
    /// anonymous feeds answering 403 are treated as upstream throttling.
    #[must_use]
    pub fn from_status(status: StatusCode, url: &str, authenticated: bool) -> Self {
        let is_auth_rejection =
            status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN;
        if authenticated && is_auth_rejection {
            FetchError::Configuration(format!("credentials rejected ({status}) by {url}"))
        } else {
            FetchError::Transient(format!("unexpected HTTP status {status} from {url}"))
        }
    }

    pub(crate) fn decode(context: &str, error: impl std::fmt::Display) -> Self {
        FetchError::Transient(format!("failed to decode {context}: {error}"))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            FetchError::Configuration(format!("invalid request: {e}"))
        } else {
            FetchError::Transient(format!("HTTP error: {e}"))
        }
    }
}
