//! Error taxonomy for ddleash.
//!
//! Auth failures are terminal and never retried. Transport, status and
//! decode failures are retryable at the per-metric level; once a metric's
//! retry budget is spent they surface as [`LeashError::Fetch`] and end the
//! whole run.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LeashError>;

#[derive(Debug, Error)]
pub enum LeashError {
    /// A web API call was made before a successful login.
    #[error("DDLeash not logged in")]
    NotAuthenticated,

    /// The login page did not set the authentication token cookie.
    #[error("dogwebl cookie not found")]
    CookieNotFound,

    #[error("login rejected with status {status}")]
    LoginRejected { status: u16 },

    /// Metric names could not be listed; nothing was fetched.
    #[error("failed to enumerate metric names: {0}")]
    Enumeration(#[source] Box<LeashError>),

    /// A metric detail fetch failed on every attempt.
    #[error("failed to fetch metric {name:?} after {attempts} attempt(s): {source}")]
    Fetch {
        name: String,
        attempts: u32,
        #[source]
        source: Box<LeashError>,
    },

    /// The run ended without a result from the aggregation stage.
    #[error("pipeline aborted before producing a result")]
    Aborted,

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response for request {url}: status {status}")]
    Status { url: String, status: u16 },

    #[error("malformed payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unknown value to monitor: {0:?}")]
    UnknownMonitorItem(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl LeashError {
    /// Authentication failures, including those wrapped by enumeration or
    /// fetch escalation.
    pub fn is_auth(&self) -> bool {
        match self {
            LeashError::NotAuthenticated
            | LeashError::CookieNotFound
            | LeashError::LoginRejected { .. } => true,
            LeashError::Enumeration(inner) => inner.is_auth(),
            LeashError::Fetch { source, .. } => source.is_auth(),
            _ => false,
        }
    }

    /// Whether another attempt at the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LeashError::Http(_) | LeashError::Status { .. } | LeashError::Decode { .. } => true,
            LeashError::Io(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_not_retryable() {
        assert!(LeashError::NotAuthenticated.is_auth());
        assert!(!LeashError::NotAuthenticated.is_retryable());
        assert!(!LeashError::CookieNotFound.is_retryable());
        assert!(!LeashError::LoginRejected { status: 403 }.is_retryable());
    }

    #[test]
    fn test_status_is_retryable() {
        let err = LeashError::Status {
            url: "https://x/metric/list".to_string(),
            status: 502,
        };
        assert!(err.is_retryable());
        assert!(!err.is_auth());
    }

    #[test]
    fn test_auth_seen_through_wrappers() {
        let err = LeashError::Fetch {
            name: "system.cpu".to_string(),
            attempts: 1,
            source: Box::new(LeashError::NotAuthenticated),
        };
        assert!(err.is_auth());
        assert!(LeashError::Enumeration(Box::new(LeashError::NotAuthenticated)).is_auth());
    }

    #[test]
    fn test_config_error_message() {
        let err = LeashError::Config("\"datadog.team\" must be set.".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: \"datadog.team\" must be set."
        );
    }
}
