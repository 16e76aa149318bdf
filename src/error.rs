//! Error types at the library boundary.
//!
//! [`RemoteError`] never escapes the remote fetcher: every variant is absorbed
//! into a stale or degraded cache state. [`IndexError`] is what callers of the
//! manager can actually receive.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures at the remote listing boundary.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limit exceeded, resets at {reset_at}")]
    RateLimitExceeded { reset_at: DateTime<Utc> },

    /// The repository or listing does not exist. Treated as an empty index.
    #[error("remote listing not found")]
    NotFound,

    #[error("remote fetch timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("could not decode remote response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Network(e.to_string())
        }
    }
}

/// Errors returned to callers of the unified index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Bad element type or malformed query. A caller bug, not an environment
    /// condition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_reports_milliseconds() {
        let err = RemoteError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "remote fetch timed out after 250ms");
    }
}
