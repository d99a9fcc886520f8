//! Error types used throughout the engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for termical
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TermicalError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for termical operations
pub type Result<T> = std::result::Result<T, TermicalError>;

/// Errors raised by the calendar source.
///
/// All variants are recovered locally by serving cached data; none of them
/// aborts a sync attempt with a hard error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Credentials rejected or expired
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection-level failure or upstream server error
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream rate limit exceeded
    #[error("Rate limit exceeded (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },
}

/// Errors raised by the enrichment service, per activity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrichError {
    /// Rate limit exceeded - retried with backoff
    #[error("Rate limit exceeded (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// Call exceeded the configured timeout - retried with backoff
    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Response body doesn't match the expected schema - not retried
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl EnrichError {
    /// Persistable error category for `EnrichmentStatus::Failed`.
    pub fn kind(&self) -> EnrichErrorKind {
        match self {
            Self::RateLimited { .. } => EnrichErrorKind::RateLimited,
            Self::Timeout(_) => EnrichErrorKind::Timeout,
            Self::InvalidResponse(_) => EnrichErrorKind::InvalidResponse,
        }
    }

    /// Whether another attempt has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidResponse(_))
    }
}

/// Error category stored alongside a failed activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichErrorKind {
    RateLimited,
    Timeout,
    InvalidResponse,
}

impl EnrichErrorKind {
    /// Stable string form used by storage backends.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid_response",
        }
    }

    /// Parse the stable string form back; `None` for unknown input.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rate_limited" => Some(Self::RateLimited),
            "timeout" => Some(Self::Timeout),
            "invalid_response" => Some(Self::InvalidResponse),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnrichErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
