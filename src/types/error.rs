//! Unified Error Type System
//!
//! Centralized error types for the dashboard core.
//! Network failures carry a category so the UI layer can decide how to
//! present them (retry toast, re-login prompt, plain error).
//!
//! ## Error Categories
//!
//! - **Auth**: Session rejected by the server (re-authenticate)
//! - **BadRequest**: Request rejected as invalid (fix input)
//! - **NotFound**: Entity no longer exists
//! - **Conflict**: Concurrent modification on the server
//! - **RateLimit**: Too many requests (wait and retry)
//! - **Transient**: Server-side issue that may resolve (retry)
//! - **Network**: Connectivity issues (retry with backoff)
//!
//! Route-guard outcomes are never errors: loading, login and default
//! redirects are decisions, not failures.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Network error categories for presentation and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Session rejected - prompt for login, don't retry
    Auth,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Entity missing on the server
    NotFound,
    /// Server rejected a concurrent modification
    Conflict,
    /// Rate limited - wait then retry
    RateLimit,
    /// Temporary server issues - retry
    Transient,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Response body could not be decoded
    Decode,
    /// Unknown error - conservative retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth => write!(f, "AUTH"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Network => write!(f, "NETWORK"),
            Self::Decode => write!(f, "DECODE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if the same request may succeed when retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::Transient)
    }

    /// Get recommended retry delay for this category
    pub fn recommended_delay(&self) -> Duration {
        match self {
            Self::RateLimit => Duration::from_secs(30),
            Self::Network => Duration::from_secs(5),
            Self::Transient => Duration::from_secs(2),
            _ => Duration::from_millis(500),
        }
    }
}

// =============================================================================
// Network Error
// =============================================================================

/// Failed network operation with category and optional HTTP status
#[derive(Debug, Clone)]
pub struct NetworkError {
    /// Error category for presentation decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// HTTP status, when the server answered
    pub status: Option<u16>,
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "[{}:{}] {}", self.category, status, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

impl std::error::Error for NetworkError {}

impl NetworkError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            status: None,
        }
    }

    /// Classify an HTTP status code. Any non-2xx status is a failure.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let category = match status {
            401 | 403 => ErrorCategory::Auth,
            400 | 422 => ErrorCategory::BadRequest,
            404 | 410 => ErrorCategory::NotFound,
            409 | 412 => ErrorCategory::Conflict,
            429 => ErrorCategory::RateLimit,
            500 | 502 | 503 | 504 => ErrorCategory::Transient,
            _ => ErrorCategory::Unknown,
        };
        Self {
            category,
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }
        let category = if err.is_decode() {
            ErrorCategory::Decode
        } else if err.is_timeout() || err.is_connect() || err.is_request() {
            ErrorCategory::Network
        } else {
            ErrorCategory::Unknown
        };
        Self::new(category, err.to_string())
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ReadinessError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Mutation rejected by the network or server; cache already rolled back
    #[error("Mutation '{mutation}' failed: {source}")]
    MutationFailed {
        mutation: String,
        #[source]
        source: Box<ReadinessError>,
    },

    /// Consumer went away before the operation resolved
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("No route matches '{0}'")]
    RouteNotFound(String),

    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidRoute { pattern: String, reason: String },

    #[error("Pricing lookup failed for {model_id}: {reason}")]
    Pricing { model_id: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ReadinessError {
    fn from(err: reqwest::Error) -> Self {
        ReadinessError::Network(NetworkError::from(err))
    }
}

pub type Result<T> = std::result::Result<T, ReadinessError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl ReadinessError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Wrap a failure surfaced by a mutation's network operation
    pub fn mutation_failed(mutation: impl Into<String>, source: ReadinessError) -> Self {
        Self::MutationFailed {
            mutation: mutation.into(),
            source: Box::new(source),
        }
    }

    /// Create a pricing error
    pub fn pricing(model_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Pricing {
            model_id: model_id.into(),
            reason: reason.into(),
        }
    }

    /// Network category behind this error, if any
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Network(e) => Some(e.category),
            Self::MutationFailed { source, .. } => source.category(),
            Self::Timeout { .. } => Some(ErrorCategory::Network),
            _ => None,
        }
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            _ => self.category().is_some_and(|c| c.is_retryable()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
        assert_eq!(ErrorCategory::NotFound.to_string(), "NOT_FOUND");
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::BadRequest.is_retryable());
        assert!(!ErrorCategory::Conflict.is_retryable());
    }

    #[test]
    fn test_classify_http_status() {
        assert_eq!(
            NetworkError::from_status(429, "slow down").category,
            ErrorCategory::RateLimit
        );
        assert_eq!(
            NetworkError::from_status(401, "who are you").category,
            ErrorCategory::Auth
        );
        assert_eq!(
            NetworkError::from_status(503, "down").category,
            ErrorCategory::Transient
        );
        assert_eq!(
            NetworkError::from_status(409, "stale write").category,
            ErrorCategory::Conflict
        );
        assert_eq!(
            NetworkError::from_status(302, "redirected").category,
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn test_network_error_display() {
        let err = NetworkError::from_status(404, "survey missing");
        assert_eq!(err.to_string(), "[NOT_FOUND:404] survey missing");

        let err = NetworkError::new(ErrorCategory::Network, "connection refused");
        assert_eq!(err.to_string(), "[NETWORK] connection refused");
    }

    #[test]
    fn test_mutation_failed_keeps_category() {
        let err = ReadinessError::mutation_failed(
            "rename-user",
            NetworkError::from_status(502, "bad gateway").into(),
        );
        assert_eq!(err.category(), Some(ErrorCategory::Transient));
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("rename-user"));
    }

    #[test]
    fn test_recommended_delay() {
        assert!(ErrorCategory::RateLimit.recommended_delay() >= Duration::from_secs(30));
        assert!(ErrorCategory::Network.recommended_delay() >= Duration::from_secs(5));
    }
}
