//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Route constants
pub mod routes {
    /// Where unauthenticated navigation is sent
    pub const LOGIN_PATH: &str = "/login";

    /// Where authenticated but unauthorized navigation is sent
    pub const DEFAULT_PATH: &str = "/dashboard";
}

/// Query cache constants
pub mod cache {
    /// Age after which a confirmed value is considered stale (seconds)
    pub const DEFAULT_STALE_TIME_SECS: u64 = 300;

    /// Maximum refetches in flight while draining the queue
    pub const DEFAULT_REFETCH_CONCURRENCY: usize = 4;
}

/// Pricing constants
pub mod pricing {
    /// Separator between provider and model in composite model ids
    pub const MODEL_ID_SEPARATOR: char = ':';

    /// Timeout for remote pricing lookups (seconds)
    pub const LOOKUP_TIMEOUT_SECS: u64 = 10;

    /// Tokens per pricing unit
    pub const TOKENS_PER_MILLION: f64 = 1_000_000.0;
}

/// HTTP/Network constants
pub mod network {
    /// Default API base URL
    pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
}
