//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/readiness/) and project (.readiness/) level configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{cache, network, pricing, routes};
use crate::types::{ReadinessError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Route guard redirect targets
    pub auth: AuthConfig,

    /// Dashboard API transport
    pub api: ApiConfig,

    /// Query cache tuning
    pub cache: CacheConfig,

    /// Token cost estimation
    pub pricing: PricingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            auth: AuthConfig::default(),
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            pricing: PricingConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ReadinessError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("auth.login_path", &self.auth.login_path),
            ("auth.default_path", &self.auth.default_path),
        ] {
            if !path.starts_with('/') {
                return Err(ReadinessError::Config(format!(
                    "{} must be an absolute path, got '{}'",
                    name, path
                )));
            }
        }

        if self.auth.login_path == self.auth.default_path {
            return Err(ReadinessError::Config(
                "auth.login_path and auth.default_path must differ".to_string(),
            ));
        }

        url::Url::parse(&self.api.base_url).map_err(|e| {
            ReadinessError::Config(format!("Invalid api.base_url '{}': {}", self.api.base_url, e))
        })?;

        if self.api.timeout_secs == 0 {
            return Err(ReadinessError::Config(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.cache.refetch_concurrency == 0 {
            return Err(ReadinessError::Config(
                "cache.refetch_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.pricing.source == PricingSource::Http {
            let endpoint = self.pricing.endpoint.as_deref().ok_or_else(|| {
                ReadinessError::Config(
                    "pricing.endpoint is required when pricing.source = \"http\"".to_string(),
                )
            })?;
            url::Url::parse(endpoint).map_err(|e| {
                ReadinessError::Config(format!("Invalid pricing.endpoint '{}': {}", endpoint, e))
            })?;
        }

        if self.pricing.timeout_secs == 0 {
            return Err(ReadinessError::Config(
                "pricing.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Auth Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Where unauthenticated users are sent
    pub login_path: String,

    /// Where signed-in users without the required capability are sent
    pub default_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: routes::LOGIN_PATH.to_string(),
            default_path: routes::DEFAULT_PATH.to_string(),
        }
    }
}

// =============================================================================
// API Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL all entity paths are joined onto
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: network::DEFAULT_API_BASE.to_string(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Confirmed values older than this are served but flagged stale (0 = never)
    pub stale_time_secs: u64,

    /// Maximum refetches in flight while draining the refetch queue
    pub refetch_concurrency: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: cache::DEFAULT_STALE_TIME_SECS,
            refetch_concurrency: cache::DEFAULT_REFETCH_CONCURRENCY,
        }
    }
}

// =============================================================================
// Pricing Configuration
// =============================================================================

/// Where token prices come from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PricingSource {
    /// Built-in price table
    #[default]
    Static,
    /// Remote pricing endpoint
    Http,
}

impl std::fmt::Display for PricingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingSource::Static => write!(f, "static"),
            PricingSource::Http => write!(f, "http"),
        }
    }
}

impl std::str::FromStr for PricingSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "static" => Ok(PricingSource::Static),
            "http" => Ok(PricingSource::Http),
            _ => Err(format!(
                "Unknown pricing source: {}. Valid values: static, http",
                s
            )),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub source: PricingSource,

    /// Pricing endpoint (required for the http source)
    pub endpoint: Option<String>,

    /// Lookup timeout in seconds
    pub timeout_secs: u64,

    /// API key for the pricing endpoint.
    /// Never serialized to output for security
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for PricingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingConfig")
            .field("source", &self.source)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            source: PricingSource::Static,
            endpoint: None,
            timeout_secs: pricing::LOOKUP_TIMEOUT_SECS,
            api_key: None,
        }
    }
}
