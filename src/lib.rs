//! Readiness - Dashboard Client Core
//!
//! Navigation guarding, optimistic query caching and LLM cost accounting for
//! the AI-readiness survey dashboard.
//!
//! ## Core Features
//!
//! - **Route Guard**: render, redirect or wait, per navigation and session
//! - **Query Cache**: declared invalidation, optimistic updates with exact rollback
//! - **Liveness Scopes**: late results never touch state after a consumer is gone
//! - **Cost Estimation**: provider + model + tokens to USD, never failing
//!
//! ## Quick Start
//!
//! ```ignore
//! use readiness::{QueryCache, RouteGuard, LivenessScope, MutationSpec};
//!
//! let config = ConfigLoader::load()?;
//! let guard = RouteGuard::from_config(&config.auth)?;
//! let decision = guard.navigate("/admin/users", &session)?;
//!
//! let cache = QueryCache::shared(&config.cache);
//! let scope = LivenessScope::new();
//! cache.run_mutation(spec, &scope, client.post_json("surveys", &body)).await?;
//! ```
//!
//! ## Modules
//!
//! - [`auth`]: session, roles and capabilities
//! - [`guard`]: route table and guard decisions
//! - [`cache`]: query cache coordinator and refetch queue
//! - [`net`]: HTTP API client and timeouts
//! - [`pricing`]: token usage estimator and pricing lookups
//! - [`config`]: layered configuration

pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod guard;
pub mod net;
pub mod pricing;
pub mod scope;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ErrorCategory, NetworkError, ReadinessError, Result};

// Auth & Guard
pub use auth::{AuthStateProvider, Role, Session, SessionWatch, User};
pub use guard::{GuardDecision, GuardState, RouteGuard, RouteRequirement, RouteTable};

// Cache
pub use cache::{
    CacheKey, Confirm, InvalidationRule, MutationSpec, OptimisticUpdate, QueryCache,
    QueryFetcher, SharedCache,
};
pub use scope::LivenessScope;

// Network
pub use net::{ApiClient, with_timeout};

// Pricing
pub use pricing::{PricingLookup, TokenUsageEstimator, UsageMetrics, UsageRecord};
