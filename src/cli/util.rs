//! CLI Common Utilities
//!
//! Shared configuration loading for command handlers.

use std::path::Path;

use crate::auth::{Role, Session, User};
use crate::config::{Config, ConfigLoader};
use crate::guard::RouteGuard;
use crate::pricing::TokenUsageEstimator;
use crate::types::Result;

/// User id given to sessions simulated from the command line
pub const CLI_USER_ID: &str = "cli-user";

/// Command execution context
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: Config,
}

impl CommandContext {
    /// Load from an explicit file, or the full resolution chain when none is given
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        Ok(Self { config })
    }

    pub fn guard(&self) -> Result<RouteGuard> {
        RouteGuard::from_config(&self.config.auth)
    }

    pub fn estimator(&self) -> Result<TokenUsageEstimator> {
        TokenUsageEstimator::from_config(&self.config.pricing)
    }
}

/// Session described by CLI flags: loading wins, then role, else anonymous
pub fn simulated_session(role: Option<Role>, loading: bool) -> Session {
    if loading {
        return Session::loading();
    }
    match role {
        Some(role) => Session::signed_in(User::new(CLI_USER_ID, role)),
        None => Session::anonymous(),
    }
}
