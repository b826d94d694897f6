//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/readiness/config.toml)
//! 3. Project config (.readiness/config.toml)
//! 4. Environment variables (READINESS_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{ReadinessError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // Double underscore separates sections so keys may contain '_'
        // (e.g., READINESS_AUTH__LOGIN_PATH -> auth.login_path)
        figment = figment.merge(Env::prefixed("READINESS_").split("__").lowercase(true));

        Self::extract(figment)
    }

    /// Load configuration from a specific file only (defaults fill the gaps)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(ReadinessError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::file(path)),
        )
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| ReadinessError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/readiness/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("readiness"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".readiness")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Render the effective configuration as TOML or JSON
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| ReadinessError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a default config file into `dir`, creating it if needed.
    /// Existing files are left alone unless `force` is set.
    pub fn init_in(dir: &Path, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_config_content())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            ReadinessError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::init_in(&global_dir, force)
    }

    /// Initialize project configuration
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::init_in(&Self::project_dir(), force)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_config_content() -> String {
        r#"# Readiness Dashboard Configuration
# Project settings in .readiness/config.toml override ~/.config/readiness/config.toml.

version = "1.0"

[auth]
login_path = "/login"
default_path = "/dashboard"

[api]
base_url = "http://localhost:8000/api"
timeout_secs = 30

[cache]
stale_time_secs = 300
refetch_concurrency = 4

# source = "static" uses the built-in price table.
# source = "http" posts usage records to `endpoint`.
[pricing]
source = "static"
timeout_secs = 10
"#
        .to_string()
    }
}
