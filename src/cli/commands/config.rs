//! Config Command
//!
//! Manage readiness configuration.
//!
//! Usage:
//!   readiness config show [-f json]
//!   readiness config path
//!   readiness config init [-g] [--force]

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the effective (merged) configuration
pub fn show(ctx: &CommandContext, format: &str) -> Result<()> {
    println!("{}", ConfigLoader::render(&ctx.config, format == "json")?);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    let output = Output::new();
    match ConfigLoader::global_config_path() {
        Some(global) => output.field("global", describe(&global)),
        None => output.field("global", "(cannot determine config directory)"),
    }
    output.field("project", describe(&ConfigLoader::project_config_path()));
    output.field("env", "READINESS_<SECTION>__<KEY>");
    Ok(())
}

fn describe(path: &std::path::Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found)", path.display())
    }
}

/// Initialize global configuration
pub fn init_global(force: bool) -> Result<()> {
    let config_path = ConfigLoader::init_global(force)?;
    Output::new().success(&format!("Global configuration: {}", config_path.display()));
    Ok(())
}

/// Initialize project configuration
pub fn init_project(force: bool) -> Result<()> {
    let config_path = ConfigLoader::init_project(force)?;
    Output::new().success(&format!("Project configuration: {}", config_path.display()));
    Ok(())
}
