//! Configuration file loading.
//!
//! Search order:
//! 1. `./toolsmith.toml` (project-local)
//! 2. `~/.config/toolsmith/config.toml` (XDG config)
//!
//! The first file found wins. With none, defaults are used.

use super::types::ToolsmithConfig;
use crate::error::ToolsmithError;
use std::path::{Path, PathBuf};

const LOCAL_CONFIG_NAME: &str = "toolsmith.toml";
const XDG_CONFIG_NAME: &str = "config.toml";
const APP_NAME: &str = "toolsmith";

/// Loads configuration from the first file on the search path.
///
/// # Errors
///
/// Returns a configuration error if a file exists but cannot be read,
/// parsed or validated.
pub fn load() -> Result<ToolsmithConfig, ToolsmithError> {
    for path in search_paths() {
        if path.is_file() {
            tracing::debug!(path = %path.display(), "Loading configuration");
            return from_path(&path);
        }
    }
    tracing::debug!("No configuration file found; using defaults");
    Ok(ToolsmithConfig::default())
}

/// Loads configuration from `path`.
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read, parsed or
/// validated.
pub fn from_path(path: &Path) -> Result<ToolsmithConfig, ToolsmithError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ToolsmithError::configuration(
            "config_file",
            format!("failed to read '{}': {e}", path.display()),
        )
    })?;
    from_str(&content)
}

/// Parses configuration from TOML text.
///
/// # Errors
///
/// Returns a configuration error for invalid TOML or invalid values.
pub fn from_str(toml_str: &str) -> Result<ToolsmithConfig, ToolsmithError> {
    let config: ToolsmithConfig = toml::from_str(toml_str)
        .map_err(|e| ToolsmithError::configuration("config", format!("invalid TOML: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// The paths [`load`] checks, in order.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_NAME)];
    if let Some(dir) = xdg_config_dir() {
        paths.push(dir.join(XDG_CONFIG_NAME));
    }
    paths
}

/// `~/.config/toolsmith` on most systems.
#[must_use]
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}
