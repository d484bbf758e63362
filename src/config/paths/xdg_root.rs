//! XDG-style locations for config, cache, and the user-global content root.

use crate::error::CatalogError;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "bmad-catalog";

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, CatalogError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        CatalogError::ConfigError(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// Global config file: `$XDG_CONFIG_HOME/bmad-catalog/config.toml`
pub fn global_config_path() -> Result<PathBuf, CatalogError> {
    Ok(config_home()?.join(APP_DIR).join("config.toml"))
}

/// Project config file: `<project>/.bmad-catalog.toml`
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(format!(".{}.toml", APP_DIR))
}

/// Base directory for generated manifests and remote checkouts.
///
/// `$XDG_CACHE_HOME/bmad-catalog` when set, otherwise the platform cache dir.
pub fn cache_home() -> Result<PathBuf, CatalogError> {
    if let Ok(xdg_cache_home) = std::env::var("XDG_CACHE_HOME") {
        if !xdg_cache_home.is_empty() {
            return Ok(PathBuf::from(xdg_cache_home).join(APP_DIR));
        }
    }
    let project_dirs = directories::ProjectDirs::from("", "bmad", APP_DIR).ok_or_else(|| {
        CatalogError::ConfigError("Could not determine platform cache directory".to_string())
    })?;
    Ok(project_dirs.cache_dir().to_path_buf())
}

/// Default user-global content root: `~/.bmad`.
pub fn default_user_root() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".bmad"))
}
