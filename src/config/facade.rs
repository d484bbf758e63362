//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::CatalogConfig;
use crate::error::CatalogError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from files and environment.
    pub fn load(project_root: &Path) -> Result<CatalogConfig, CatalogError> {
        MergeService::load(project_root).map_err(|e| CatalogError::ConfigError(e.to_string()))
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<CatalogConfig, CatalogError> {
        MergeService::load_from_file(path).map_err(|e| CatalogError::ConfigError(e.to_string()))
    }

    /// Create default configuration.
    pub fn default() -> CatalogConfig {
        CatalogConfig::default()
    }
}
