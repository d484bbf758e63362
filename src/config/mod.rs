//! Catalog configuration.
//!
//! Layered with the `config` crate: built-in defaults, then the global file,
//! then the project file, then `BMAD_CATALOG__*` environment variables.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::error::CatalogError;
use crate::logging::LoggingConfig;
use crate::provider::RerankProviderConfig;
use crate::ranking::RankingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which sources take part in lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Remote sources only.
    Strict,
    /// Project root only.
    Local,
    /// User-global root only.
    User,
    /// Remote, then project, then user; each only with real content.
    #[default]
    Auto,
    /// The single highest-priority source `Auto` would find.
    First,
}

impl FromStr for DiscoveryMode {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(DiscoveryMode::Strict),
            "local" => Ok(DiscoveryMode::Local),
            "user" => Ok(DiscoveryMode::User),
            "auto" => Ok(DiscoveryMode::Auto),
            "first" => Ok(DiscoveryMode::First),
            other => Err(CatalogError::ConfigError(format!(
                "Invalid discovery mode: {}. Must be strict, local, user, auto, or first",
                other
            ))),
        }
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiscoveryMode::Strict => "strict",
            DiscoveryMode::Local => "local",
            DiscoveryMode::User => "user",
            DiscoveryMode::Auto => "auto",
            DiscoveryMode::First => "first",
        };
        f.write_str(label)
    }
}

/// Source discovery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub mode: DiscoveryMode,

    /// Project root; the working directory when unset.
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// User-global root; `~/.bmad` when unset.
    #[serde(default)]
    pub user_root: Option<PathBuf>,

    /// Git URLs, highest precedence first. `url#subdir` points into the checkout.
    #[serde(default)]
    pub remotes: Vec<String>,
}

impl DiscoveryConfig {
    pub fn resolved_project_root(&self) -> Result<PathBuf, CatalogError> {
        match &self.project_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().map_err(|e| {
                CatalogError::ConfigError(format!("Failed to get current directory: {}", e))
            }),
        }
    }

    pub fn resolved_user_root(&self) -> Option<PathBuf> {
        self.user_root.clone().or_else(xdg::default_user_root)
    }
}

fn default_ttl_secs() -> u64 {
    300
}

/// Manifest cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Snapshot lifetime in seconds, in memory and on disk.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Cache base directory; the platform cache directory when unset.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

impl CacheConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs.min(i64::MAX as u64) as i64)
    }

    pub fn resolved_base_dir(&self) -> Result<PathBuf, CatalogError> {
        match &self.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => xdg::cache_home(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            base_dir: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    /// Optional natural-language reranker.
    #[serde(default)]
    pub rerank: Option<RerankProviderConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}
