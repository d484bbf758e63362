//! Source aggregation: which roots take part, in what order, and how single
//! records and files are located across them.

pub mod discovery;
pub mod git;
pub mod loader;
pub mod walk;

pub use discovery::{assemble, Candidates};
pub use git::{GitCliResolver, GitResolver};
pub use loader::LoadedContent;
pub use walk::{list_all_files, walk_source, ListedFile};

use crate::config::DiscoveryConfig;
use crate::error::CatalogError;
use crate::types::Source;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the memoized source list and the per-URL remote resolutions.
pub struct SourceAggregator {
    config: DiscoveryConfig,
    git: Arc<dyn GitResolver>,
    /// Successful remote resolutions only; failures retry on next access.
    remotes: Mutex<HashMap<String, PathBuf>>,
    /// Concurrent first callers wait here for one discovery run.
    sources: tokio::sync::Mutex<Option<Vec<Source>>>,
}

impl SourceAggregator {
    pub fn new(config: DiscoveryConfig, git: Arc<dyn GitResolver>) -> Self {
        Self {
            config,
            git,
            remotes: Mutex::new(HashMap::new()),
            sources: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// The ordered source list, computed once and memoized.
    ///
    /// A list missing an unreachable remote is returned but not memoized, so
    /// the next call tries that remote again.
    pub async fn sources(&self) -> Result<Vec<Source>, CatalogError> {
        let mut guard = self.sources.lock().await;
        if let Some(sources) = guard.as_ref() {
            return Ok(sources.clone());
        }

        let (remotes, complete) = if discovery::uses_remotes(self.config.mode) {
            self.resolve_remotes().await
        } else {
            (Vec::new(), true)
        };
        let candidates = Candidates {
            remotes,
            project: Some(self.config.resolved_project_root()?),
            user: self.config.resolved_user_root(),
        };
        let sources = assemble(self.config.mode, candidates);

        info!(
            mode = %self.config.mode,
            count = sources.len(),
            "Discovered sources"
        );
        for source in &sources {
            debug!(
                root = %source.root.display(),
                priority = source.priority,
                kind = %source.kind,
                "Source"
            );
        }

        if complete {
            *guard = Some(sources.clone());
        }
        Ok(sources)
    }

    /// Forget the memoized source list; remote checkouts stay resolved.
    pub async fn reset(&self) {
        *self.sources.lock().await = None;
    }

    /// Resolve configured remotes in order, skipping failures.
    async fn resolve_remotes(&self) -> (Vec<PathBuf>, bool) {
        let mut resolved = Vec::with_capacity(self.config.remotes.len());
        let mut complete = true;
        for url in &self.config.remotes {
            let cached = self.remotes.lock().get(url).cloned();
            if let Some(path) = cached {
                resolved.push(path);
                continue;
            }
            match self.git.resolve(url).await {
                Ok(path) => {
                    self.remotes.lock().insert(url.clone(), path.clone());
                    resolved.push(path);
                }
                Err(e) => {
                    warn!(url = %url, "Skipping unreachable remote source: {}", e);
                    complete = false;
                }
            }
        }
        (resolved, complete)
    }

    /// Every file across in-scope sources, shadowed by priority.
    pub async fn list_all_files(&self) -> Result<Vec<ListedFile>, CatalogError> {
        let sources = self.sources().await?;
        tokio::task::spawn_blocking(move || list_all_files(&sources))
            .await
            .map_err(|e| {
                CatalogError::StorageError(crate::error::StorageError::InvalidPath(format!(
                    "file walk failed: {}",
                    e
                )))
            })
    }
}
