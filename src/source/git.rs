//! Remote sources: git URLs resolved to local checkouts.

use crate::error::CatalogError;
use crate::hasher::cache_key;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Resolves a remote URL to a local directory. Must be idempotent per URL.
#[async_trait]
pub trait GitResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<PathBuf, CatalogError>;
}

/// Split `url#subdir` into the clone URL and an optional subdirectory.
pub fn split_remote(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('#') {
        Some((url, subdir)) if !subdir.trim().is_empty() => (url, Some(subdir.trim())),
        Some((url, _)) => (url, None),
        None => (spec, None),
    }
}

/// Shallow-clones with the `git` binary into `<clone_base>/<hash(url)>`.
#[derive(Debug, Clone)]
pub struct GitCliResolver {
    clone_base: PathBuf,
}

impl GitCliResolver {
    pub fn new(clone_base: impl Into<PathBuf>) -> Self {
        Self {
            clone_base: clone_base.into(),
        }
    }

    pub fn checkout_dir(&self, url: &str) -> PathBuf {
        self.clone_base.join(cache_key(url))
    }
}

fn unreachable(url: &str, message: impl Into<String>) -> CatalogError {
    CatalogError::SourceUnreachable {
        url: url.to_string(),
        message: message.into(),
    }
}

/// `git clone --depth 1 -- <url> <dest>`; the URL can never be read as an option.
fn clone_command(url: &str, dest: &Path) -> Command {
    let mut command = Command::new("git");
    command
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg("--")
        .arg(url)
        .arg(dest);
    command
}

fn checked_subdir(url: &str, subdir: &str) -> Result<PathBuf, CatalogError> {
    let path = Path::new(subdir);
    let safe = path
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if !safe {
        return Err(CatalogError::PathTraversal(format!("{}#{}", url, subdir)));
    }
    Ok(path.to_path_buf())
}

#[async_trait]
impl GitResolver for GitCliResolver {
    async fn resolve(&self, spec: &str) -> Result<PathBuf, CatalogError> {
        let (url, subdir) = split_remote(spec);
        let subdir = subdir.map(|s| checked_subdir(url, s)).transpose()?;
        let checkout = self.checkout_dir(url);

        if checkout.join(".git").is_dir() {
            debug!(url, path = %checkout.display(), "Reusing existing checkout");
        } else {
            tokio::fs::create_dir_all(&self.clone_base)
                .await
                .map_err(|e| unreachable(url, format!("cannot create clone directory: {}", e)))?;
            info!(url, path = %checkout.display(), "Cloning remote source");
            let output = clone_command(url, &checkout)
                .output()
                .await
                .map_err(|e| unreachable(url, format!("failed to run git: {}", e)))?;
            if !output.status.success() {
                // Never leave a partial checkout behind.
                let _ = tokio::fs::remove_dir_all(&checkout).await;
                return Err(unreachable(
                    url,
                    String::from_utf8_lossy(&output.stderr).trim().to_string(),
                ));
            }
        }

        let resolved = match subdir {
            Some(subdir) => checkout.join(subdir),
            None => checkout,
        };
        if !resolved.is_dir() {
            return Err(unreachable(
                url,
                format!("{} is not a directory", resolved.display()),
            ));
        }
        Ok(resolved)
    }
}
