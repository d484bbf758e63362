//! Locate and read single records across sources, first existing candidate wins.

use super::SourceAggregator;
use crate::error::{CatalogError, RecordKind};
use crate::paths::module_dirs;
use crate::types::{Source, SourceKind, DEFAULT_MODULE};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// File name of the companion instructions next to a workflow definition.
pub const INSTRUCTIONS_FILE: &str = "instructions.md";

/// Content read from the winning candidate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedContent {
    pub path: PathBuf,
    pub source_kind: SourceKind,
    pub module: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// One place a record might live.
#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    module: String,
    kind: SourceKind,
}

/// Candidate paths for `relative` inside a content directory, over the flat
/// layout first and then every module directory.
fn candidates(
    source: &Source,
    content_dir: &str,
    relatives: &[PathBuf],
    module: Option<&str>,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    let wants = |name: &str| module.map(|m| m == name).unwrap_or(true);

    if wants(DEFAULT_MODULE) {
        for relative in relatives {
            out.push(Candidate {
                path: source.root.join(content_dir).join(relative),
                module: DEFAULT_MODULE.to_string(),
                kind: source.kind,
            });
        }
    }
    for (name, dir) in module_dirs(&source.root) {
        if !wants(&name) {
            continue;
        }
        for relative in relatives {
            out.push(Candidate {
                path: dir.join(content_dir).join(relative),
                module: name.clone(),
                kind: source.kind,
            });
        }
    }
    out
}

async fn first_existing(candidates: Vec<Candidate>) -> Option<Candidate> {
    for candidate in candidates {
        let exists = tokio::fs::metadata(&candidate.path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        debug!(path = %candidate.path.display(), exists, "Probing candidate");
        if exists {
            return Some(candidate);
        }
    }
    None
}

async fn read(path: &Path) -> Result<String, CatalogError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CatalogError::ParseFailure {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Reject absolute paths and any `..` component.
pub fn check_relative(relative: &str) -> Result<PathBuf, CatalogError> {
    let path = Path::new(relative);
    let safe = !relative.trim().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(path.to_path_buf())
    } else {
        Err(CatalogError::PathTraversal(relative.to_string()))
    }
}

impl SourceAggregator {
    /// Load `agents/<name>.md` from the first source that has it.
    pub async fn load_agent(
        &self,
        name: &str,
        module: Option<&str>,
    ) -> Result<LoadedContent, CatalogError> {
        let file = PathBuf::from(format!("{}.md", name));
        let sources = self.sources().await?;
        let all: Vec<Candidate> = sources
            .iter()
            .flat_map(|source| candidates(source, "agents", std::slice::from_ref(&file), module))
            .collect();

        let found = first_existing(all)
            .await
            .ok_or_else(|| CatalogError::not_found(RecordKind::Agent, name))?;
        Ok(LoadedContent {
            content: read(&found.path).await?,
            path: found.path,
            source_kind: found.kind,
            module: found.module,
            instructions: None,
        })
    }

    /// Load `workflows/<name>/workflow.{yaml,md}` plus its instructions file.
    pub async fn load_workflow(
        &self,
        name: &str,
        module: Option<&str>,
    ) -> Result<LoadedContent, CatalogError> {
        let files = [
            Path::new(name).join("workflow.yaml"),
            Path::new(name).join("workflow.md"),
        ];
        let sources = self.sources().await?;
        let all: Vec<Candidate> = sources
            .iter()
            .flat_map(|source| candidates(source, "workflows", &files, module))
            .collect();

        let found = first_existing(all)
            .await
            .ok_or_else(|| CatalogError::not_found(RecordKind::Workflow, name))?;
        let instructions = match found.path.parent() {
            Some(dir) => tokio::fs::read_to_string(dir.join(INSTRUCTIONS_FILE)).await.ok(),
            None => None,
        };
        Ok(LoadedContent {
            content: read(&found.path).await?,
            path: found.path,
            source_kind: found.kind,
            module: found.module,
            instructions,
        })
    }

    /// Load a file by path relative to a source root.
    pub async fn load_file(&self, relative: &str) -> Result<LoadedContent, CatalogError> {
        let relative_path = check_relative(relative)?;
        let sources = self.sources().await?;
        let all: Vec<Candidate> = sources
            .iter()
            .map(|source| Candidate {
                path: source.root.join(&relative_path),
                module: relative_path
                    .components()
                    .next()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .filter(|first| module_dirs(&source.root).iter().any(|(m, _)| m == first))
                    .unwrap_or_else(|| DEFAULT_MODULE.to_string()),
                kind: source.kind,
            })
            .collect();

        let found = first_existing(all)
            .await
            .ok_or_else(|| CatalogError::not_found(RecordKind::File, relative))?;
        Ok(LoadedContent {
            content: read(&found.path).await?,
            path: found.path,
            source_kind: found.kind,
            module: found.module,
            instructions: None,
        })
    }
}
