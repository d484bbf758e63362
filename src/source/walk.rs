//! Exclusion-aware tree walks.

use crate::types::{Source, SourceKind};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into.
pub const EXCLUDED_DIRS: [&str; 8] = [
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    "vendor",
];

/// One listed file and the source that supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedFile {
    /// Relative to the source root, `/`-separated.
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub source_kind: SourceKind,
    pub priority: u32,
}

fn is_excluded(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && EXCLUDED_DIRS.contains(&name.as_ref()))
}

/// Every file under `root`, relative to it, in sorted walk order.
pub fn walk_source(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect()
}

/// Walk every source in priority order; a relative path seen in an earlier
/// source shadows the same path in later ones.
pub fn list_all_files(sources: &[Source]) -> Vec<ListedFile> {
    let mut ordered: Vec<&Source> = sources.iter().collect();
    ordered.sort_by_key(|source| source.priority);

    let mut seen = HashSet::new();
    let mut listed = Vec::new();
    for source in ordered {
        for relative in walk_source(&source.root) {
            let key = crate::manifest::generator::relative_path(Path::new(""), &relative);
            if !seen.insert(key.clone()) {
                continue;
            }
            listed.push(ListedFile {
                absolute_path: source.root.join(&relative),
                relative_path: key,
                source_kind: source.kind,
                priority: source.priority,
            });
        }
    }
    listed
}
