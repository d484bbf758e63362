//! Directory classification: is a path a multi-module root or a single module?
//!
//! Every read failure counts as "no evidence"; nothing here returns an error.

use crate::types::PathResolution;
use std::path::{Path, PathBuf};

/// Directory that unwraps a checkout nesting its content one level deep.
pub const NESTED_ROOT_DIR: &str = "bmad";

/// Directory names that make up a module (or a flat root).
pub const CONTENT_DIRS: [&str; 4] = ["agents", "workflows", "tools", "tasks"];

/// Directory holding pre-built manifest tables inside a root.
pub const PREBUILT_MANIFEST_DIR: &str = "_cfg";

/// Classify `path` into a root and an optional selected module.
pub fn resolve_bmad_path(path: &Path) -> PathResolution {
    let nested = path.join(NESTED_ROOT_DIR);
    if nested.is_dir() {
        return resolve_bmad_path(&nested);
    }

    if has_child_dir(path, "agents") {
        if let Some(parent) = path.parent() {
            let sibling_is_module = subdirectories(parent)
                .into_iter()
                .filter(|sibling| sibling.as_path() != path)
                .any(|sibling| has_child_dir(&sibling, "agents"));
            if sibling_is_module {
                let module = path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string());
                return PathResolution {
                    bmad_root: parent.to_path_buf(),
                    module,
                };
            }
        }
        return PathResolution {
            bmad_root: path.to_path_buf(),
            module: None,
        };
    }

    // Modules implied by subdirectories; none selected. Same shape as the
    // bare-root fallback.
    PathResolution {
        bmad_root: path.to_path_buf(),
        module: None,
    }
}

/// True when `path` contains agent/workflow/tool/task directories of its own.
pub fn is_flat_root(path: &Path) -> bool {
    CONTENT_DIRS.iter().any(|dir| has_child_dir(path, dir))
}

/// Module subdirectories of a root, sorted by name.
///
/// A module is any non-hidden subdirectory holding at least one content
/// directory. The content directories of a flat root are not modules.
pub fn module_dirs(root: &Path) -> Vec<(String, PathBuf)> {
    let mut modules: Vec<(String, PathBuf)> = subdirectories(root)
        .into_iter()
        .filter_map(|dir| {
            let name = dir.file_name()?.to_string_lossy().to_string();
            if name.starts_with('.')
                || name == PREBUILT_MANIFEST_DIR
                || CONTENT_DIRS.contains(&name.as_str())
            {
                return None;
            }
            is_flat_root(&dir).then_some((name, dir))
        })
        .collect();
    modules.sort_by(|a, b| a.0.cmp(&b.0));
    modules
}

/// True when the root shows real content: a content directory or a module.
pub fn has_content(root: &Path) -> bool {
    has_child_dir(root, "agents")
        || has_child_dir(root, "workflows")
        || !module_dirs(root).is_empty()
}

fn has_child_dir(path: &Path, name: &str) -> bool {
    path.join(name).is_dir()
}

fn subdirectories(path: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_dir())
        .collect()
}
