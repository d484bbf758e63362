//! Core types shared across the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Module name used when a record carries none.
pub const DEFAULT_MODULE: &str = "core";

/// Identity of a record: `module:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeKey {
    pub module: String,
    pub name: String,
}

impl CompositeKey {
    /// Build a key, falling back to the default module for blank input.
    pub fn new(module: Option<&str>, name: &str) -> Self {
        let module = module
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODULE);
        Self {
            module: module.to_string(),
            name: name.trim().to_string(),
        }
    }

    /// Parse `module:name`; a bare `name` lands in the default module.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((module, name)) => Self::new(Some(module), name),
            None => Self::new(None, raw),
        }
    }

    /// Key of the aggregate usage record kept per module.
    pub fn module_key(&self) -> String {
        self.module.clone()
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.name)
    }
}

/// Where a source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Project,
    User,
    Remote,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceKind::Project => "project",
            SourceKind::User => "user",
            SourceKind::Remote => "remote",
        };
        f.write_str(label)
    }
}

/// One origin root with its precedence. Lower priority wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub root: PathBuf,
    pub priority: u32,
    pub kind: SourceKind,
}

/// Structural classification of a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathResolution {
    #[serde(rename = "bmadRoot")]
    pub bmad_root: PathBuf,
    pub module: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_defaults_module() {
        let key = CompositeKey::new(None, "analyst");
        assert_eq!(key.to_string(), "core:analyst");

        let key = CompositeKey::new(Some("  "), "analyst");
        assert_eq!(key.module, DEFAULT_MODULE);
    }

    #[test]
    fn composite_key_parses_qualified_and_bare() {
        let key = CompositeKey::parse("bmm:analyst");
        assert_eq!(key.module, "bmm");
        assert_eq!(key.name, "analyst");

        let key = CompositeKey::parse("debug");
        assert_eq!(key.to_string(), "core:debug");
        assert_eq!(CompositeKey::parse("bmm:pm").module_key(), "bmm");
    }
}
