//! Error types for the catalog.
//!
//! `StorageError` covers the on-disk cache tree; `CatalogError` is what callers
//! of the catalog see. An ambiguous match is not an error and never appears here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing the manifest cache tree.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Manifest table error: {0}")]
    Csv(String),
}

impl From<csv::Error> for StorageError {
    fn from(err: csv::Error) -> Self {
        StorageError::Csv(err.to_string())
    }
}

/// Kind of record a lookup was asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Agent,
    Workflow,
    Tool,
    Task,
    File,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RecordKind::Agent => "agent",
            RecordKind::Workflow => "workflow",
            RecordKind::Tool => "tool",
            RecordKind::Task => "task",
            RecordKind::File => "file",
        };
        f.write_str(label)
    }
}

/// Caller-facing error taxonomy.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{kind} not found: {name}{}", format_suggestions(.suggestions))]
    NotFound {
        kind: RecordKind,
        name: String,
        suggestions: Vec<String>,
    },

    #[error("Workflow '{workflow}' is not standalone and no agent menu references it")]
    NoOwningAgent { workflow: String },

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Path escapes source root: {0}")]
    PathTraversal(String),

    #[error("Manifest generation failed for {root}: {message}")]
    GenerationFailed { root: PathBuf, message: String },

    #[error("Failed to parse {path}: {message}")]
    ParseFailure { path: PathBuf, message: String },

    #[error("Remote source unreachable {url}: {message}")]
    SourceUnreachable { url: String, message: String },

    #[error("Rerank failed: {0}")]
    RerankFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl CatalogError {
    pub fn not_found(kind: RecordKind, name: impl Into<String>) -> Self {
        CatalogError::NotFound {
            kind,
            name: name.into(),
            suggestions: Vec::new(),
        }
    }

    /// True when no source produced a candidate.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::StorageError(StorageError::IoError(err))
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}
