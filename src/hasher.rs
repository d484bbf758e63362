//! Hash helpers for cache keys and file integrity entries.

use std::path::Path;

/// Length of the hex prefix used for cache directory names.
pub const CACHE_KEY_LEN: usize = 16;

/// Full hex blake3 digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Short, stable directory name for an arbitrary string key.
pub fn cache_key(text: &str) -> String {
    let mut digest = content_hash(text.as_bytes());
    digest.truncate(CACHE_KEY_LEN);
    digest
}

/// Cache key of a source root, computed over its canonical form when it exists.
pub fn root_key(root: &Path) -> String {
    let canonical = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    cache_key(&canonical.to_string_lossy())
}
