//! Name validation, aliases and "did you mean" suggestions.

use crate::error::{CatalogError, RecordKind};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 50;
pub const MAX_SUGGESTIONS: usize = 3;

/// Similarity (0..1) a name must reach to be suggested without a fuzzy hit.
const SIMILARITY_THRESHOLD: f64 = 0.7;

const SHELL_METACHARACTERS: [char; 11] = [';', '&', '|', '$', '`', '<', '>', '(', ')', '\n', '\r'];

static AGENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+(-[a-z]+)*$").expect("agent name pattern"));

static RECORD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("record name pattern"));

/// Short names accepted in place of the full agent name.
const AGENT_ALIASES: [(&str, &str); 1] = [("master", "bmad-master")];

pub fn resolve_agent_alias(name: &str) -> &str {
    AGENT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, target)| *target)
        .unwrap_or(name)
}

fn invalid(name: &str, reason: impl Into<String>) -> CatalogError {
    CatalogError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Check a user-supplied name; returns it trimmed, with a leading `*` removed.
pub fn validate_name(kind: RecordKind, raw: &str) -> Result<String, CatalogError> {
    let name = raw.trim().trim_start_matches('*');
    if !name.is_ascii() {
        return Err(invalid(name, "must be ASCII"));
    }
    if let Some(c) = name.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
        return Err(invalid(name, format!("contains forbidden character {:?}", c)));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(invalid(name, "must not contain path separators"));
    }
    if name.len() < MIN_NAME_LEN {
        return Err(invalid(
            name,
            format!("must be at least {} characters", MIN_NAME_LEN),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid(
            name,
            format!("must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    let (pattern, expected) = match kind {
        RecordKind::Agent => (&*AGENT_NAME, "lowercase letters separated by single hyphens"),
        _ => (
            &*RECORD_NAME,
            "lowercase letters and digits separated by single hyphens",
        ),
    };
    if !pattern.is_match(name) {
        return Err(invalid(name, format!("must be {}", expected)));
    }
    Ok(name.to_string())
}

/// A module qualifier follows the record-name rules.
pub fn validate_module(raw: &str) -> Result<String, CatalogError> {
    validate_name(RecordKind::Task, raw)
}

/// Up to three names close to `name`: a case-insensitive match alone when
/// there is one, otherwise the closest fuzzy matches.
pub fn suggest<'a>(name: &str, known: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut known: Vec<&str> = known.into_iter().collect();
    known.sort_unstable();
    known.dedup();

    if let Some(exact) = known.iter().find(|k| k.eq_ignore_ascii_case(name)) {
        return vec![exact.to_string()];
    }

    let matcher = SkimMatcherV2::default();
    let needle = name.to_ascii_lowercase();
    let mut scored: Vec<(f64, i64, &str)> = known
        .into_iter()
        .filter_map(|candidate| {
            let lowered = candidate.to_ascii_lowercase();
            let ratio = strsim::normalized_levenshtein(&needle, &lowered);
            let fuzzy = matcher.fuzzy_match(&lowered, &needle);
            (ratio >= SIMILARITY_THRESHOLD || fuzzy.is_some())
                .then_some((ratio, fuzzy.unwrap_or(0), candidate))
        })
        .collect();
    scored.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.2.cmp(b.2))
    });
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, _, candidate)| candidate.to_string())
        .collect()
}
