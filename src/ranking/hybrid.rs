//! Best-effort natural-language rerank.
//!
//! Used only when a reranker is available, there are at least three
//! candidates and a query is present. Anything going wrong on this path falls
//! back to the deterministic score.

use super::score::Ranked;
use super::usage::UsageRecord;
use super::RankingEngine;
use crate::error::CatalogError;
use crate::types::CompositeKey;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, warn};

/// Fewer candidates than this are never reranked.
pub const MIN_RERANK_CANDIDATES: usize = 3;

const MAX_DESCRIPTION_CHARS: usize = 120;
const MAX_RECENT_USAGE: usize = 5;

/// Capability that orders candidate keys for a free-text query.
#[async_trait]
pub trait Reranker: Send + Sync {
    fn available(&self) -> bool;

    /// Raw reply listing candidate keys, best first.
    async fn rerank(&self, context: &RerankContext) -> Result<String, CatalogError>;
}

#[derive(Debug, Clone)]
pub struct RerankCandidate {
    pub key: CompositeKey,
    pub description: String,
}

/// Everything a reranker gets to see.
#[derive(Debug, Clone)]
pub struct RerankContext {
    pub query: String,
    pub candidates: Vec<RerankCandidate>,
    pub recent: Vec<UsageRecord>,
}

fn truncate(text: &str, max: usize) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= max {
        return text;
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

impl RerankContext {
    /// Prompt text sent to a language model.
    pub fn prompt(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str("Order these candidates by how well they match the request.\n");
        prompt.push_str(&format!("Request: {}\n\nCandidates:\n", truncate(&self.query, 500)));
        for candidate in &self.candidates {
            prompt.push_str(&format!(
                "- {}: {}\n",
                candidate.key,
                truncate(&candidate.description, MAX_DESCRIPTION_CHARS)
            ));
        }
        if !self.recent.is_empty() {
            prompt.push_str("\nRecently used:\n");
            for record in self.recent.iter().take(MAX_RECENT_USAGE) {
                prompt.push_str(&format!("- {} ({} uses)\n", record.key, record.count));
            }
        }
        prompt.push_str(
            "\nReply with the candidate keys only, best first, separated by commas.",
        );
        prompt
    }
}

/// Turn a reply into a total ordering of exactly `keys`.
///
/// Unknown tokens are dropped, repeats keep their first position and keys the
/// reply left out are appended in input order.
pub fn parse_rerank_reply(reply: &str, keys: &[CompositeKey]) -> Vec<CompositeKey> {
    parse_with_hits(reply, keys).0
}

fn parse_with_hits(reply: &str, keys: &[CompositeKey]) -> (Vec<CompositeKey>, usize) {
    let lookup: HashMap<String, &CompositeKey> = keys
        .iter()
        .map(|key| (key.to_string().to_ascii_lowercase(), key))
        .collect();

    let mut seen: HashSet<&CompositeKey> = HashSet::new();
    let mut ordered: Vec<CompositeKey> = Vec::with_capacity(keys.len());
    for token in reply.split(|c: char| matches!(c, ',' | '\n' | ';' | '|' | '>')) {
        let token = token
            .trim()
            .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '*'))
            .trim()
            .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '[' | ']'))
            .to_ascii_lowercase();
        if let Some(key) = lookup.get(&token) {
            if seen.insert(*key) {
                ordered.push((*key).clone());
            }
        }
    }
    let hits = ordered.len();
    for key in keys {
        if seen.insert(key) {
            ordered.push(key.clone());
        }
    }
    (ordered, hits)
}

impl RankingEngine {
    /// Rank with the reranker when it applies, otherwise by usage score.
    pub async fn rank_hybrid<T, K, D>(
        &self,
        items: Vec<T>,
        query: Option<&str>,
        key_fn: K,
        describe: D,
    ) -> Vec<Ranked<T>>
    where
        K: Fn(&T) -> CompositeKey,
        D: Fn(&T) -> String,
    {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let reranker = self.reranker.as_ref().filter(|r| r.available());
        let (Some(query), Some(reranker)) = (query, reranker) else {
            return self.rank_by_usage(items, key_fn);
        };
        if items.len() < MIN_RERANK_CANDIDATES {
            return self.rank_by_usage(items, key_fn);
        }

        let context = RerankContext {
            query: query.to_string(),
            candidates: items
                .iter()
                .map(|item| RerankCandidate {
                    key: key_fn(item),
                    description: describe(item),
                })
                .collect(),
            recent: self.usage.recent(MAX_RECENT_USAGE),
        };
        let timeout = Duration::from_millis(self.config.rerank_timeout_ms);
        let reply = match tokio::time::timeout(timeout, reranker.rerank(&context)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Rerank failed, using usage ranking: {}", e);
                return self.rank_by_usage(items, key_fn);
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.rerank_timeout_ms,
                    "Rerank timed out, using usage ranking"
                );
                return self.rank_by_usage(items, key_fn);
            }
        };

        let keys: Vec<CompositeKey> = context.candidates.iter().map(|c| c.key.clone()).collect();
        let (order, hits) = parse_with_hits(&reply, &keys);
        if hits == 0 {
            warn!("Rerank reply named no known candidate, using usage ranking");
            return self.rank_by_usage(items, key_fn);
        }
        debug!(hits, total = keys.len(), "Applied rerank order");

        // Deterministic scores still travel with the items for display.
        let mut scored: Vec<Option<Ranked<T>>> = self
            .rank_by_usage(items, key_fn)
            .into_iter()
            .map(Some)
            .collect();
        let mut result = Vec::with_capacity(scored.len());
        for key in &order {
            for slot in scored.iter_mut() {
                if slot.as_ref().map(|r| &r.key == key).unwrap_or(false) {
                    if let Some(ranked) = slot.take() {
                        result.push(ranked);
                    }
                }
            }
        }
        result
    }
}
