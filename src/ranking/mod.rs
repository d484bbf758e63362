//! Ranking of candidate records by usage, author order and configured boosts,
//! with an optional natural-language rerank on top.

pub mod hybrid;
pub mod score;
pub mod usage;

pub use hybrid::{parse_rerank_reply, RerankCandidate, RerankContext, Reranker};
pub use score::Ranked;
pub use usage::{UsageRecord, UsageTracker};

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Weights of the usage-derived score terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    #[serde(default = "default_recency_weight")]
    pub recency: f64,
    #[serde(default = "default_frequency_weight")]
    pub frequency: f64,
    #[serde(default = "default_manifest_weight")]
    pub manifest: f64,
}

fn default_recency_weight() -> f64 {
    0.5
}

fn default_frequency_weight() -> f64 {
    0.3
}

fn default_manifest_weight() -> f64 {
    0.2
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            recency: default_recency_weight(),
            frequency: default_frequency_weight(),
            manifest: default_manifest_weight(),
        }
    }
}

fn default_half_life_secs() -> u64 {
    15 * 60
}

fn default_max_count() -> u64 {
    100
}

fn default_rerank_timeout_ms() -> u64 {
    2_000
}

/// Ranking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub weights: RankingWeights,

    /// Recency half-life in seconds.
    #[serde(default = "default_half_life_secs")]
    pub half_life_secs: u64,

    /// Use count at which the frequency term saturates.
    #[serde(default = "default_max_count")]
    pub max_count: u64,

    /// Cold-start boosts keyed by `module:name` or by module.
    #[serde(default)]
    pub boosts: HashMap<String, f64>,

    #[serde(default = "default_rerank_timeout_ms")]
    pub rerank_timeout_ms: u64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
            half_life_secs: default_half_life_secs(),
            max_count: default_max_count(),
            boosts: HashMap::new(),
            rerank_timeout_ms: default_rerank_timeout_ms(),
        }
    }
}

/// Scores candidates from the shared usage map; optionally delegates ordering
/// to a reranker.
pub struct RankingEngine {
    config: RankingConfig,
    clock: Arc<dyn Clock>,
    usage: UsageTracker,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RankingEngine {
    pub fn new(config: RankingConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            usage: UsageTracker::new(clock.clone()),
            config,
            clock,
            reranker: None,
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Record one access of `key` (and of its module).
    pub fn record_usage(&self, key: &crate::types::CompositeKey) {
        self.usage.record_usage(key);
    }
}
