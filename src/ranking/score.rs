//! Deterministic scoring.
//!
//! `score = w_r * recency + w_f * frequency + w_m * manifestPriority + boost`
//!
//! - recency: `e^(-Δt / halfLife)` since the last access, 0 without usage
//! - frequency: `min(1, log2(count + 1) / log2(maxCount + 1))`, 0 without usage
//! - manifestPriority: `1 - index / (total - 1)`, 1 for a single item
//! - boost: configured constant, exact key before module, only without usage

use super::RankingEngine;
use crate::types::CompositeKey;
use serde::Serialize;

/// An item with the key and score it was ranked by.
#[derive(Debug, Clone, Serialize)]
pub struct Ranked<T> {
    pub item: T,
    pub key: CompositeKey,
    pub score: f64,
}

impl RankingEngine {
    pub fn calculate_score(
        &self,
        key: &CompositeKey,
        manifest_index: usize,
        total_items: usize,
    ) -> f64 {
        let weights = self.config.weights;
        let manifest = if total_items > 1 {
            1.0 - (manifest_index.min(total_items - 1) as f64) / ((total_items - 1) as f64)
        } else {
            1.0
        };

        match self.usage.get(key) {
            Some(record) => {
                let elapsed = (self.clock.now() - record.last_access)
                    .to_std()
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);
                let half_life = self.config.half_life_secs.max(1) as f64;
                let recency = (-elapsed / half_life).exp();

                let frequency = if self.config.max_count == 0 {
                    1.0
                } else {
                    ((record.count as f64 + 1.0).log2()
                        / (self.config.max_count as f64 + 1.0).log2())
                    .min(1.0)
                };

                weights.recency * recency
                    + weights.frequency * frequency
                    + weights.manifest * manifest
            }
            None => weights.manifest * manifest + self.boost_for(key),
        }
    }

    fn boost_for(&self, key: &CompositeKey) -> f64 {
        let boosts = &self.config.boosts;
        boosts
            .get(&key.to_string())
            .or_else(|| boosts.get(&key.module_key()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Score each item at its input index and sort descending.
    ///
    /// The sort is stable: tied items keep their input order.
    pub fn rank_by_usage<T, F>(&self, items: Vec<T>, key_fn: F) -> Vec<Ranked<T>>
    where
        F: Fn(&T) -> CompositeKey,
    {
        let total = items.len();
        let mut ranked: Vec<Ranked<T>> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let key = key_fn(&item);
                let score = self.calculate_score(&key, index, total);
                Ranked { item, key, score }
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}
