//! Process-lifetime usage tracking.

use crate::clock::Clock;
use crate::types::CompositeKey;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Accesses of one composite key, or of a whole module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub key: String,
    pub first_access: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    pub count: u64,
}

/// Usage map keyed by `module:name` and by module.
pub struct UsageTracker {
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<String, UsageRecord>>,
}

impl UsageTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Record one access of `key` and of its module.
    pub fn record_usage(&self, key: &CompositeKey) {
        let now = self.clock.now();
        let mut records = self.records.lock();
        for id in [key.to_string(), key.module_key()] {
            records
                .entry(id.clone())
                .and_modify(|record| {
                    record.last_access = now;
                    record.count = record.count.saturating_add(1);
                })
                .or_insert(UsageRecord {
                    key: id,
                    first_access: now,
                    last_access: now,
                    count: 1,
                });
        }
    }

    pub fn get(&self, key: &CompositeKey) -> Option<UsageRecord> {
        self.records.lock().get(&key.to_string()).cloned()
    }

    /// Aggregate record of every key used in `module`.
    pub fn get_module(&self, module: &str) -> Option<UsageRecord> {
        self.records.lock().get(module).cloned()
    }

    /// Most recently used composite keys, newest first.
    pub fn recent(&self, limit: usize) -> Vec<UsageRecord> {
        let mut records: Vec<UsageRecord> = self
            .records
            .lock()
            .values()
            .filter(|record| record.key.contains(':'))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.last_access
                .cmp(&a.last_access)
                .then_with(|| a.key.cmp(&b.key))
        });
        records.truncate(limit);
        records
    }
}
