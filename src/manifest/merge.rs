//! Cross-source merge.

use crate::manifest::records::{Keyed, Sourced};
use crate::types::{CompositeKey, Source};
use std::collections::HashMap;

/// Tag every record with the source it came from.
pub fn tag<T>(records: impl IntoIterator<Item = T>, source: &Source) -> Vec<Sourced<T>> {
    records
        .into_iter()
        .map(|record| Sourced {
            record,
            priority: source.priority,
            source_kind: source.kind,
            source_root: source.root.clone(),
        })
        .collect()
}

/// Keep one record per composite key: the one with the lowest priority number.
///
/// Output keeps the position where each key was first seen, so records
/// accumulated in source order stay in author-declared order.
pub fn merge_by_priority<T: Keyed>(records: Vec<Sourced<T>>) -> Vec<Sourced<T>> {
    let mut slots: Vec<Option<Sourced<T>>> = Vec::with_capacity(records.len());
    let mut index: HashMap<CompositeKey, usize> = HashMap::new();

    for record in records {
        let key = record.key();
        match index.get(&key) {
            Some(&slot) => {
                let replace = slots[slot]
                    .as_ref()
                    .map(|kept| record.priority < kept.priority)
                    .unwrap_or(true);
                if replace {
                    slots[slot] = Some(record);
                }
            }
            None => {
                index.insert(key, slots.len());
                slots.push(Some(record));
            }
        }
    }

    slots.into_iter().flatten().collect()
}
