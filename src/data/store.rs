// ============================================================
// Layer 4 — Sequence Store
// ============================================================
// Turns raw per-user logs into column-aligned record sequences:
//
//   "u1": [1, 2, 3]      ──►   u1: items  [1,      2,      3     ]
//   meta[1] = {Lego, ..}           titles ["Lego", "Ball", ""    ]
//   meta[2] = {Ball, ..}           ...
//   meta[3] missing                (3 gets empty metadata)
//
// The store is built once and is read-only afterwards. Users
// keep the order in which they appear in the log, and items
// keep their chronological order inside each user.
//
// Alongside the store we compute ItemPopularity: how often
// each item occurs, relative to all occurrences. It feeds the
// long-tail metrics at evaluation time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::raw::DataMaps;
use crate::domain::record::{ItemMetadata, RecordSeq};

/// How user and item keys are written into the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Prefix users with `user_` and items with `item_`
    pub add_prefix:            bool,
    /// Keep internal index strings instead of external ids
    pub integer_ids:           bool,
    /// Shift numeric item keys by 1000
    pub items_start_from_1001: bool,
}

impl StoreOptions {
    fn user_key(&self, user_idx: &str, maps: &DataMaps) -> String {
        let key = if self.integer_ids {
            user_idx.to_string()
        } else {
            maps.user_idx2id.get(user_idx).cloned().unwrap_or_else(|| user_idx.to_string())
        };
        if self.add_prefix { format!("user_{key}") } else { key }
    }

    fn item_key(&self, item_idx: &str, maps: &DataMaps) -> String {
        let mut key = if self.integer_ids {
            item_idx.to_string()
        } else {
            maps.item_idx2id.get(item_idx).cloned().unwrap_or_else(|| item_idx.to_string())
        };
        if self.items_start_from_1001 {
            if let Ok(n) = key.parse::<u64>() {
                key = (n + 1000).to_string();
            }
        }
        if self.add_prefix { format!("item_{key}") } else { key }
    }
}

/// One user's full, chronologically ordered history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSequence {
    pub user_id: String,
    pub records: RecordSeq,
}

/// Every user's history, in log order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStore {
    users: Vec<UserSequence>,
}

/// Occurrence counts of each item, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPopularity {
    counts: Vec<(String, usize)>,
    index:  HashMap<String, usize>,
    total:  usize,
}

impl ItemPopularity {
    fn record(&mut self, item: &str) {
        match self.index.get(item) {
            Some(&pos) => self.counts[pos].1 += 1,
            None => {
                self.index.insert(item.to_string(), self.counts.len());
                self.counts.push((item.to_string(), 1));
            }
        }
        self.total += 1;
    }

    pub fn count(&self, item: &str) -> usize {
        self.index.get(item).map(|&pos| self.counts[pos].1).unwrap_or(0)
    }

    /// `count(item) / total occurrences`, 0.0 for unknown items.
    pub fn relative_frequency(&self, item: &str) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(item) as f64 / self.total as f64
    }

    /// Relative frequencies of all items, first-appearance order.
    pub fn relative_frequencies(&self) -> Vec<f64> {
        self.counts
            .iter()
            .map(|(_, c)| *c as f64 / self.total.max(1) as f64)
            .collect()
    }

    pub fn counts(&self) -> &[(String, usize)] {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

impl SequenceStore {
    /// Build the store from raw logs.
    ///
    /// Items without metadata get empty fields. Users whose log is
    /// empty are not added. A user appearing twice keeps the later
    /// log, at the position of its first appearance.
    pub fn build(
        user_items: &[(String, Vec<String>)],
        metadata:   &HashMap<String, ItemMetadata>,
        maps:       &DataMaps,
        options:    &StoreOptions,
    ) -> (SequenceStore, ItemPopularity) {
        let mut users: Vec<UserSequence> = Vec::with_capacity(user_items.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut missing_meta = 0usize;

        for (user_idx, items) in user_items {
            if items.is_empty() {
                tracing::debug!("User '{}' has no interactions, skipping", user_idx);
                continue;
            }

            let mut records = RecordSeq::new();
            for item_idx in items {
                let meta = match metadata.get(item_idx) {
                    Some(m) => m.clone(),
                    None => {
                        missing_meta += 1;
                        ItemMetadata::default()
                    }
                };
                records.push(options.item_key(item_idx, maps), meta);
            }

            let sequence = UserSequence { user_id: options.user_key(user_idx, maps), records };
            match positions.get(&sequence.user_id) {
                Some(&pos) => users[pos] = sequence,
                None => {
                    positions.insert(sequence.user_id.clone(), users.len());
                    users.push(sequence);
                }
            }
        }

        if missing_meta > 0 {
            tracing::warn!("{} interactions reference items without metadata", missing_meta);
        }

        let store = SequenceStore { users };
        let popularity = store.popularity();
        tracing::info!(
            "Sequence store: {} users, {} interactions, {} distinct items",
            store.len(),
            store.num_interactions(),
            popularity.counts().len()
        );

        (store, popularity)
    }

    /// Build directly from ready-made sequences (tests, snapshots).
    pub fn from_sequences(users: Vec<UserSequence>) -> Self {
        Self { users: users.into_iter().filter(|u| !u.records.is_empty()).collect() }
    }

    /// Item occurrence counts over the whole store.
    pub fn popularity(&self) -> ItemPopularity {
        let mut popularity = ItemPopularity::default();
        for user in &self.users {
            for item in &user.records.items {
                popularity.record(item);
            }
        }
        popularity
    }

    pub fn users(&self) -> &[UserSequence] {
        &self.users
    }

    pub fn get(&self, user_id: &str) -> Option<&UserSequence> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn num_interactions(&self) -> usize {
        self.users.iter().map(|u| u.records.len()).sum()
    }

    /// Unique user keys, store order.
    pub fn all_users(&self) -> Vec<String> {
        self.users.iter().map(|u| u.user_id.clone()).collect()
    }

    /// Unique item keys, first-appearance order.
    pub fn all_items(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.users
            .iter()
            .flat_map(|u| u.records.items.iter())
            .filter(|item| seen.insert(item.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> (Vec<(String, Vec<String>)>, HashMap<String, ItemMetadata>, DataMaps) {
        let logs = vec![
            ("1".to_string(), vec!["1".to_string(), "2".to_string(), "3".to_string()]),
            ("2".to_string(), vec![]),
            ("3".to_string(), vec!["2".to_string(), "1".to_string()]),
        ];
        let mut meta = HashMap::new();
        meta.insert("1".to_string(), ItemMetadata { title: "Lego".into(), ..Default::default() });
        meta.insert("2".to_string(), ItemMetadata { title: "Ball".into(), categories: vec!["Toys".into()], ..Default::default() });

        let mut maps = DataMaps::default();
        maps.user_idx2id.insert("1".into(), "AX".into());
        maps.item_idx2id.insert("1".into(), "B01".into());
        maps.item_idx2id.insert("2".into(), "B02".into());
        (logs, meta, maps)
    }

    #[test]
    fn test_build_preserves_order_and_defaults_metadata() {
        let (logs, meta, maps) = raw();
        let opts = StoreOptions { integer_ids: true, ..Default::default() };
        let (store, _) = SequenceStore::build(&logs, &meta, &maps, &opts);

        // empty user 2 is absent
        assert_eq!(store.all_users(), vec!["1", "3"]);
        let u1 = store.get("1").unwrap();
        assert_eq!(u1.records.items, vec!["1", "2", "3"]);
        assert_eq!(u1.records.titles, vec!["Lego", "Ball", ""]);
        assert_eq!(u1.records.categories[2], Vec::<String>::new());
        assert!(u1.records.is_aligned());
    }

    #[test]
    fn test_external_ids_and_prefix() {
        let (logs, meta, maps) = raw();
        let opts = StoreOptions { add_prefix: true, ..Default::default() };
        let (store, _) = SequenceStore::build(&logs, &meta, &maps, &opts);

        // user 3 has no external mapping, keeps its index
        assert_eq!(store.all_users(), vec!["user_AX", "user_3"]);
        assert_eq!(store.users()[0].records.items, vec!["item_B01", "item_B02", "item_3"]);
        // metadata is still looked up by index
        assert_eq!(store.users()[0].records.titles[0], "Lego");
    }

    #[test]
    fn test_items_start_from_1001() {
        let (logs, meta, maps) = raw();
        let opts = StoreOptions { integer_ids: true, items_start_from_1001: true, add_prefix: true };
        let (store, _) = SequenceStore::build(&logs, &meta, &maps, &opts);
        assert_eq!(store.users()[1].records.items, vec!["item_1002", "item_1001"]);
    }

    #[test]
    fn test_popularity_is_relative_frequency() {
        let (logs, meta, maps) = raw();
        let opts = StoreOptions { integer_ids: true, ..Default::default() };
        let (store, pop) = SequenceStore::build(&logs, &meta, &maps, &opts);

        assert_eq!(pop.total(), store.num_interactions());
        assert_eq!(pop.count("1"), 2);
        assert!((pop.relative_frequency("3") - 0.2).abs() < 1e-12);
        assert_eq!(pop.relative_frequency("missing"), 0.0);
        let sum: f64 = pop.relative_frequencies().iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(store.all_items(), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_duplicate_user_keeps_later_log() {
        let logs = vec![
            ("1".to_string(), vec!["1".to_string()]),
            ("1".to_string(), vec!["2".to_string(), "3".to_string()]),
        ];
        let opts = StoreOptions { integer_ids: true, ..Default::default() };
        let (store, pop) = SequenceStore::build(&logs, &HashMap::new(), &DataMaps::default(), &opts);
        assert_eq!(store.len(), 1);
        assert_eq!(store.users()[0].records.items, vec!["2", "3"]);
        assert_eq!(pop.count("1"), 0);
    }
}
