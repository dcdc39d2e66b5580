// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Turns a raw dataset directory into a snapshot file:
//
//   Step 1: Load logs, id maps and metadata   (Layer 4 - data)
//   Step 2: Build the sequence store          (Layer 4 - data)
//   Step 3: Drop users with < 2 interactions  (optional)
//   Step 4: Leave-one-out split               (Layer 4 - data)
//   Step 5: Save the snapshot                 (Layer 6 - infra)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    loader::AmazonLoader,
    splitter::{split_leave_one_out, MIN_SPLIT_HISTORY},
    store::{SequenceStore, StoreOptions, UserSequence},
};
use crate::domain::raw::RawInteractions;
use crate::domain::traits::{InteractionSource, Persistable};
use crate::infra::snapshot::DatasetSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    pub raw_dir:              String,
    pub dataset:              String,
    pub snapshot_path:        String,
    pub options:              StoreOptions,
    /// Drop users too short to split instead of failing
    pub drop_short_histories: bool,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            raw_dir:              "data/raw".to_string(),
            dataset:              "toys".to_string(),
            snapshot_path:        "snapshots/toys.bin".to_string(),
            options:              StoreOptions::default(),
            drop_short_histories: true,
        }
    }
}

pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    /// Load, build, split and save; returns the snapshot that was written.
    pub fn execute(&self) -> Result<DatasetSnapshot> {
        let cfg = &self.config;

        // ── Step 1: Load raw files ────────────────────────────────────────────
        let loader = AmazonLoader::new(&cfg.raw_dir, &cfg.dataset);
        tracing::info!("Loading dataset '{}' from '{}'", cfg.dataset, loader.dir().display());
        let raw = loader.load_all()?;

        self.prepare_from(&raw)
    }

    /// Steps 2–5 on already loaded raw data.
    pub fn prepare_from(&self, raw: &RawInteractions) -> Result<DatasetSnapshot> {
        let cfg = &self.config;

        // ── Step 2: Sequence store ────────────────────────────────────────────
        let (mut store, mut popularity) =
            SequenceStore::build(&raw.user_items, &raw.metadata, &raw.maps, &cfg.options);

        // ── Step 3: Short histories ───────────────────────────────────────────
        if cfg.drop_short_histories {
            let (kept, dropped): (Vec<UserSequence>, Vec<UserSequence>) = store
                .users()
                .iter()
                .cloned()
                .partition(|u| u.records.len() >= MIN_SPLIT_HISTORY);
            if !dropped.is_empty() {
                tracing::warn!(
                    "Dropping {} users with fewer than {} interactions",
                    dropped.len(),
                    MIN_SPLIT_HISTORY
                );
                store = SequenceStore::from_sequences(kept);
                popularity = store.popularity();
            }
        }

        // ── Step 4: Leave-one-out split ───────────────────────────────────────
        let splits = split_leave_one_out(&store)
            .context("Leave-one-out split failed (re-run with short histories dropped)")?;
        tracing::info!(
            "Split {} users: {} train pools, {} validation, {} test",
            store.len(),
            splits.train.len(),
            splits.validation.len(),
            splits.test.len()
        );

        // ── Step 5: Snapshot ──────────────────────────────────────────────────
        let snapshot = DatasetSnapshot {
            name: cfg.dataset.clone(),
            options: cfg.options.clone(),
            store,
            popularity,
            splits,
        };
        snapshot.save(&cfg.snapshot_path)?;
        Ok(snapshot)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_raw(dir: &std::path::Path) {
        let ds = dir.join("toys");
        fs::create_dir_all(&ds).unwrap();
        fs::write(ds.join("sequential_data.txt"), "1 1 2 3 4\n2 2 3\n3 4\n").unwrap();
        fs::write(
            ds.join("datamaps.json"),
            r#"{"user2id": {"A": 1, "B": 2, "C": 3}, "item2id": {"X1": 1, "X2": 2, "X3": 3, "X4": 4},
                "id2user": {"1": "A", "2": "B", "3": "C"}, "id2item": {"1": "X1", "2": "X2", "3": "X3", "4": "X4"}}"#,
        )
        .unwrap();
        fs::write(ds.join("meta.jsonl"), "{\"asin\": \"X1\", \"title\": \"Lego\"}\n").unwrap();
    }

    fn config(tmp: &std::path::Path, drop_short: bool) -> PrepareConfig {
        PrepareConfig {
            raw_dir:              tmp.to_string_lossy().to_string(),
            dataset:              "toys".into(),
            snapshot_path:        tmp.join("out").join("toys.bin").to_string_lossy().to_string(),
            options:              StoreOptions { add_prefix: true, integer_ids: true, items_start_from_1001: false },
            drop_short_histories: drop_short,
        }
    }

    #[test]
    fn test_prepare_writes_loadable_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        write_raw(tmp.path());
        let cfg = config(tmp.path(), true);

        let snap = PrepareUseCase::new(cfg.clone()).execute().unwrap();
        // user 3 has a single interaction and is dropped
        assert_eq!(snap.store.all_users(), vec!["user_1", "user_2"]);
        assert_eq!(snap.popularity.count("item_4"), 1);
        assert_eq!(snap.splits.test[0].target.item, "item_4");
        assert_eq!(snap.splits.test[0].input.titles[0], "Lego");

        let loaded = DatasetSnapshot::load(&cfg.snapshot_path).unwrap();
        assert_eq!(loaded, snap);
    }

    #[test]
    fn test_prepare_fails_on_short_history_when_not_dropping() {
        let tmp = tempfile::tempdir().unwrap();
        write_raw(tmp.path());
        assert!(PrepareUseCase::new(config(tmp.path(), false)).execute().is_err());
    }
}
