// ============================================================
// Layer 6 — Dataset Snapshot
// ============================================================
// The prepared dataset (store, popularity, partitions and the
// options they were built with) is written as one bincode file
// and restored verbatim by `train` and `recommend`:
//
//   prepare ──► snapshots/<dataset>.bin ──► train / recommend
//
// Nothing is recomputed on load, so every later step sees the
// exact same split.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::BufReader,
    path::Path,
};

use crate::data::splitter::{merged_train_pool, SplitPartitions};
use crate::data::store::{ItemPopularity, SequenceStore, StoreOptions};
use crate::domain::traits::Persistable;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    pub name:       String,
    pub options:    StoreOptions,
    pub store:      SequenceStore,
    pub popularity: ItemPopularity,
    pub splits:     SplitPartitions,
}

impl DatasetSnapshot {
    /// Partitions to train with.
    ///
    /// With `merge_train_val` the validation target moves into the
    /// train pool and no validation partition is returned.
    pub fn partitions(&self, merge_train_val: bool) -> SplitPartitions {
        if merge_train_val {
            SplitPartitions {
                train:      merged_train_pool(&self.store),
                validation: Vec::new(),
                test:       self.splits.test.clone(),
            }
        } else {
            self.splits.clone()
        }
    }
}

impl Persistable for DatasetSnapshot {
    fn save(&self, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }
        let bytes = bincode::serialize(self)
            .with_context(|| format!("Failed to serialize snapshot '{}'", self.name))?;
        fs::write(path, &bytes)
            .with_context(|| format!("Cannot write snapshot file '{path}'"))?;
        tracing::info!("Saved dataset snapshot '{}' to '{}'", self.name, path);
        Ok(())
    }

    fn load(path: &str) -> Result<Self> {
        let file = File::open(path).with_context(|| {
            format!("Cannot open snapshot '{path}'. Have you run 'prepare' first?")
        })?;
        let snapshot: DatasetSnapshot = bincode::deserialize_from(BufReader::new(file))
            .with_context(|| format!("Snapshot '{path}' is corrupt or from another version"))?;
        tracing::info!(
            "Loaded dataset snapshot '{}': {} users, {} interactions",
            snapshot.name,
            snapshot.store.len(),
            snapshot.store.num_interactions(),
        );
        Ok(snapshot)
    }
}
