// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. Model weights (.mpk.gz file) — one file per saved epoch
//   2. best_epoch.json              — which epoch inference loads
//   3. train_config.json            — the run's TrainConfig
//   4. model_config.json            — PromptRecConfig, including
//                                     catalog and user counts
//
// The model config is needed to rebuild the exact architecture
// before the weights can be loaded into it.
//
// File layout:
//   checkpoints/
//     model_epoch_3.mpk.gz
//     best_epoch.json
//     train_config.json
//     model_config.json
//     tokenizer.json        (written by TokenizerStore)
//     metrics.csv           (written by MetricsLogger)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{PromptRecConfig, PromptRecModel};

const BEST_EPOCH_FILE:   &str = "best_epoch.json";
const TRAIN_CONFIG_FILE: &str = "train_config.json";
const MODEL_CONFIG_FILE: &str = "model_config.json";

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save weights for `epoch` and mark it as the one to load.
    pub fn save_model<B: Backend>(&self, model: &PromptRecModel<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let best_path = self.dir.join(BEST_EPOCH_FILE);
        fs::write(&best_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {BEST_EPOCH_FILE}"))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the weights of the best saved epoch into `model`.
    pub fn load_model<B: Backend>(
        &self,
        model:  PromptRecModel<B>,
        device: &B::Device,
    ) -> Result<PromptRecModel<B>> {
        let epoch = self.best_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));
        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
            })?;
        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(TRAIN_CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(TRAIN_CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' before 'recommend'.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed training config '{}'", path.display()))
    }

    pub fn save_model_config(&self, cfg: &PromptRecConfig) -> Result<()> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        cfg.save(&path)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_model_config(&self) -> Result<PromptRecConfig> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        PromptRecConfig::load(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read model config '{}': {e}", path.display()))
    }

    pub fn best_epoch(&self) -> Result<usize> {
        let path = self.dir.join(BEST_EPOCH_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{BEST_EPOCH_FILE}'. Have you run 'train' first?"))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let tmp  = tempfile::tempdir().unwrap();
        let mgr  = CheckpointManager::new(tmp.path().to_string_lossy().to_string()).unwrap();
        let mut cfg = TrainConfig::default();
        cfg.epochs = 3;
        cfg.train_tasks = vec!["SequentialSideInfoTask".into()];
        mgr.save_config(&cfg).unwrap();

        let loaded = mgr.load_config().unwrap();
        assert_eq!(loaded.epochs, 3);
        assert_eq!(loaded.train_tasks, vec!["SequentialSideInfoTask".to_string()]);
    }

    #[test]
    fn test_model_config_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(tmp.path().to_string_lossy().to_string()).unwrap();
        let cfg = PromptRecConfig::new(500, 64, 32, 4, 2, 64, 0.1, 120, 40).with_personalized(true);
        mgr.save_model_config(&cfg).unwrap();

        let loaded = mgr.load_model_config().unwrap();
        assert_eq!(loaded.num_items, 120);
        assert_eq!(loaded.num_users, 40);
        assert!(loaded.personalized);
    }

    #[test]
    fn test_missing_best_epoch() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(tmp.path().to_string_lossy().to_string()).unwrap();
        assert!(mgr.best_epoch().is_err());
        assert!(mgr.load_config().is_err());
    }
}
