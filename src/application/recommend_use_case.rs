// ============================================================
// Layer 2 — RecommendUseCase
// ============================================================
// Answers "what will this user buy next?" for a user of the
// prepared dataset:
//
//   Step 1: Load train_config.json + snapshot
//   Step 2: Reload tokenizer, catalog and model checkpoint
//   Step 3: Render the user's test example with the eval
//           task pinned to its eval template
//   Step 4: Rank the catalog, return the top k items
//
// The held-out test item is available separately so the CLI
// can show it next to the recommendations.

use anyhow::{Context, Result};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::build_encoder;
use crate::data::templates::TaskInstance;
use crate::domain::example::{PromptArgs, SequenceExample};
use crate::domain::traits::{Persistable, Recommender};
use crate::infra::{checkpoint::CheckpointManager, snapshot::DatasetSnapshot};
use crate::ml::inferencer::Inferencer;

#[derive(Debug, Clone)]
pub struct RecommendConfig {
    pub checkpoint_dir: String,
    /// Overrides the snapshot recorded in train_config.json
    pub snapshot_path:  Option<String>,
}

pub struct RecommendUseCase {
    snapshot:   DatasetSnapshot,
    eval_task:  TaskInstance,
    inferencer: Inferencer,
    seed:       u64,
}

impl RecommendUseCase {
    pub fn new(config: RecommendConfig) -> Result<Self> {
        let ckpt_manager = CheckpointManager::new(&config.checkpoint_dir)?;
        let mut train_cfg = ckpt_manager.load_config()?;
        train_cfg.checkpoint_dir = config.checkpoint_dir.clone();
        if let Some(path) = config.snapshot_path {
            train_cfg.snapshot_path = path;
        }

        let snapshot   = DatasetSnapshot::load(&train_cfg.snapshot_path)?;
        let encoder    = build_encoder(&train_cfg, &snapshot)?;
        let eval_task  = train_cfg.eval_task()?;
        let inferencer = Inferencer::from_checkpoint(&ckpt_manager, encoder)?;

        Ok(Self { snapshot, eval_task, inferencer, seed: train_cfg.seed })
    }

    /// The user's held-out last item.
    pub fn held_out(&self, user_id: &str) -> Option<&str> {
        find_test_example(&self.snapshot, user_id).map(|ex| ex.target.item.as_str())
    }
}

/// A user's test example: full history minus the last item.
pub fn find_test_example<'a>(snapshot: &'a DatasetSnapshot, user_id: &str) -> Option<&'a SequenceExample> {
    snapshot.splits.test.iter().find(|ex| ex.user_id == user_id)
}

impl Recommender for RecommendUseCase {
    fn recommend(&self, user_id: &str, k: usize) -> Result<Vec<(String, f32)>> {
        let example = find_test_example(&self.snapshot, user_id)
            .with_context(|| format!("User '{user_id}' is not in snapshot '{}'", self.snapshot.name))?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let prompt  = self.eval_task.render(&PromptArgs::from(example), &mut rng)?;
        tracing::debug!("Prompt for '{}':\n{}", user_id, prompt);

        self.inferencer.top_k(user_id, &prompt.input_text, k)
    }
}
