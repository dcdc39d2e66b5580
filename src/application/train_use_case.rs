// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the dataset snapshot         (Layer 6 - infra)
//   Step 2: Pick partitions (merged or not)   (Layer 6 - infra)
//   Step 3: Resolve training / eval tasks     (Layer 4 - data)
//   Step 4: Build / load tokenizer            (Layer 6 - infra)
//   Step 5: Encode the fixed validation set   (Layer 4 - data)
//   Step 6: Save configs                      (Layer 6 - infra)
//   Step 7: Run training loop                 (Layer 5 - ml)
//   Step 8: Evaluate the best checkpoint on
//           the test partition                (Layer 5 - ml)

use anyhow::{bail, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{ItemCatalog, PromptDataset, PromptSample, UserIndex},
    preprocessor::PromptEncoder,
    templates::{TaskInstance, TaskRegistry, TaskSet},
};
use crate::domain::example::{PromptArgs, SequenceExample};
use crate::domain::traits::Persistable;
use crate::infra::{
    checkpoint::CheckpointManager,
    ranking::{long_tail_coverage, MonitorMetric},
    snapshot::DatasetSnapshot,
    tokenizer_store::{count_unknown, TokenizerStore},
};
use crate::ml::{inferencer::Inferencer, model::PromptRecConfig, trainer::{run_training, TrainingPlan}};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved next to the checkpoints and
// reloaded by `recommend`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub snapshot_path:        String,
    pub checkpoint_dir:       String,
    pub train_tasks:          Vec<String>,
    pub eval_task:            String,
    pub eval_template_id:     usize,
    pub epochs:               usize,
    pub batch_size:           usize,
    pub eval_batch_size:      usize,
    pub lr:                   f64,
    pub max_seq_len:          usize,
    pub d_model:              usize,
    pub num_heads:            usize,
    pub num_layers:           usize,
    pub d_ff:                 usize,
    pub dropout:              f64,
    pub vocab_size:           usize,
    pub seed:                 u64,
    pub monitor_metric:       String,
    pub top_k:                usize,
    pub merge_train_val:      bool,
    pub personalized:         bool,
    pub long_tail_percentile: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            snapshot_path:        "snapshots/toys.bin".to_string(),
            checkpoint_dir:       "checkpoints".to_string(),
            train_tasks:          vec!["SequentialTask".to_string()],
            eval_task:            "SequentialTask".to_string(),
            eval_template_id:     0,
            epochs:               10,
            batch_size:           16,
            eval_batch_size:      32,
            lr:                   1e-3,
            max_seq_len:          256,
            d_model:              128,
            num_heads:            4,
            num_layers:           2,
            d_ff:                 512,
            dropout:              0.1,
            vocab_size:           30522,
            seed:                 42,
            monitor_metric:       "loss".to_string(),
            top_k:                10,
            merge_train_val:      false,
            personalized:         false,
            long_tail_percentile: 20.0,
        }
    }
}

impl TrainConfig {
    /// Reject settings the model or loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 || self.batch_size == 0 || self.eval_batch_size == 0 {
            bail!("epochs, batch_size and eval_batch_size must all be at least 1");
        }
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            bail!("d_model ({}) must be divisible by num_heads ({})", self.d_model, self.num_heads);
        }
        if self.train_tasks.is_empty() {
            bail!("at least one training task is required");
        }
        if self.max_seq_len < 2 {
            bail!("max_seq_len must leave room for [CLS] and one token");
        }
        self.monitor_metric.parse::<MonitorMetric>()?;
        Ok(())
    }

    /// The eval task, pinned to the configured template.
    pub fn eval_task(&self) -> Result<TaskInstance> {
        Ok(TaskRegistry::create(&self.eval_task)?.force_template(self.eval_template_id)?)
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Text the tokenizer vocabulary is built from: every template,
/// every user and item key, and item titles and categories.
pub fn tokenizer_corpus(snapshot: &DatasetSnapshot) -> Vec<String> {
    let mut corpus: Vec<String> = TaskRegistry::names()
        .into_iter()
        .filter_map(|name| TaskRegistry::create(name).ok())
        .flat_map(|task| task.all_templates().iter().map(|t| t.input.to_string()).collect::<Vec<_>>())
        .collect();

    corpus.extend(snapshot.store.all_users());
    corpus.extend(snapshot.store.all_items());
    for user in snapshot.store.users() {
        corpus.extend(user.records.titles.iter().filter(|t| !t.is_empty()).cloned());
        corpus.extend(user.records.categories.iter().map(|c| c.join(" ")));
    }
    corpus
}

/// Tokenizer + catalog + user index for a snapshot.
pub fn build_encoder(cfg: &TrainConfig, snapshot: &DatasetSnapshot) -> Result<PromptEncoder> {
    let tokenizer = TokenizerStore::new(&cfg.checkpoint_dir)
        .load_or_build(&tokenizer_corpus(snapshot), cfg.vocab_size)?;
    let items = snapshot.store.all_items();
    let unknown = count_unknown(&tokenizer, &items);
    if unknown > 0 {
        tracing::warn!(
            "{} of {} item keys of '{}' are not in the tokenizer vocabulary of '{}'; \
             they will be read as [UNK]",
            unknown, items.len(), snapshot.name, cfg.checkpoint_dir,
        );
    }
    let catalog = ItemCatalog::new(items);
    let users   = UserIndex::new(snapshot.store.all_users());
    Ok(PromptEncoder::new(tokenizer, catalog, users, cfg.max_seq_len))
}

/// Render fixed examples with a (pinned) task and encode them.
pub fn encode_fixed(
    examples: &[SequenceExample],
    task:     &TaskInstance,
    encoder:  &PromptEncoder,
    seed:     u64,
) -> Result<Vec<PromptSample>> {
    let mut rng = StdRng::seed_from_u64(seed);
    examples
        .iter()
        .map(|ex| {
            let pair = task.render(&PromptArgs::from(ex), &mut rng)?;
            encoder.encode(&ex.user_id, &pair)
        })
        .collect()
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Snapshot ──────────────────────────────────────────────────
        let snapshot = DatasetSnapshot::load(&cfg.snapshot_path)?;

        // ── Step 2: Partitions ────────────────────────────────────────────────
        let parts = snapshot.partitions(cfg.merge_train_val);
        tracing::info!(
            "Partitions: {} train pools, {} validation, {} test (merge_train_val={})",
            parts.train.len(),
            parts.validation.len(),
            parts.test.len(),
            cfg.merge_train_val
        );

        // ── Step 3: Tasks ─────────────────────────────────────────────────────
        let tasks = TaskSet::from_aliases(&cfg.train_tasks)?;
        let eval_task = cfg.eval_task()?;
        tracing::info!("Training tasks: {:?}; eval task: {} (template {})", tasks.names(), eval_task, cfg.eval_template_id);

        // ── Step 4: Tokenizer and encoder ─────────────────────────────────────
        let encoder = build_encoder(cfg, &snapshot)?;

        // ── Step 5: Fixed validation prompts ──────────────────────────────────
        let monitor: MonitorMetric = cfg.monitor_metric.parse()?;
        let validation = if monitor.needs_validation() && !parts.validation.is_empty() {
            let samples = encode_fixed(&parts.validation, &eval_task, &encoder, cfg.seed)?;
            tracing::info!("Encoded {} validation prompts", samples.len());
            Some(PromptDataset::new(samples))
        } else {
            None
        };

        // ── Step 6: Configs ───────────────────────────────────────────────────
        let model_cfg = PromptRecConfig::new(
            cfg.vocab_size.max(encoder.vocab_size()),
            cfg.max_seq_len, cfg.d_model, cfg.num_heads, cfg.num_layers, cfg.d_ff, cfg.dropout,
            encoder.catalog().len(),
            encoder.users().len(),
        )
        .with_personalized(cfg.personalized);

        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_model_config(&model_cfg)?;

        // ── Step 7: Training loop ─────────────────────────────────────────────
        let plan = TrainingPlan {
            model_cfg,
            train_pool: &parts.train,
            tasks:      &tasks,
            encoder:    &encoder,
            validation,
        };
        let summary = run_training(cfg, plan, &ckpt_manager)?;
        if summary.best_epoch.is_none() {
            return Ok(());
        }

        // ── Step 8: Test evaluation ───────────────────────────────────────────
        let test_samples = encode_fixed(&parts.test, &eval_task, &encoder, cfg.seed)?;
        let inferencer = Inferencer::from_checkpoint(&ckpt_manager, encoder)?;
        let report = inferencer.evaluate(test_samples, cfg.eval_batch_size, cfg.top_k)?;

        let recommended: Vec<Vec<&str>> = report
            .top_k
            .iter()
            .map(|labels| labels.iter().filter_map(|&l| inferencer.encoder().catalog().key(l)).collect())
            .collect();
        let coverage = long_tail_coverage(&recommended, &snapshot.popularity, cfg.long_tail_percentile);

        tracing::info!(
            "Test ({} users): hit@{k}={:.4} ndcg@{k}={:.4} mrr={:.4} long_tail_coverage={:.4}",
            report.count, report.hit, report.ndcg, report.mrr, coverage,
            k = cfg.top_k,
        );
        Ok(())
    }
}
