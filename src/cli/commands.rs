// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `prepare`, `train`, `recommend` and
// `templates` and all their configurable flags.
//
// Every argument struct converts into a plain application
// config via `From`, so the application layer never sees clap
// types.

use clap::{Args, Subcommand};

use crate::application::{
    prepare_use_case::PrepareConfig,
    recommend_use_case::RecommendConfig,
    train_use_case::TrainConfig,
};
use crate::data::store::StoreOptions;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read a raw dataset, split it leave-one-out and save a snapshot
    Prepare(PrepareArgs),

    /// Train the prompt recommender on a prepared snapshot
    Train(TrainArgs),

    /// Recommend next items for a user of the snapshot
    Recommend(RecommendArgs),

    /// List the prompt templates of every task
    Templates(TemplatesArgs),
}

/// All arguments for the `prepare` command.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Directory holding one sub-directory per dataset
    #[arg(long, default_value = "data/raw")]
    pub raw_dir: String,

    /// Dataset name (sub-directory of raw_dir)
    #[arg(long, default_value = "toys")]
    pub dataset: String,

    /// Where to write the snapshot
    #[arg(long, default_value = "snapshots/toys.bin")]
    pub snapshot_path: String,

    /// Prefix user keys with `user_` and item keys with `item_`
    #[arg(long)]
    pub add_prefix: bool,

    /// Keep internal integer ids instead of the original ids
    #[arg(long)]
    pub integer_ids: bool,

    /// Shift numeric item ids by 1000
    #[arg(long)]
    pub items_start_from_1001: bool,

    /// Fail on users with fewer than 2 interactions instead of dropping them
    #[arg(long)]
    pub keep_short_histories: bool,
}

impl From<PrepareArgs> for PrepareConfig {
    fn from(a: PrepareArgs) -> Self {
        PrepareConfig {
            raw_dir:       a.raw_dir,
            dataset:       a.dataset,
            snapshot_path: a.snapshot_path,
            options: StoreOptions {
                add_prefix:            a.add_prefix,
                integer_ids:           a.integer_ids,
                items_start_from_1001: a.items_start_from_1001,
            },
            drop_short_histories: !a.keep_short_histories,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Snapshot written by `prepare`
    #[arg(long, default_value = "snapshots/toys.bin")]
    pub snapshot_path: String,

    /// Directory for checkpoints, tokenizer and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Tasks every sampled example is rendered with (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "SequentialTask")]
    pub train_tasks: Vec<String>,

    /// Task used for validation and test prompts
    #[arg(long, default_value = "SequentialTask")]
    pub eval_task: String,

    /// Template the eval task is pinned to
    #[arg(long, default_value_t = 0)]
    pub eval_template_id: usize,

    /// Number of epochs; each one re-samples the train pool
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 32)]
    pub eval_batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Maximum prompt length in tokens, [CLS] included
    #[arg(long, default_value_t = 256)]
    pub max_seq_len: usize,

    /// Hidden dimension; must be divisible by num_heads
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 512)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Upper bound on the tokenizer vocabulary
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    /// Seed for sampling, rendering and shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// `loss`, `hit@k`, `ndcg@k` or `no` (save the last epoch)
    #[arg(long, default_value = "loss")]
    pub monitor_metric: String,

    /// Cut-off for hit / ndcg reporting
    #[arg(long, default_value_t = 10)]
    pub top_k: usize,

    /// Train on validation targets too (no validation set)
    #[arg(long)]
    pub merge_train_val: bool,

    /// Add a learned user embedding to the prompt encoding
    #[arg(long)]
    pub personalized: bool,

    /// Popularity percentile that defines long-tail items
    #[arg(long, default_value_t = 20.0)]
    pub long_tail_percentile: f64,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            snapshot_path:        a.snapshot_path,
            checkpoint_dir:       a.checkpoint_dir,
            train_tasks:          a.train_tasks,
            eval_task:            a.eval_task,
            eval_template_id:     a.eval_template_id,
            epochs:               a.epochs,
            batch_size:           a.batch_size,
            eval_batch_size:      a.eval_batch_size,
            lr:                   a.lr,
            max_seq_len:          a.max_seq_len,
            d_model:              a.d_model,
            num_heads:            a.num_heads,
            num_layers:           a.num_layers,
            d_ff:                 a.d_ff,
            dropout:              a.dropout,
            vocab_size:           a.vocab_size,
            seed:                 a.seed,
            monitor_metric:       a.monitor_metric,
            top_k:                a.top_k,
            merge_train_val:      a.merge_train_val,
            personalized:         a.personalized,
            long_tail_percentile: a.long_tail_percentile,
        }
    }
}

/// All arguments for the `recommend` command.
#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// User key as stored in the snapshot
    #[arg(long)]
    pub user: String,

    /// Number of items to recommend
    #[arg(long, default_value_t = 10)]
    pub k: usize,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Use another snapshot than the one recorded at training time
    #[arg(long)]
    pub snapshot_path: Option<String>,
}

impl From<&RecommendArgs> for RecommendConfig {
    fn from(a: &RecommendArgs) -> Self {
        RecommendConfig {
            checkpoint_dir: a.checkpoint_dir.clone(),
            snapshot_path:  a.snapshot_path.clone(),
        }
    }
}

/// All arguments for the `templates` command.
#[derive(Args, Debug)]
pub struct TemplatesArgs {
    /// Only show this task (case-insensitive)
    #[arg(long)]
    pub task: Option<String>,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_args_convert() {
        let cli = Cli::try_parse_from([
            "seqrec-prompt", "train",
            "--train-tasks", "SequentialTask,PersonalizedSequentialTask",
            "--monitor-metric", "ndcg@10",
            "--personalized",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.train_tasks, vec!["SequentialTask", "PersonalizedSequentialTask"]);
        assert_eq!(cfg.monitor_metric, "ndcg@10");
        assert!(cfg.personalized);
        assert_eq!(cfg.epochs, TrainConfig::default().epochs);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_prepare_args_convert() {
        let cli = Cli::try_parse_from(["seqrec-prompt", "prepare", "--dataset", "beauty", "--add-prefix"]).unwrap();
        let Commands::Prepare(args) = cli.command else { panic!("expected prepare") };
        let cfg: PrepareConfig = args.into();
        assert_eq!(cfg.dataset, "beauty");
        assert!(cfg.options.add_prefix);
        assert!(!cfg.options.integer_ids);
        assert!(cfg.drop_short_histories);
    }

    #[test]
    fn test_recommend_requires_user() {
        assert!(Cli::try_parse_from(["seqrec-prompt", "recommend"]).is_err());
    }
}
