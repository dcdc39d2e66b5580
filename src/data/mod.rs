// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from the raw dataset files
// all the way to GPU-ready tensor batches.
//
// The pipeline flows in this order:
//
//   sequential_data.txt / datamaps.json / meta.jsonl
//       │
//       ▼
//   AmazonLoader      → reads logs, id maps and item metadata
//       │
//       ▼
//   SequenceStore     → column-aligned per-user histories
//       │
//       ▼
//   Splitter          → leave-one-out train pool / val / test
//       │
//       ▼
//   TrainSampler      → fresh (window, target) per user per epoch
//       │
//       ▼
//   Templates         → (input_text, target_text) prompt pairs
//       │
//       ▼
//   PromptEncoder     → token ids, mask, user row, item label
//       │
//       ▼
//   PromptDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   PromptBatcher     → stacks samples into tensor batches
//
// Each module is responsible for exactly one step.

/// Reads the raw dataset directory
pub mod loader;

/// Per-user record sequences and item popularity
pub mod store;

/// Leave-one-out partitions
pub mod splitter;

/// Per-epoch sub-sequence sampling of the train pool
pub mod sampler;

/// Prompt templates, tasks and the task registry
pub mod templates;

/// Tokenises rendered prompts into model samples
pub mod preprocessor;

/// Implements Burn's Dataset trait for prompt samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
