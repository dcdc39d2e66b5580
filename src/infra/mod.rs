// ============================================================
// Layer 6 — Infrastructure
// ============================================================
// Everything that touches the disk or computes run-level
// bookkeeping:
//
//   snapshot.rs        — prepared dataset as one bincode file
//   checkpoint.rs      — model weights and configs (burn recorder)
//   tokenizer_store.rs — build / reload tokenizer.json
//   metrics.rs         — per-epoch metrics.csv
//   ranking.rs         — hit@k, ndcg@k, mrr, long-tail coverage

pub mod snapshot;
pub mod checkpoint;
pub mod tokenizer_store;
pub mod metrics;
pub mod ranking;
