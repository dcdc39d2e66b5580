// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// The model, its training loop and inference all live here.
//
//   model.rs      — prompt encoder + item classifier
//                   • token and positional embeddings
//                   • self-attention blocks with pad masking
//                   • masked mean-pooling
//                   • optional per-user embedding
//                   • linear head over the item catalog
//
//   trainer.rs    — per-epoch re-sampling, Adam updates,
//                   validation ranking metrics, checkpointing
//                   on improvement of the monitored metric
//
//   inferencer.rs — loads the best checkpoint, scores the
//                   catalog for a prompt, evaluates partitions
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// Transformer prompt encoder with an item head
pub mod model;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and ranks items
pub mod inferencer;
