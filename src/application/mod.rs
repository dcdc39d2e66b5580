// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one goal per command.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct file parsing (that's Layer 4 and 6)
//   - Only workflow coordination

// Raw files → dataset snapshot
pub mod prepare_use_case;

// Snapshot → trained checkpoint
pub mod train_use_case;

// Checkpoint + snapshot → next-item recommendations
pub mod recommend_use_case;
