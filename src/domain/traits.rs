// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to these traits, not to the
// concrete loaders, stores or models behind them:
//
//   InteractionSource → where raw per-user logs come from
//   Recommender       → anything that ranks next items for a user
//   Persistable       → anything saved to / restored from disk

use anyhow::Result;

use crate::domain::raw::RawInteractions;

// ─── InteractionSource ────────────────────────────────────────────────────────
/// Any component that can produce raw interaction logs.
///
/// Implementations:
///   - AmazonLoader → reads a directory in the Amazon review layout
pub trait InteractionSource {
    /// Load user logs, id maps and item metadata in one go.
    fn load_all(&self) -> Result<RawInteractions>;
}

// ─── Recommender ──────────────────────────────────────────────────────────────
/// Any component that can recommend next items for a known user.
///
/// Implementations:
///   - RecommendUseCase → renders the user's history and runs the model
pub trait Recommender {
    /// Return the `k` best item keys with their scores, best first.
    fn recommend(&self, user_id: &str, k: usize) -> Result<Vec<(String, f32)>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
///
/// Implementations:
///   - DatasetSnapshot → the whole prepared dataset as one binary file
pub trait Persistable: Sized {
    /// Save this component's state to the given path
    fn save(&self, path: &str) -> Result<()>;

    /// Load a component's state from the given path.
    fn load(path: &str) -> Result<Self>;
}
