// ============================================================
// Layer 3 — Raw Interactions
// ============================================================
// What the loader hands to the sequence store: per-user item
// index lists in file order, the id maps between external ids
// and index strings, and per-item metadata. Items without a
// metadata entry are not an error here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::record::ItemMetadata;

/// Bidirectional lookups between external ids (e.g. ASINs) and
/// internal index strings. All keys and values are strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMaps {
    pub user_id2idx: HashMap<String, String>,
    pub item_id2idx: HashMap<String, String>,
    pub user_idx2id: HashMap<String, String>,
    pub item_idx2id: HashMap<String, String>,
}

/// Everything the sequence store needs, as read from disk.
#[derive(Debug, Clone, Default)]
pub struct RawInteractions {
    /// (user index, item indices) in file order
    pub user_items: Vec<(String, Vec<String>)>,
    pub maps:       DataMaps,
    /// Metadata keyed by internal item index
    pub metadata:   HashMap<String, ItemMetadata>,
}
