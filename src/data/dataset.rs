// ============================================================
// Layer 4 — Prompt Dataset
// ============================================================
// Encoded prompts exposed through Burn's Dataset trait, plus
// the dense key indices that turn item keys into class labels
// and user keys into embedding rows.

use std::collections::HashMap;

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One tokenised and padded prompt with its target label.
/// Sequence format: [CLS] prompt tokens [PAD]...
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Dense index of the user (for personalization)
    pub user_index:     usize,
    /// Dense index of the target item in the catalog
    pub label:          usize,
}

impl PromptSample {
    pub fn num_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

pub struct PromptDataset {
    samples: Vec<PromptSample>,
}

impl PromptDataset {
    pub fn new(samples: Vec<PromptSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<PromptSample> for PromptDataset {
    fn get(&self, index: usize) -> Option<PromptSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Dense, stable indices for a list of keys (items or users).
/// Built from the store's first-appearance order, so rebuilding
/// from the same snapshot always yields the same indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyIndex {
    keys:  Vec<String>,
    index: HashMap<String, usize>,
}

/// Item keys → class labels.
pub type ItemCatalog = KeyIndex;
/// User keys → embedding rows.
pub type UserIndex = KeyIndex;

impl KeyIndex {
    pub fn new(keys: Vec<String>) -> Self {
        let index = keys.iter().enumerate().map(|(i, k)| (k.clone(), i)).collect();
        Self { keys, index }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }
}
