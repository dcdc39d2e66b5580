// ============================================================
// Layer 4 — Prompt Preprocessor
// ============================================================
// Converts a rendered (input_text, target_text) pair into a
// fixed-size model sample:
//
//   input_text  ──tokenizer──►  [CLS] t1 t2 ... tn [PAD] ...
//   target_text ──catalog────►  label (dense item index)
//   user_id     ──user index─►  user_index
//
// Prompts longer than max_seq_len keep their head; the history
// is at the end of most templates, so very long histories lose
// their most recent items first. Use a larger max_seq_len if
// that matters for a dataset.

use anyhow::{Context, Result};
use tokenizers::Tokenizer;

use crate::data::dataset::{ItemCatalog, PromptSample, UserIndex};
use crate::domain::prompt::PromptTarget;

/// [CLS] token id, prepended to every prompt
pub const CLS_ID: u32 = 101;
/// [PAD] token id
pub const PAD_ID: u32 = 0;

#[derive(Clone)]
pub struct PromptEncoder {
    tokenizer:   Tokenizer,
    catalog:     ItemCatalog,
    users:       UserIndex,
    max_seq_len: usize,
}

impl PromptEncoder {
    pub fn new(tokenizer: Tokenizer, catalog: ItemCatalog, users: UserIndex, max_seq_len: usize) -> Self {
        Self { tokenizer, catalog, users, max_seq_len }
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn users(&self) -> &UserIndex {
        &self.users
    }

    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    /// Smallest embedding table that fits every id the tokenizer can emit.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer
            .get_vocab(true)
            .values()
            .max()
            .map_or(0, |&id| id as usize + 1)
    }

    /// Token ids of `text` without special tokens.
    pub fn token_ids(&self, text: &str) -> Result<Vec<u32>> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        Ok(enc.get_ids().to_vec())
    }

    /// Encode one prompt pair for `user_id`.
    pub fn encode(&self, user_id: &str, pair: &PromptTarget) -> Result<PromptSample> {
        let label = self
            .catalog
            .index_of(pair.target_text.trim())
            .with_context(|| format!("Target '{}' is not in the item catalog", pair.target_text))?;
        let mut sample = self.encode_input(user_id, &pair.input_text)?;
        sample.label = label;
        Ok(sample)
    }

    /// Encode an input prompt whose target is unknown (label 0).
    pub fn encode_input(&self, user_id: &str, input_text: &str) -> Result<PromptSample> {
        let user_index = self
            .users
            .index_of(user_id)
            .with_context(|| format!("User '{user_id}' is not in the user index"))?;

        let mut input_ids = vec![CLS_ID];
        input_ids.extend(self.token_ids(input_text)?);
        input_ids.truncate(self.max_seq_len);

        // Attention mask: 1 for real tokens, 0 for padding
        let mut attention_mask = vec![1u32; input_ids.len()];
        input_ids.resize(self.max_seq_len, PAD_ID);
        attention_mask.resize(self.max_seq_len, 0);

        Ok(PromptSample { input_ids, attention_mask, user_index, label: 0 })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::TokenizerStore;

    fn encoder(max_seq_len: usize) -> (tempfile::TempDir, PromptEncoder) {
        let tmp = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(tmp.path().to_string_lossy().to_string());
        let corpus = vec!["predict the next item_1 item_2".to_string()];
        let tokenizer = store.load_or_build(&corpus, 100).unwrap();
        let catalog = ItemCatalog::new(vec!["item_1".into(), "item_2".into()]);
        let users = UserIndex::new(vec!["user_1".into()]);
        (tmp, PromptEncoder::new(tokenizer, catalog, users, max_seq_len))
    }

    #[test]
    fn test_encode_pads_and_labels() {
        let (_tmp, enc) = encoder(16);
        let s = enc.encode("user_1", &PromptTarget::new("predict the next item_1", "item_2")).unwrap();
        assert_eq!(s.input_ids.len(), 16);
        assert_eq!(s.attention_mask.len(), 16);
        assert_eq!(s.input_ids[0], CLS_ID);
        assert_eq!(s.num_tokens(), 5);
        assert_eq!(s.input_ids[5], PAD_ID);
        assert_eq!(s.label, 1);
        assert_eq!(s.user_index, 0);
        // ids 104..=108 for the five corpus words
        assert_eq!(enc.vocab_size(), 109);
    }

    #[test]
    fn test_encode_truncates() {
        let (_tmp, enc) = encoder(3);
        let s = enc.encode("user_1", &PromptTarget::new("predict the next item_1", "item_1")).unwrap();
        assert_eq!(s.input_ids.len(), 3);
        assert_eq!(s.num_tokens(), 3);
    }

    #[test]
    fn test_unknown_target_or_user_fails() {
        let (_tmp, enc) = encoder(8);
        assert!(enc.encode("user_1", &PromptTarget::new("x", "item_9")).is_err());
        assert!(enc.encode("user_9", &PromptTarget::new("x", "item_1")).is_err());
    }
}
