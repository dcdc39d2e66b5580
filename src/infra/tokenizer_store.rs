// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds a word-level tokenizer from the prompt corpus on the
// first run and persists it as tokenizer.json; later runs and
// `recommend` reload the same file so token ids never change
// between training and inference.
//
// Vocabulary layout:
//   0        [PAD]
//   1        [UNK]
//   101–103  [CLS] [SEP] [MASK]
//   104..    corpus words, most frequent first
//
// Words are split exactly like the runtime pre-tokenizer
// (runs of word characters, runs of punctuation) and
// lowercased, so "item_1001:" yields "item_1001" and ":".

use anyhow::{Context, Result};
use std::{collections::HashMap, path::PathBuf};
use tokenizers::Tokenizer;

/// Special tokens take ids below this.
const FIRST_WORD_ID: usize = 104;
const NUM_SPECIAL:   usize = 5;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Load tokenizer.json if present, otherwise build it from `texts`.
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from disk");
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let words = vocabulary(texts, vocab_size.saturating_sub(NUM_SPECIAL));

        let mut vocab = serde_json::json!({
            "[PAD]":  0,
            "[UNK]":  1,
            "[CLS]":  101,
            "[SEP]":  102,
            "[MASK]": 103,
        });
        for (offset, word) in words.iter().enumerate() {
            vocab[word] = serde_json::json!(FIRST_WORD_ID + offset);
        }

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": 0,   "content": "[PAD]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 1,   "content": "[UNK]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 101, "content": "[CLS]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 102, "content": "[SEP]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 103, "content": "[MASK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": false,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| "Cannot write tokenizer JSON")?;

        tracing::info!(
            "Tokenizer built with {} words, saved to '{}'",
            words.len() + NUM_SPECIAL,
            path.display()
        );

        Tokenizer::from_file(&path).map_err(|e| anyhow::anyhow!("Cannot reload tokenizer: {e}"))
    }
}

/// Lowercased word and punctuation runs of `text`.
pub fn pre_tokenize(text: &str) -> Vec<String> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    let mut tokens  = Vec::new();
    let mut current = String::new();
    let mut in_word = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() && is_word(c) != in_word {
            tokens.push(std::mem::take(&mut current));
        }
        in_word = is_word(c);
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// How many `keys` contain a word the tokenizer maps to [UNK].
pub fn count_unknown(tokenizer: &Tokenizer, keys: &[String]) -> usize {
    let vocab = tokenizer.get_vocab(false);
    keys.iter()
        .filter(|key| pre_tokenize(key).iter().any(|w| !vocab.contains_key(w)))
        .count()
}

/// The `max_words` most frequent tokens; ties break alphabetically.
fn vocabulary(texts: &[String], max_words: usize) -> Vec<String> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for word in pre_tokenize(text) {
            *freq.entry(word).or_insert(0) += 1;
        }
    }
    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(max_words);
    words.into_iter().map(|(w, _)| w).collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_tokenize() {
        assert_eq!(
            pre_tokenize("Sequential_rec for user_1: \n\nA -> item_2 , B"),
            vec!["sequential_rec", "for", "user_1", ":", "a", "->", "item_2", ",", "b"]
        );
    }

    #[test]
    fn test_vocabulary_is_frequency_ordered_and_capped() {
        let texts = vec!["b a b c".to_string(), "b a".to_string()];
        assert_eq!(vocabulary(&texts, 10), vec!["b", "a", "c"]);
        assert_eq!(vocabulary(&texts, 2), vec!["b", "a"]);
    }

    #[test]
    fn test_build_then_reload_gives_same_ids() {
        let tmp   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(tmp.path().to_string_lossy().to_string());
        let texts = vec!["predict item_1 then item_2".to_string()];

        let built = store.load_or_build(&texts, 100).unwrap();
        let ids   = built.encode("Predict item_2", false).unwrap().get_ids().to_vec();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|&id| id >= FIRST_WORD_ID as u32));

        // second call loads from disk, even with a different corpus
        let loaded = store.load_or_build(&[], 100).unwrap();
        assert_eq!(loaded.encode("Predict item_2", false).unwrap().get_ids(), ids.as_slice());

        let unk = loaded.encode("unseen", false).unwrap();
        assert_eq!(unk.get_ids(), &[1]);
    }

    #[test]
    fn test_count_unknown_flags_keys_of_another_dataset() {
        let tmp   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(tmp.path().to_string_lossy().to_string());
        let tokenizer = store.load_or_build(&["item_1 item_2".to_string()], 100).unwrap();

        let keys = vec!["item_1".to_string(), "ITEM_2".to_string(), "item_3".to_string()];
        assert_eq!(count_unknown(&tokenizer, &keys), 1);
        assert_eq!(count_unknown(&tokenizer, &keys[..2]), 0);
    }
}
