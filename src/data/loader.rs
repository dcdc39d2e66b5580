// ============================================================
// Layer 4 — Raw Interaction Loader
// ============================================================
// Reads one dataset directory in the Amazon review layout:
//
//   <raw_dir>/<dataset>/
//     sequential_data.txt   "user_idx item_idx item_idx ..." per line
//     datamaps.json         user2id / item2id / id2user / id2item
//     meta.jsonl            one JSON object per item, keyed by "asin"
//
// Only items that appear in item2id keep their metadata; the
// rest of the (large) metadata dump is discarded while reading.
//
// A metadata line that doesn't parse is logged and skipped:
// the upstream dumps are known to be partial, and the store
// defaults missing fields anyway.

use anyhow::{Context, Result};
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::domain::raw::{DataMaps, RawInteractions};
use crate::domain::record::ItemMetadata;
use crate::domain::traits::InteractionSource;

pub const SEQUENTIAL_FILE: &str = "sequential_data.txt";
pub const DATAMAPS_FILE:   &str = "datamaps.json";
pub const META_FILE:       &str = "meta.jsonl";

/// Loads the raw files of one Amazon dataset (beauty, toys, sport, ...).
pub struct AmazonLoader {
    dir: PathBuf,
}

impl AmazonLoader {
    pub fn new(raw_dir: impl AsRef<Path>, dataset: &str) -> Self {
        Self { dir: raw_dir.as_ref().join(dataset) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl InteractionSource for AmazonLoader {
    fn load_all(&self) -> Result<RawInteractions> {
        if !self.dir.exists() {
            anyhow::bail!("Raw data directory '{}' does not exist", self.dir.display());
        }

        let user_items = read_sequential(&self.dir.join(SEQUENTIAL_FILE))?;
        tracing::info!("Read {} user sequences", user_items.len());

        let maps = read_datamaps(&self.dir.join(DATAMAPS_FILE))?;

        let meta_path = self.dir.join(META_FILE);
        let metadata = if meta_path.exists() {
            read_metadata(&meta_path, &maps)?
        } else {
            tracing::warn!(
                "No metadata file at '{}', every item will have empty metadata",
                meta_path.display()
            );
            HashMap::new()
        };
        tracing::info!("Extracted metadata for {} items", metadata.len());

        Ok(RawInteractions { user_items, maps, metadata })
    }
}

/// Parse `sequential_data.txt`. Blank lines are ignored; a user
/// line with no items yields an empty list (dropped by the store).
pub fn read_sequential(path: &Path) -> Result<Vec<(String, Vec<String>)>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;

    let mut user_items = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if let Some(parsed) = parse_sequential_line(&line) {
            user_items.push(parsed);
        }
    }
    Ok(user_items)
}

/// `"u1 i1 i2 i3"` → `("u1", ["i1", "i2", "i3"])`
pub fn parse_sequential_line(line: &str) -> Option<(String, Vec<String>)> {
    let mut tokens = line.split_whitespace();
    let user = tokens.next()?.to_string();
    let items = tokens.map(str::to_string).collect();
    Some((user, items))
}

/// Parse `datamaps.json`; numbers and strings are both accepted.
pub fn read_datamaps(path: &Path) -> Result<DataMaps> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    parse_datamaps(&json)
        .with_context(|| format!("Malformed datamaps in '{}'", path.display()))
}

pub fn parse_datamaps(json: &str) -> Result<DataMaps> {
    let root: Value = serde_json::from_str(json)?;

    let table = |key: &str| -> HashMap<String, String> {
        root.get(key)
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), value_to_string(v)))
                    .collect()
            })
            .unwrap_or_default()
    };

    Ok(DataMaps {
        user_id2idx: table("user2id"),
        item_id2idx: table("item2id"),
        user_idx2id: table("id2user"),
        item_idx2id: table("id2item"),
    })
}

/// Read metadata for every item known to `maps`, keyed by item index.
pub fn read_metadata(path: &Path, maps: &DataMaps) -> Result<HashMap<String, ItemMetadata>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;

    let relevant: HashSet<&str> = maps.item_id2idx.keys().map(String::as_str).collect();
    let mut metadata = HashMap::new();
    let mut skipped = 0usize;

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_meta_line(&line) {
            Some((asin, meta)) => {
                if relevant.contains(asin.as_str()) {
                    if let Some(idx) = maps.item_id2idx.get(&asin) {
                        metadata.insert(idx.clone(), meta);
                    }
                }
            }
            None => {
                skipped += 1;
                tracing::debug!("Skipping metadata line {}: not a JSON object with 'asin'", line_no + 1);
            }
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} unparseable metadata lines", skipped);
    }
    Ok(metadata)
}

/// One metadata line → (asin, metadata). Missing fields default to
/// empty; only the first category group is kept.
pub fn parse_meta_line(line: &str) -> Option<(String, ItemMetadata)> {
    let value: Value = serde_json::from_str(line).ok()?;
    let obj = value.as_object()?;
    let asin = obj.get("asin").map(value_to_string)?;

    let field = |key: &str| obj.get(key).map(value_to_string).unwrap_or_default();

    let categories = obj
        .get("categories")
        .and_then(Value::as_array)
        .and_then(|groups| groups.first())
        .and_then(Value::as_array)
        .map(|group| group.iter().map(value_to_string).collect())
        .unwrap_or_default();

    Some((
        asin,
        ItemMetadata {
            title:       field("title"),
            description: field("description"),
            categories,
            price:       field("price"),
            imurl:       field("imUrl"),
            brand:       field("brand"),
        },
    ))
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null      => String::new(),
        other            => other.to_string(),
    }
}
