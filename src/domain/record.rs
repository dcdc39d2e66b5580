// ============================================================
// Layer 3 — Interaction Records
// ============================================================
// A user's history is stored column-wise: one Vec per field,
// all of the same length. Index i of every Vec describes the
// same interaction.
//
//   items:      [A,      B,      C     ]
//   titles:     ["Lego", "Ball", "Doll"]
//   prices:     ["9.99", "",     "4.50"]
//   ...
//
// Every slice goes through RecordSeq::slice, which applies the
// same range to all columns, so the columns can never drift
// out of alignment.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Descriptive fields of one item, frozen when the store is built.
/// Missing metadata is represented by empty strings / empty lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub title:       String,
    pub description: String,
    /// First category group only
    pub categories:  Vec<String>,
    pub price:       String,
    pub imurl:       String,
    pub brand:       String,
}

/// One user-item event with its metadata attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub item: String,
    pub meta: ItemMetadata,
}

impl InteractionRecord {
    pub fn new(item: impl Into<String>, meta: ItemMetadata) -> Self {
        Self { item: item.into(), meta }
    }
}

/// An ordered sequence of interactions with parallel metadata columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSeq {
    pub items:        Vec<String>,
    pub titles:       Vec<String>,
    pub descriptions: Vec<String>,
    pub categories:   Vec<Vec<String>>,
    pub prices:       Vec<String>,
    pub imurls:       Vec<String>,
    pub brands:       Vec<String>,
}

impl RecordSeq {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one interaction at the end (chronologically latest).
    pub fn push(&mut self, item: impl Into<String>, meta: ItemMetadata) {
        self.items.push(item.into());
        self.titles.push(meta.title);
        self.descriptions.push(meta.description);
        self.categories.push(meta.categories);
        self.prices.push(meta.price);
        self.imurls.push(meta.imurl);
        self.brands.push(meta.brand);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copy out `range` from every column.
    ///
    /// # Panics
    /// Panics if the range is out of bounds, like slice indexing.
    pub fn slice(&self, range: Range<usize>) -> RecordSeq {
        RecordSeq {
            items:        self.items[range.clone()].to_vec(),
            titles:       self.titles[range.clone()].to_vec(),
            descriptions: self.descriptions[range.clone()].to_vec(),
            categories:   self.categories[range.clone()].to_vec(),
            prices:       self.prices[range.clone()].to_vec(),
            imurls:       self.imurls[range.clone()].to_vec(),
            brands:       self.brands[range].to_vec(),
        }
    }

    /// The first `n` records (all of them if `n > len`).
    pub fn prefix(&self, n: usize) -> RecordSeq {
        self.slice(0..n.min(self.len()))
    }

    /// Reassemble the record at `index`.
    pub fn record(&self, index: usize) -> Option<InteractionRecord> {
        let item = self.items.get(index)?;
        Some(InteractionRecord {
            item: item.clone(),
            meta: ItemMetadata {
                title:       self.titles[index].clone(),
                description: self.descriptions[index].clone(),
                categories:  self.categories[index].clone(),
                price:       self.prices[index].clone(),
                imurl:       self.imurls[index].clone(),
                brand:       self.brands[index].clone(),
            },
        })
    }

    /// True when every column has the same length as `items`.
    pub fn is_aligned(&self) -> bool {
        let n = self.items.len();
        self.titles.len() == n
            && self.descriptions.len() == n
            && self.categories.len() == n
            && self.prices.len() == n
            && self.imurls.len() == n
            && self.brands.len() == n
    }
}

impl FromIterator<InteractionRecord> for RecordSeq {
    fn from_iter<I: IntoIterator<Item = InteractionRecord>>(iter: I) -> Self {
        let mut seq = RecordSeq::new();
        for record in iter {
            seq.push(record.item, record.meta);
        }
        seq
    }
}
