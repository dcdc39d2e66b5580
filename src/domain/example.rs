// ============================================================
// Layer 3 — Examples and Prompt Arguments
// ============================================================
// SequenceExample is the unit that flows from the splitter and
// the sampler into the template engine:
//
//   input:  a contiguous run of the user's records
//   target: the record that immediately follows it
//
// Templates do not consume SequenceExample directly. They take
// PromptArgs, where every field is optional, so each task can
// check for exactly the fields it needs and report the first
// missing one by name.

use serde::{Deserialize, Serialize};

use crate::domain::record::{InteractionRecord, RecordSeq};

/// An (input subsequence, target item) pair for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceExample {
    pub user_id: String,
    pub input:   RecordSeq,
    pub target:  InteractionRecord,
}

/// Named fields a task can require from an example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptField {
    UserId,
    InputItemSeq,
    InputTitleSeq,
    InputCategoriesSeq,
    TargetItem,
}

impl PromptField {
    pub fn name(self) -> &'static str {
        match self {
            PromptField::UserId             => "user_id",
            PromptField::InputItemSeq       => "input_item_seq",
            PromptField::InputTitleSeq      => "input_title_seq",
            PromptField::InputCategoriesSeq => "input_categories_seq",
            PromptField::TargetItem         => "target_item",
        }
    }
}

/// Keyword arguments for a single render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptArgs {
    pub user_id:              Option<String>,
    pub input_item_seq:       Option<Vec<String>>,
    pub input_title_seq:      Option<Vec<String>>,
    pub input_categories_seq: Option<Vec<Vec<String>>>,
    pub target_item:          Option<String>,
}

impl PromptArgs {
    pub fn has(&self, field: PromptField) -> bool {
        match field {
            PromptField::UserId             => self.user_id.is_some(),
            PromptField::InputItemSeq       => self.input_item_seq.is_some(),
            PromptField::InputTitleSeq      => self.input_title_seq.is_some(),
            PromptField::InputCategoriesSeq => self.input_categories_seq.is_some(),
            PromptField::TargetItem         => self.target_item.is_some(),
        }
    }

    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or_default()
    }

    pub fn items(&self) -> &[String] {
        self.input_item_seq.as_deref().unwrap_or_default()
    }

    pub fn titles(&self) -> &[String] {
        self.input_title_seq.as_deref().unwrap_or_default()
    }

    pub fn categories(&self) -> &[Vec<String>] {
        self.input_categories_seq.as_deref().unwrap_or_default()
    }

    pub fn target_item(&self) -> &str {
        self.target_item.as_deref().unwrap_or_default()
    }
}

impl From<&SequenceExample> for PromptArgs {
    fn from(ex: &SequenceExample) -> Self {
        Self {
            user_id:              Some(ex.user_id.clone()),
            input_item_seq:       Some(ex.input.items.clone()),
            input_title_seq:      Some(ex.input.titles.clone()),
            input_categories_seq: Some(ex.input.categories.clone()),
            target_item:          Some(ex.target.item.clone()),
        }
    }
}
