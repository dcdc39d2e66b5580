// ============================================================
// Layer 3 — Prompt Pair
// ============================================================
// The (input_text, target_text) strings one render produces.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The (input_text, target_text) pair fed to the model for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTarget {
    pub input_text:  String,
    pub target_text: String,
}

impl PromptTarget {
    pub fn new(input_text: impl Into<String>, target_text: impl Into<String>) -> Self {
        Self {
            input_text:  input_text.into(),
            target_text: target_text.into(),
        }
    }

    pub fn into_pair(self) -> (String, String) {
        (self.input_text, self.target_text)
    }
}

impl fmt::Display for PromptTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:#^50}", " Input ")?;
        writeln!(f, "{}", self.input_text)?;
        writeln!(f, "{:#^50}", " Target ")?;
        write!(f, "{}", self.target_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_has_banners() {
        let p = PromptTarget::new("in", "out");
        let s = p.to_string();
        let first = s.lines().next().unwrap();
        assert_eq!(first.len(), 50);
        assert!(first.contains(" Input "));
        assert!(s.ends_with("out"));
    }
}
