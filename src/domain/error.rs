// ============================================================
// Layer 3 — Domain Errors
// ============================================================
// Errors raised by the core pipeline (split, sample, render).
// None of them is retried: the caller decides whether to skip
// the offending user or abort the run.
//
// Metadata misses are deliberately absent from this list —
// they are defaulted, not reported.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecError {
    /// A user has fewer records than a split or sample needs.
    #[error("user '{user}' has {found} interaction(s), at least {required} are needed")]
    InsufficientHistory {
        user:     String,
        found:    usize,
        required: usize,
    },

    /// A render call is missing a field its task requires.
    #[error("{field} is needed for task {task}!")]
    MissingArgument {
        field: &'static str,
        task:  &'static str,
    },

    /// A task alias that is not in the registry.
    #[error("task alias '{alias}' does not exist! Available tasks are {available:?}")]
    UnknownTask {
        alias:     String,
        available: Vec<&'static str>,
    },

    /// A forced template id that the task does not define.
    #[error("prompt template id {id} not found for task {task}! Available prompt ids are {available:?}")]
    UnknownTemplate {
        id:        usize,
        task:      &'static str,
        available: Vec<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let e = RecError::MissingArgument { field: "target_item", task: "SequentialTask" };
        assert_eq!(e.to_string(), "target_item is needed for task SequentialTask!");

        let e = RecError::UnknownTemplate { id: 9, task: "SequentialTask", available: vec![0, 1] };
        assert!(e.to_string().contains("[0, 1]"));
    }
}
