// ============================================================
// Layer 4 — Leave-One-Out Splitter
// ============================================================
// Splits every user's history into three partitions, using
// only that user's own records:
//
//   sequence:     [1 2 3 4 5 6 7 8]
//   train pool:   [1 2 3 4 5 6]          (re-sampled every epoch)
//   validation:   [1 2 3 4 5 6] → 7
//   test:         [1 2 3 4 5 6 7] → 8
//
// A user with exactly two records keeps one record in the
// train pool:
//
//   sequence:     [X Y]
//   train pool:   [X]
//   validation:   [] → X
//   test:         [X] → Y
//
// This is a per-user protocol, not a global random split, so
// every user is present in all three partitions and no val /
// test target is ever a training target.
//
// The split is fully deterministic: no shuffling, no sorting.

use serde::{Deserialize, Serialize};

use crate::data::store::SequenceStore;
use crate::domain::error::RecError;
use crate::domain::example::SequenceExample;
use crate::domain::record::RecordSeq;

/// Minimum history length a user needs to be split.
pub const MIN_SPLIT_HISTORY: usize = 2;

/// One user's train pool, before any sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRow {
    pub user_id:  String,
    pub sequence: RecordSeq,
}

/// The three per-user partitions, in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPartitions {
    pub train:      Vec<TrainRow>,
    pub validation: Vec<SequenceExample>,
    pub test:       Vec<SequenceExample>,
}

/// Split every user of `store` leave-one-out style.
///
/// # Errors
/// `InsufficientHistory` for the first user with fewer than
/// two records.
pub fn split_leave_one_out(store: &SequenceStore) -> Result<SplitPartitions, RecError> {
    let mut parts = SplitPartitions {
        train:      Vec::with_capacity(store.len()),
        validation: Vec::with_capacity(store.len()),
        test:       Vec::with_capacity(store.len()),
    };

    for user in store.users() {
        let records = &user.records;
        let n = records.len();
        let insufficient = || RecError::InsufficientHistory {
            user:     user.user_id.clone(),
            found:    n,
            required: MIN_SPLIT_HISTORY,
        };
        if n < MIN_SPLIT_HISTORY {
            return Err(insufficient());
        }
        let (Some(val_target), Some(test_target)) = (records.record(n - 2), records.record(n - 1)) else {
            return Err(insufficient());
        };

        let train_len = if n == 2 { 1 } else { n - 2 };

        parts.train.push(TrainRow {
            user_id:  user.user_id.clone(),
            sequence: records.prefix(train_len),
        });
        parts.validation.push(SequenceExample {
            user_id: user.user_id.clone(),
            input:   records.prefix(n - 2),
            target:  val_target,
        });
        parts.test.push(SequenceExample {
            user_id: user.user_id.clone(),
            input:   records.prefix(n - 1),
            target:  test_target,
        });
    }

    tracing::debug!(
        "Leave-one-out split: {} train users, {} validation, {} test",
        parts.train.len(),
        parts.validation.len(),
        parts.test.len(),
    );

    Ok(parts)
}

/// Train pool used when validation is merged into training:
/// only the last record of each user stays unseen.
pub fn merged_train_pool(store: &SequenceStore) -> Vec<TrainRow> {
    store
        .users()
        .iter()
        .map(|u| TrainRow {
            user_id:  u.user_id.clone(),
            sequence: u.records.prefix(u.records.len().saturating_sub(1)),
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::UserSequence;
    use crate::domain::record::ItemMetadata;

    fn user(id: &str, items: &[&str]) -> UserSequence {
        let mut records = RecordSeq::new();
        for item in items {
            records.push(*item, ItemMetadata { title: format!("t-{item}"), ..Default::default() });
        }
        UserSequence { user_id: id.to_string(), records }
    }

    fn store(users: Vec<UserSequence>) -> SequenceStore {
        SequenceStore::from_sequences(users)
    }

    #[test]
    fn test_five_item_user() {
        let parts = split_leave_one_out(&store(vec![user("u1", &["A", "B", "C", "D", "E"])])).unwrap();

        assert_eq!(parts.train[0].sequence.items, vec!["A", "B", "C"]);
        assert_eq!(parts.validation[0].input.items, vec!["A", "B", "C"]);
        assert_eq!(parts.validation[0].target.item, "D");
        assert_eq!(parts.test[0].input.items, vec!["A", "B", "C", "D"]);
        assert_eq!(parts.test[0].target.item, "E");
        assert_eq!(parts.test[0].target.meta.title, "t-E");
    }

    #[test]
    fn test_two_item_user_uses_last_one_rule() {
        let parts = split_leave_one_out(&store(vec![user("u2", &["X", "Y"])])).unwrap();

        assert_eq!(parts.train[0].sequence.items, vec!["X"]);
        assert!(parts.validation[0].input.is_empty());
        assert_eq!(parts.validation[0].target.item, "X");
        assert_eq!(parts.test[0].input.items, vec!["X"]);
        assert_eq!(parts.test[0].target.item, "Y");
    }

    #[test]
    fn test_short_history_is_an_error() {
        let err = split_leave_one_out(&store(vec![user("ok", &["A", "B", "C"]), user("short", &["A"])])).unwrap_err();
        assert_eq!(
            err,
            RecError::InsufficientHistory { user: "short".into(), found: 1, required: 2 }
        );
    }

    #[test]
    fn test_split_reconstructs_sequence() {
        let users: Vec<UserSequence> = (2..9)
            .map(|n| {
                let items: Vec<String> = (0..n).map(|i| format!("i{i}")).collect();
                let refs: Vec<&str> = items.iter().map(String::as_str).collect();
                user(&format!("u{n}"), &refs)
            })
            .collect();
        let original: Vec<Vec<String>> = users.iter().map(|u| u.records.items.clone()).collect();
        let parts = split_leave_one_out(&store(users)).unwrap();

        for (i, items) in original.iter().enumerate() {
            let n = items.len();
            let val = &parts.validation[i];
            let test = &parts.test[i];

            // val input + val target + test target == full sequence
            let mut rebuilt = val.input.items.clone();
            rebuilt.push(val.target.item.clone());
            rebuilt.push(test.target.item.clone());
            assert_eq!(&rebuilt, items);

            assert_eq!(val.target.item, items[n - 2]);
            assert_eq!(test.target.item, items[n - 1]);
            assert_ne!(val.target.item, test.target.item);
            assert_eq!(test.input.items, items[..n - 1].to_vec());

            let expected_train = if n == 2 { 1 } else { n - 2 };
            assert_eq!(parts.train[i].sequence.items, items[..expected_train].to_vec());
            assert!(!parts.train[i].sequence.items.contains(&test.target.item));
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let s = store(vec![user("a", &["1", "2", "3", "4"]), user("b", &["5", "6"])]);
        assert_eq!(split_leave_one_out(&s).unwrap(), split_leave_one_out(&s).unwrap());
    }

    #[test]
    fn test_merged_train_pool_hides_only_last() {
        let s = store(vec![user("a", &["1", "2", "3", "4"])]);
        let pool = merged_train_pool(&s);
        assert_eq!(pool[0].sequence.items, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_empty_store() {
        let parts = split_leave_one_out(&SequenceStore::default()).unwrap();
        assert!(parts.train.is_empty());
        assert!(parts.test.is_empty());
    }
}
