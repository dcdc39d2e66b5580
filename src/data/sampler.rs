// ============================================================
// Layer 4 — Stochastic Sub-sequence Sampler
// ============================================================
// Every epoch each user's train pool is cut into a fresh
// (input window, target) pair, a form of online augmentation:
//
//   pool:    [a b c d e f]          L = 6
//   window:  w ~ U[2, L-1]          e.g. w = 3
//   start:   s ~ U[0, L-w-1]        e.g. s = 1
//   input:   [b c d]                pool[s .. s+w]
//   target:  e                      pool[s+w]
//
// The target is always the record right after the window,
// never a later one. A pool of exactly two records has only
// one valid cut ([a] → b); pools shorter than two cannot be
// sampled at all.
//
// Only the train pool is ever sampled; validation and test
// examples are fixed by the splitter.

use rand::Rng;

use crate::data::splitter::TrainRow;
use crate::domain::error::RecError;
use crate::domain::example::SequenceExample;
use crate::domain::record::RecordSeq;

/// Draw one (input window, target) pair from a user's train pool.
///
/// # Errors
/// `InsufficientHistory` when the pool has fewer than 2 records.
pub fn sample_train_sequence<R: Rng + ?Sized>(
    user_id: &str,
    pool:    &RecordSeq,
    rng:     &mut R,
) -> Result<SequenceExample, RecError> {
    let len = pool.len();
    let insufficient = || RecError::InsufficientHistory {
        user:     user_id.to_string(),
        found:    len,
        required: 2,
    };
    if len < 2 {
        return Err(insufficient());
    }

    // Two records leave no choice; otherwise give the model at
    // least two context items.
    let min_window = if len == 2 { 1 } else { 2 };

    let window = rng.gen_range(min_window..=len - 1);
    let start  = rng.gen_range(0..=len - window - 1);
    let end    = start + window;

    let target = pool.record(end).ok_or_else(insufficient)?;

    Ok(SequenceExample {
        user_id: user_id.to_string(),
        input:   pool.slice(start..end),
        target,
    })
}

/// Re-samples the whole train pool, one example per user.
pub struct TrainSampler<'a> {
    pool: &'a [TrainRow],
}

impl<'a> TrainSampler<'a> {
    pub fn new(pool: &'a [TrainRow]) -> Self {
        Self { pool }
    }

    pub fn num_users(&self) -> usize {
        self.pool.len()
    }

    /// Sample one example per user, in pool order.
    ///
    /// Users whose pool is too short are skipped and returned
    /// separately so the caller can decide what to do with them.
    pub fn sample_epoch<R: Rng + ?Sized>(&self, rng: &mut R) -> (Vec<SequenceExample>, Vec<RecError>) {
        let mut examples = Vec::with_capacity(self.pool.len());
        let mut skipped  = Vec::new();

        for row in self.pool {
            match sample_train_sequence(&row.user_id, &row.sequence, rng) {
                Ok(ex)  => examples.push(ex),
                Err(e)  => skipped.push(e),
            }
        }

        tracing::debug!("Sampled {} train examples, skipped {}", examples.len(), skipped.len());
        (examples, skipped)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::ItemMetadata;
    use rand::{rngs::StdRng, SeedableRng};

    fn pool(n: usize) -> RecordSeq {
        let mut seq = RecordSeq::new();
        for i in 0..n {
            seq.push(
                format!("i{i}"),
                ItemMetadata {
                    title:      format!("title{i}"),
                    price:      format!("{i}.00"),
                    categories: vec![format!("cat{i}")],
                    ..Default::default()
                },
            );
        }
        seq
    }

    fn index_of(item: &str) -> usize {
        item[1..].parse().unwrap()
    }

    #[test]
    fn test_three_items_has_single_outcome() {
        let mut seq = RecordSeq::new();
        for item in ["A", "B", "C"] {
            seq.push(item, ItemMetadata::default());
        }
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ex = sample_train_sequence("u1", &seq, &mut rng).unwrap();
            assert_eq!(ex.input.items, vec!["A", "B"]);
            assert_eq!(ex.target.item, "C");
        }
    }

    #[test]
    fn test_two_items_uses_window_of_one() {
        let mut rng = StdRng::seed_from_u64(3);
        let ex = sample_train_sequence("u", &pool(2), &mut rng).unwrap();
        assert_eq!(ex.input.items, vec!["i0"]);
        assert_eq!(ex.target.item, "i1");
    }

    #[test]
    fn test_too_short_pool_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        for n in 0..2 {
            let err = sample_train_sequence("u2", &pool(n), &mut rng).unwrap_err();
            assert_eq!(err, RecError::InsufficientHistory { user: "u2".into(), found: n, required: 2 });
        }
    }

    #[test]
    fn test_window_bounds_and_adjacency() {
        let mut rng = StdRng::seed_from_u64(42);
        for len in 3..12 {
            let p = pool(len);
            for _ in 0..200 {
                let ex = sample_train_sequence("u", &p, &mut rng).unwrap();
                let w = ex.input.len();
                assert!((2..=len - 1).contains(&w), "window {w} out of bounds for L={len}");

                let start = index_of(&ex.input.items[0]);
                let target = index_of(&ex.target.item);
                assert_eq!(target, start + w);
                assert!(target < len);

                // contiguous window
                for (k, item) in ex.input.items.iter().enumerate() {
                    assert_eq!(index_of(item), start + k);
                }
            }
        }
    }

    #[test]
    fn test_fields_stay_aligned() {
        let mut rng = StdRng::seed_from_u64(7);
        let p = pool(9);
        for _ in 0..100 {
            let ex = sample_train_sequence("u", &p, &mut rng).unwrap();
            assert!(ex.input.is_aligned());
            for (k, item) in ex.input.items.iter().enumerate() {
                let i = index_of(item);
                assert_eq!(ex.input.titles[k], format!("title{i}"));
                assert_eq!(ex.input.prices[k], format!("{i}.00"));
                assert_eq!(ex.input.categories[k], vec![format!("cat{i}")]);
            }
            let t = index_of(&ex.target.item);
            assert_eq!(ex.target.meta.title, format!("title{t}"));
        }
    }

    #[test]
    fn test_every_window_is_reachable() {
        let mut rng = StdRng::seed_from_u64(11);
        let p = pool(5);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..2000 {
            let ex = sample_train_sequence("u", &p, &mut rng).unwrap();
            seen.insert((index_of(&ex.input.items[0]), ex.input.len()));
        }
        // L=5: w=2 → 3 starts, w=3 → 2 starts, w=4 → 1 start
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_same_seed_same_sample() {
        let p = pool(10);
        let a = sample_train_sequence("u", &p, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = sample_train_sequence("u", &p, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_epoch_skips_short_pools() {
        let rows = vec![
            TrainRow { user_id: "long".into(), sequence: pool(6) },
            TrainRow { user_id: "short".into(), sequence: pool(1) },
        ];
        let sampler = TrainSampler::new(&rows);
        let (examples, skipped) = sampler.sample_epoch(&mut StdRng::seed_from_u64(1));
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].user_id, "long");
        assert_eq!(skipped.len(), 1);
    }
}
