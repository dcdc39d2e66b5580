// ============================================================
// Layer 6 — Ranking Metrics
// ============================================================
// Pure functions over model scores and ranked item lists:
//
//   rank_of          1-based rank of the target label
//   top_k_indices    best k labels, best first
//   hit_at_k         share of targets ranked within k
//   ndcg_at_k        mean 1 / log2(rank + 1) for ranks ≤ k
//   mrr              mean 1 / rank
//   long_tail_coverage
//                    share of long-tail items that appear in
//                    at least one recommendation list
//
// MonitorMetric picks which of these decides whether a new
// checkpoint is better than the best one so far.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};

use crate::data::store::ItemPopularity;

/// 1-based rank of `target` in `scores`. Ties rank the target first.
pub fn rank_of(scores: &[f32], target: usize) -> usize {
    let Some(&score) = scores.get(target) else {
        return scores.len() + 1;
    };
    1 + scores.iter().filter(|&&s| s > score).count()
}

/// Indices of the `k` highest scores, best first.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..scores.len()).collect();
    idx.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    idx.truncate(k);
    idx
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 { 0.0 } else { values.sum::<f64>() / n as f64 }
}

pub fn hit_at_k(ranks: &[usize], k: usize) -> f64 {
    mean(ranks.iter().map(|&r| if r <= k { 1.0 } else { 0.0 }), ranks.len())
}

pub fn ndcg_at_k(ranks: &[usize], k: usize) -> f64 {
    mean(
        ranks
            .iter()
            .map(|&r| if r <= k { 1.0 / ((r + 1) as f64).log2() } else { 0.0 }),
        ranks.len(),
    )
}

pub fn mrr(ranks: &[usize]) -> f64 {
    mean(ranks.iter().map(|&r| 1.0 / r.max(1) as f64), ranks.len())
}

/// Linear-interpolated percentile of `values` (0–100).
fn percentile(values: &[usize], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let pos  = pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let low  = pos.floor() as usize;
    let high = pos.ceil() as usize;
    sorted[low] + (sorted[high] - sorted[low]) * (pos - low as f64)
}

/// Items whose popularity count is at or below the `pct` percentile.
pub fn long_tail_items(popularity: &ItemPopularity, pct: f64) -> HashSet<&str> {
    let counts: Vec<usize> = popularity.counts().iter().map(|(_, c)| *c).collect();
    let cutoff = percentile(&counts, pct);
    popularity
        .counts()
        .iter()
        .filter(|(_, c)| *c as f64 <= cutoff)
        .map(|(item, _)| item.as_str())
        .collect()
}

/// Share of long-tail items recommended at least once.
pub fn long_tail_coverage<S: AsRef<str>>(
    recommended: &[Vec<S>],
    popularity:  &ItemPopularity,
    pct:         f64,
) -> f64 {
    let tail = long_tail_items(popularity, pct);
    if tail.is_empty() {
        return 0.0;
    }
    let hit: HashSet<&str> = recommended
        .iter()
        .flatten()
        .map(AsRef::as_ref)
        .filter(|item| tail.contains(item))
        .collect();
    hit.len() as f64 / tail.len() as f64
}

// ─── Monitor Metric ───────────────────────────────────────────────────────────

/// What decides whether an epoch's checkpoint is kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorMetric {
    /// No validation; the last epoch is saved
    No,
    /// Validation loss, lower is better
    Loss,
    /// Hit rate at k, higher is better
    Hit(usize),
    /// NDCG at k, higher is better
    Ndcg(usize),
}

impl MonitorMetric {
    pub fn needs_validation(&self) -> bool {
        !matches!(self, MonitorMetric::No)
    }

    /// The starting "best" value that any real result beats.
    pub fn worst(&self) -> f64 {
        match self {
            MonitorMetric::Loss => f64::INFINITY,
            _                   => f64::NEG_INFINITY,
        }
    }

    pub fn is_improvement(&self, value: f64, best: f64) -> bool {
        match self {
            MonitorMetric::No   => true,
            MonitorMetric::Loss => value < best,
            _                   => value > best,
        }
    }

    /// Cut-off the metric is computed at, if any.
    pub fn k(&self) -> Option<usize> {
        match self {
            MonitorMetric::Hit(k) | MonitorMetric::Ndcg(k) => Some(*k),
            _ => None,
        }
    }
}

impl FromStr for MonitorMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "no"   => return Ok(MonitorMetric::No),
            "loss" => return Ok(MonitorMetric::Loss),
            _ => {}
        }
        let Some((name, k)) = s.split_once('@') else {
            bail!("Unknown monitor metric '{s}'. Use 'loss', 'no', 'hit@k' or 'ndcg@k'");
        };
        let k: usize = k
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid cut-off in monitor metric '{s}'"))?;
        if k == 0 {
            bail!("Monitor metric cut-off must be at least 1");
        }
        match name {
            "hit"  => Ok(MonitorMetric::Hit(k)),
            "ndcg" => Ok(MonitorMetric::Ndcg(k)),
            _      => bail!("Unknown monitor metric '{s}'. Use 'loss', 'no', 'hit@k' or 'ndcg@k'"),
        }
    }
}

impl fmt::Display for MonitorMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorMetric::No      => write!(f, "no"),
            MonitorMetric::Loss    => write!(f, "loss"),
            MonitorMetric::Hit(k)  => write!(f, "hit@{k}"),
            MonitorMetric::Ndcg(k) => write!(f, "ndcg@{k}"),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::SequenceStore;
    use crate::domain::raw::DataMaps;
    use std::collections::HashMap;

    #[test]
    fn test_rank_and_top_k() {
        let scores = [0.1, 0.9, 0.5, 0.9];
        assert_eq!(rank_of(&scores, 1), 1);
        assert_eq!(rank_of(&scores, 2), 3);
        assert_eq!(rank_of(&scores, 0), 4);
        assert_eq!(rank_of(&scores, 7), 5);
        assert_eq!(top_k_indices(&scores, 3), vec![1, 3, 2]);
    }

    #[test]
    fn test_hit_ndcg_mrr() {
        let ranks = [1, 2, 11];
        assert!((hit_at_k(&ranks, 10) - 2.0 / 3.0).abs() < 1e-9);
        let expected_ndcg = (1.0 + 1.0 / 3f64.log2()) / 3.0;
        assert!((ndcg_at_k(&ranks, 10) - expected_ndcg).abs() < 1e-9);
        let expected_mrr = (1.0 + 0.5 + 1.0 / 11.0) / 3.0;
        assert!((mrr(&ranks) - expected_mrr).abs() < 1e-9);
        assert_eq!(hit_at_k(&[], 5), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        assert_eq!(percentile(&[1, 2, 3, 4, 5], 50.0), 3.0);
        assert!((percentile(&[1, 2, 3, 4], 20.0) - 1.6).abs() < 1e-9);
        assert_eq!(percentile(&[], 20.0), 0.0);
    }

    #[test]
    fn test_long_tail_coverage() {
        // counts: a=3, b=1, c=1, d=2
        let logs = vec![
            ("u1".to_string(), vec!["a".into(), "b".into(), "a".into()]),
            ("u2".to_string(), vec!["a".into(), "c".into(), "d".into(), "d".into()]),
        ];
        let opts = crate::data::store::StoreOptions { integer_ids: true, ..Default::default() };
        let (_, pop) = SequenceStore::build(&logs, &HashMap::new(), &DataMaps::default(), &opts);
        let tail = long_tail_items(&pop, 20.0);
        assert_eq!(tail, HashSet::from(["b", "c"]));

        let recs = vec![vec!["a", "b"], vec!["a", "d"]];
        assert!((long_tail_coverage(&recs, &pop, 20.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_monitor_metric_parse() {
        assert_eq!("loss".parse::<MonitorMetric>().unwrap(), MonitorMetric::Loss);
        assert_eq!("NDCG@10".parse::<MonitorMetric>().unwrap(), MonitorMetric::Ndcg(10));
        assert_eq!("hit@5".parse::<MonitorMetric>().unwrap(), MonitorMetric::Hit(5));
        assert_eq!("no".parse::<MonitorMetric>().unwrap(), MonitorMetric::No);
        assert!("map@5".parse::<MonitorMetric>().is_err());
        assert!("hit@0".parse::<MonitorMetric>().is_err());
        assert!("hit".parse::<MonitorMetric>().is_err());
        assert_eq!(MonitorMetric::Ndcg(10).to_string(), "ndcg@10");
    }

    #[test]
    fn test_is_improvement_direction() {
        let loss = MonitorMetric::Loss;
        assert!(loss.is_improvement(1.0, loss.worst()));
        assert!(!loss.is_improvement(2.0, 1.0));
        let hit = MonitorMetric::Hit(10);
        assert!(hit.is_improvement(0.0, hit.worst()));
        assert!(hit.is_improvement(0.3, 0.2));
        assert!(!hit.is_improvement(0.2, 0.2));
    }
}
