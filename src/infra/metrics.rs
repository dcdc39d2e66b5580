// ============================================================
// Layer 6 — Training Metrics Logger
// ============================================================
// Appends one CSV row per epoch so training curves can be
// plotted after the run:
//
//   epoch,train_loss,val_loss,val_hit,val_ndcg,val_mrr
//   1,7.912345,7.801234,0.012000,0.006100,0.009800
//   ...
//
// Validation columns are NaN when the run has no validation
// partition (monitor metric "no" or merged train/val).

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::infra::ranking::MonitorMetric;

const CSV_HEADER: &str = "epoch,train_loss,val_loss,val_hit,val_ndcg,val_mrr";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    pub val_loss:   f64,
    pub val_hit:    f64,
    pub val_ndcg:   f64,
    pub val_mrr:    f64,
}

impl EpochMetrics {
    pub fn train_only(epoch: usize, train_loss: f64) -> Self {
        Self {
            epoch,
            train_loss,
            val_loss: f64::NAN,
            val_hit:  f64::NAN,
            val_ndcg: f64::NAN,
            val_mrr:  f64::NAN,
        }
    }

    /// Value of the monitored metric for this epoch.
    pub fn monitored(&self, metric: MonitorMetric) -> f64 {
        match metric {
            MonitorMetric::No      => self.train_loss,
            MonitorMetric::Loss    => self.val_loss,
            MonitorMetric::Hit(_)  => self.val_hit,
            MonitorMetric::Ndcg(_) => self.val_ndcg,
        }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh metrics.csv in `dir`, replacing any previous run's file.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{CSV_HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.val_loss, m.val_hit, m.val_ndcg, m.val_mrr,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
