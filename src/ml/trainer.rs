// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
// Every epoch builds a NEW training set:
//
//   train pool ──TrainSampler──► one (window, target) per user
//              ──TaskSet───────► one prompt per training task
//              ──PromptEncoder─► PromptSamples
//              ──DataLoader────► shuffled with seed + epoch
//
// Validation is fixed: the validation partition rendered once
// with the eval task pinned to one template.
//
// Key Burn insight:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on MyInnerBackend (Wgpu)
//   - the validation batcher must also use MyInnerBackend
//
// A checkpoint is written whenever the monitored metric
// improves; without validation only the last epoch is saved.

use std::time::{Duration, Instant};

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{PromptBatch, PromptBatcher},
    dataset::{PromptDataset, PromptSample},
    preprocessor::PromptEncoder,
    sampler::TrainSampler,
    splitter::TrainRow,
    templates::TaskSet,
};
use crate::domain::example::PromptArgs;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
    ranking::{hit_at_k, mrr, ndcg_at_k, rank_of, top_k_indices, MonitorMetric},
};
use crate::ml::model::{PromptRecConfig, PromptRecModel};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

/// Everything the loop needs besides the hyperparameters.
pub struct TrainingPlan<'a> {
    pub model_cfg:  PromptRecConfig,
    pub train_pool: &'a [TrainRow],
    pub tasks:      &'a TaskSet,
    pub encoder:    &'a PromptEncoder,
    /// Pre-encoded validation prompts; `None` disables validation
    pub validation: Option<PromptDataset>,
}

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub best_epoch: Option<usize>,
    pub best_value: f64,
    pub elapsed:    Duration,
}

/// Loss and ranking metrics over one evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct EvalSummary {
    pub loss:  f64,
    pub hit:   f64,
    pub ndcg:  f64,
    pub mrr:   f64,
    pub count: usize,
    /// 1-based rank of each target
    pub ranks: Vec<usize>,
    /// Best `k` labels per example
    pub top_k: Vec<Vec<usize>>,
}

pub fn run_training(
    cfg:          &TrainConfig,
    plan:         TrainingPlan<'_>,
    ckpt_manager: &CheckpointManager,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop(cfg, plan, ckpt_manager, device)
}

/// Sample, render and encode one epoch of training prompts.
pub fn build_epoch_samples<R: Rng + ?Sized>(
    sampler: &TrainSampler<'_>,
    tasks:   &TaskSet,
    encoder: &PromptEncoder,
    rng:     &mut R,
) -> Result<(Vec<PromptSample>, usize)> {
    let (examples, skipped) = sampler.sample_epoch(rng);
    let mut samples = Vec::with_capacity(examples.len() * tasks.len());

    for example in &examples {
        let args = PromptArgs::from(example);
        for pair in tasks.render_all(&args, rng)? {
            samples.push(encoder.encode(&example.user_id, &pair)?);
        }
    }
    Ok((samples, skipped.len()))
}

/// Run `model` over `batches` and score every example.
pub fn evaluate<B: Backend>(
    model:   &PromptRecModel<B>,
    batches: impl IntoIterator<Item = PromptBatch<B>>,
    k:       usize,
) -> Result<EvalSummary> {
    let mut loss_sum = 0.0f64;
    let mut num_batches = 0usize;
    let mut ranks = Vec::new();
    let mut top_k = Vec::new();

    for batch in batches {
        let (loss, logits) = model.forward_loss(
            batch.input_ids,
            batch.attention_mask,
            batch.user_ids,
            batch.labels,
        );
        loss_sum += loss.into_scalar().elem::<f64>();
        num_batches += 1;

        let [_, num_items] = logits.dims();
        let scores = logits
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read logits: {e:?}"))?;

        for (row, &label) in batch.label_ids.iter().enumerate() {
            let row_scores = &scores[row * num_items..(row + 1) * num_items];
            ranks.push(rank_of(row_scores, label));
            top_k.push(top_k_indices(row_scores, k));
        }
    }

    Ok(EvalSummary {
        loss:  if num_batches > 0 { loss_sum / num_batches as f64 } else { f64::NAN },
        hit:   hit_at_k(&ranks, k),
        ndcg:  ndcg_at_k(&ranks, k),
        mrr:   mrr(&ranks),
        count: ranks.len(),
        ranks,
        top_k,
    })
}

fn train_loop(
    cfg:          &TrainConfig,
    plan:         TrainingPlan<'_>,
    ckpt_manager: &CheckpointManager,
    device:       burn::backend::wgpu::WgpuDevice,
) -> Result<TrainSummary> {
    let started = Instant::now();
    let mut monitor: MonitorMetric = cfg.monitor_metric.parse()?;
    let k = monitor.k().unwrap_or(cfg.top_k);

    let validation = plan.validation.filter(|v| v.sample_count() > 0);
    if monitor.needs_validation() && validation.is_none() {
        tracing::warn!("Monitor metric '{}' needs validation data; saving the last epoch instead", monitor);
        monitor = MonitorMetric::No;
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: PromptRecModel<MyBackend> = plan.model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} layers, d_model={}, {} items, personalized={}",
        plan.model_cfg.num_layers,
        plan.model_cfg.d_model,
        plan.model_cfg.num_items,
        plan.model_cfg.personalized,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let optim_cfg = AdamConfig::new().with_epsilon(1e-8);
    let mut optim = optim_cfg.init();

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_loader = validation.map(|dataset| {
        DataLoaderBuilder::new(PromptBatcher::<MyInnerBackend>::new(device.clone()))
            .batch_size(cfg.eval_batch_size)
            .num_workers(1)
            .build(dataset)
    });

    let train_batcher = PromptBatcher::<MyBackend>::new(device.clone());
    let sampler = TrainSampler::new(plan.train_pool);
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let logger  = MetricsLogger::new(ckpt_manager.dir())?;

    let mut best_value = monitor.worst();
    let mut best_epoch = None;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let (samples, skipped) = build_epoch_samples(&sampler, plan.tasks, plan.encoder, &mut rng)?;
        if epoch == 1 && skipped > 0 {
            tracing::warn!("{} users have a train pool too short to sample; they only appear in val/test", skipped);
        }
        tracing::debug!("Epoch {}: {} training prompts", epoch, samples.len());

        let train_loader = DataLoaderBuilder::new(train_batcher.clone())
            .batch_size(cfg.batch_size)
            .shuffle(cfg.seed.wrapping_add(epoch as u64))
            .num_workers(1)
            .build(PromptDataset::new(samples));

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(
                batch.input_ids,
                batch.attention_mask,
                batch.user_ids,
                batch.labels,
            );

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let metrics = match &val_loader {
            Some(loader) => {
                let model_valid = model.valid();
                let eval = evaluate(&model_valid, loader.iter(), k)?;
                EpochMetrics {
                    epoch,
                    train_loss: avg_train_loss,
                    val_loss:   eval.loss,
                    val_hit:    eval.hit,
                    val_ndcg:   eval.ndcg,
                    val_mrr:    eval.mrr,
                }
            }
            None => EpochMetrics::train_only(epoch, avg_train_loss),
        };
        logger.log(&metrics)?;

        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | hit@{k}={:.4} | ndcg@{k}={:.4}",
            epoch, cfg.epochs, metrics.train_loss, metrics.val_loss, metrics.val_hit, metrics.val_ndcg,
        );

        let value = metrics.monitored(monitor);
        let should_save = match monitor {
            MonitorMetric::No => epoch == cfg.epochs,
            _ => monitor.is_improvement(value, best_value),
        };
        if should_save {
            ckpt_manager.save_model(&model, epoch)?;
            best_value = value;
            best_epoch = Some(epoch);
            if monitor.needs_validation() {
                tracing::info!("Validation {} improved to {:.4}, checkpoint saved", monitor, value);
            } else {
                tracing::info!("Checkpoint saved for epoch {}", epoch);
            }
        }
    }

    let elapsed = started.elapsed();
    match best_epoch {
        Some(e) => tracing::info!("Training complete in {:.1?}; best epoch {} ({} = {:.4})", elapsed, e, monitor, best_value),
        None    => tracing::warn!("Training finished in {:.1?} without saving a checkpoint", elapsed),
    }

    Ok(TrainSummary { best_epoch, best_value, elapsed })
}
