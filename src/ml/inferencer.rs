// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the model from model_config.json, loads the best
// checkpoint and scores the item catalog for rendered prompts.
// Runs on the plain Wgpu backend, dropout disabled.

use anyhow::Result;
use burn::{
    data::dataloader::{batcher::Batcher, DataLoaderBuilder},
    prelude::*,
};

use crate::data::{
    batcher::PromptBatcher,
    dataset::{PromptDataset, PromptSample},
    preprocessor::PromptEncoder,
};
use crate::infra::{checkpoint::CheckpointManager, ranking::top_k_indices};
use crate::ml::model::PromptRecModel;
use crate::ml::trainer::{evaluate, EvalSummary};

type InferBackend = burn::backend::Wgpu;

pub struct Inferencer {
    model:   PromptRecModel<InferBackend>,
    encoder: PromptEncoder,
    device:  burn::backend::wgpu::WgpuDevice,
}

impl Inferencer {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, encoder: PromptEncoder) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        let mut model_cfg = ckpt_manager.load_model_config()?;
        model_cfg.dropout = 0.0;

        if model_cfg.num_items != encoder.catalog().len() {
            anyhow::bail!(
                "Checkpoint was trained on {} items but the snapshot has {}",
                model_cfg.num_items,
                encoder.catalog().len()
            );
        }

        let model: PromptRecModel<InferBackend> = model_cfg.init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self { model, encoder, device })
    }

    pub fn encoder(&self) -> &PromptEncoder {
        &self.encoder
    }

    /// Softmax probability of every catalog item for one prompt.
    pub fn score(&self, user_id: &str, input_text: &str) -> Result<Vec<f32>> {
        let sample  = self.encoder.encode_input(user_id, input_text)?;
        let batcher = PromptBatcher::<InferBackend>::new(self.device.clone());
        let batch   = batcher.batch(vec![sample]);

        let logits = self.model.forward(batch.input_ids, batch.attention_mask, batch.user_ids);
        burn::tensor::activation::softmax(logits, 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read scores: {e:?}"))
    }

    /// The `k` most likely next items with their probabilities.
    pub fn top_k(&self, user_id: &str, input_text: &str, k: usize) -> Result<Vec<(String, f32)>> {
        let scores = self.score(user_id, input_text)?;
        let ranked = top_k_indices(&scores, k)
            .into_iter()
            .filter_map(|i| self.encoder.catalog().key(i).map(|key| (key.to_string(), scores[i])))
            .collect::<Vec<_>>();

        tracing::debug!("Top-{} for '{}': {:?}", k, user_id, ranked);
        Ok(ranked)
    }

    /// Loss and ranking metrics over pre-encoded samples.
    pub fn evaluate(&self, samples: Vec<PromptSample>, batch_size: usize, k: usize) -> Result<EvalSummary> {
        let loader = DataLoaderBuilder::new(PromptBatcher::<InferBackend>::new(self.device.clone()))
            .batch_size(batch_size)
            .num_workers(1)
            .build(PromptDataset::new(samples));
        evaluate(&self.model, loader.iter(), k)
    }
}
