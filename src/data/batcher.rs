// ============================================================
// Layer 4 — Prompt Batcher
// ============================================================
// Implements Burn's Batcher trait to stack PromptSamples into
// tensors:
//
//   Input:  Vec of N PromptSamples, each padded to length S
//   Output: PromptBatch with input_ids / attention_mask [N, S],
//           user_ids / labels [N]
//
// Labels are also kept on the host so ranking metrics can be
// computed without reading the label tensor back.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::PromptSample;

/// A batch of prompts ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct PromptBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// User rows — shape: [batch_size]
    pub user_ids: Tensor<B, 1, Int>,

    /// Target item labels — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,

    /// Same labels, host side
    pub label_ids: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct PromptBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PromptBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<PromptSample, PromptBatch<B>> for PromptBatcher<B> {
    fn batch(&self, items: Vec<PromptSample>) -> PromptBatch<B> {
        let batch_size = items.len();
        // All sequences have the same length (pre-padded)
        let seq_len = items.first().map(|s| s.input_ids.len()).unwrap_or(0);

        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();

        let users:  Vec<i32>   = items.iter().map(|s| s.user_index as i32).collect();
        let labels: Vec<i32>   = items.iter().map(|s| s.label as i32).collect();
        let label_ids: Vec<usize> = items.iter().map(|s| s.label).collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let user_ids = Tensor::<B, 1, Int>::from_ints(users.as_slice(), &self.device);
        let labels   = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        PromptBatch {
            input_ids,
            attention_mask,
            user_ids,
            labels,
            label_ids,
        }
    }
}
