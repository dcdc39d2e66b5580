// ============================================================
// Layer 5 — Prompt Recommender Model
// ============================================================
// A transformer encoder that reads a rendered prompt and
// scores every item of the catalog as the next purchase:
//
//   input_ids [B, S]
//       │  token + position embeddings
//       ▼
//   N × EncoderBlock (self-attention with pad mask, GELU FFN)
//       │
//       ▼
//   masked mean-pool over real tokens        → [B, d_model]
//       │  (+ user embedding when personalized)
//       ▼
//   item_head                                 → [B, num_items]
//
// Decoding is restricted to known items, so the output layer
// is a classifier over the item catalog rather than a free
// text decoder.

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct PromptRecConfig {
    pub vocab_size:   usize,
    pub max_seq_len:  usize,
    pub d_model:      usize,
    pub num_heads:    usize,
    pub num_layers:   usize,
    pub d_ff:         usize,
    pub dropout:      f64,
    pub num_items:    usize,
    pub num_users:    usize,
    #[config(default = false)]
    pub personalized: bool,
}

impl PromptRecConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PromptRecModel<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let user_embedding = self
            .personalized
            .then(|| EmbeddingConfig::new(self.num_users.max(1), self.d_model).init(device));
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let item_head  = LinearConfig::new(self.d_model, self.num_items).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        PromptRecModel {
            token_embedding, position_embedding, user_embedding, layers,
            final_norm, item_head, dropout,
            max_seq_len: self.max_seq_len,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true on padding positions.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input  = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct PromptRecModel<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub user_embedding:     Option<Embedding<B>>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub item_head:          Linear<B>,
    pub dropout:            Dropout,
    pub max_seq_len:        usize,
}

impl<B: Backend> PromptRecModel<B> {
    /// input_ids, attention_mask: [batch, seq_len], user_ids: [batch]
    /// → item logits: [batch, num_items]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        user_ids:       Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let tok_emb = self.token_embedding.forward(input_ids);
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let pad_mask = attention_mask.clone().equal_elem(0);
        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        let x = self.final_norm.forward(x); // [batch, seq_len, d_model]
        let [_, _, d_model] = x.dims();

        // Mean over real tokens only
        let mask = attention_mask.float();                         // [batch, seq_len]
        let weights = mask.clone()
            .unsqueeze_dim::<3>(2)
            .expand([batch_size, seq_len, d_model]);
        let summed = (x * weights).sum_dim(1).reshape([batch_size, d_model]);
        let counts = mask.sum_dim(1).clamp_min(1.0).expand([batch_size, d_model]);
        let mut pooled = summed / counts;

        if let Some(user_embedding) = &self.user_embedding {
            let users = user_embedding
                .forward(user_ids.unsqueeze_dim::<2>(1))
                .reshape([batch_size, d_model]);
            pooled = pooled + users;
        }

        self.item_head.forward(self.dropout.forward(pooled))
    }

    /// Cross-entropy of the target item label; returns (loss, logits).
    pub fn forward_loss(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        user_ids:       Tensor<B, 1, Int>,
        labels:         Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(input_ids, attention_mask, user_ids);
        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits.clone(), labels);
        (loss, logits)
    }
}
