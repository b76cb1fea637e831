#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Output vector length. Must match the `vector(N)` column of `user_embeddings`.
    pub dimension: usize,
    /// Weight of adjacent-word bigrams relative to unigrams (hash encoder only).
    pub bigram_weight: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            bigram_weight: 0.5,
        }
    }
}
