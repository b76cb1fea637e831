pub mod config;
pub mod hash_encoder;
pub mod tokenizer;
pub mod vector;

use std::sync::Arc;

pub use config::EncoderConfig;
pub use hash_encoder::HashEncoder;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("encoder produced a vector that cannot be normalized")]
    Degenerate,
    #[error("encoder returned {actual} dimensions, expected {expected}")]
    Dimension { expected: usize, actual: usize },
}

/// Text embedding capability.
///
/// Implementations are expected to be built once per process and shared behind an `Arc`.
/// `encode` may be CPU heavy; callers run it on the blocking pool.
pub trait ProfileEncoder: Send + Sync {
    /// Implementation name ("hash", ...).
    fn name(&self) -> &'static str;

    /// Changes whenever the same text would produce a different vector.
    fn version(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Encode `text` into a `dimension()`-length vector. Output need not be normalized;
    /// the embedding generator normalizes it before storing.
    fn encode(&self, text: &str) -> Result<Vec<f32>, EncodeError>;
}

/// Encoder factory. Unknown names fall back to the hash encoder.
pub fn create_encoder(name: &str, config: EncoderConfig) -> Arc<dyn ProfileEncoder> {
    match name {
        "hash" => Arc::new(HashEncoder::new(config)),
        other => {
            warn!(encoder = other, "unknown encoder; falling back to hash");
            Arc::new(HashEncoder::new(config))
        }
    }
}
