use std::time::Duration;

use crate::encoder::EncoderConfig;

/// Runtime settings of the match engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Encoder implementation name passed to `encoder::create_encoder`.
    pub encoder: String,
    pub encoder_config: EncoderConfig,
    /// Budget for one encode call, including time queued on the blocking pool.
    pub encode_timeout: Duration,
    /// Budget for each individual store call.
    pub store_timeout: Duration,
    pub default_top_k: usize,
    /// Upper bound the HTTP layer clamps `top_k` to.
    pub max_top_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            encoder: "hash".into(),
            encoder_config: EncoderConfig::default(),
            encode_timeout: Duration::from_millis(10_000),
            store_timeout: Duration::from_millis(5_000),
            default_top_k: 5,
            max_top_k: 100,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl EngineConfig {
    /// Read overrides from `SS_*` environment variables; unset or unparsable values keep
    /// their defaults. Zero durations and zero `top_k` values are ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            encoder: std::env::var("SS_ENCODER").unwrap_or(defaults.encoder),
            encoder_config: EncoderConfig {
                dimension: env_parse::<usize>("SS_EMBEDDING_DIMENSION")
                    .filter(|d| *d > 0)
                    .unwrap_or(defaults.encoder_config.dimension),
                bigram_weight: env_parse::<f32>("SS_ENCODER_BIGRAM_WEIGHT")
                    .filter(|w| w.is_finite() && *w >= 0.0)
                    .unwrap_or(defaults.encoder_config.bigram_weight),
            },
            encode_timeout: env_parse::<u64>("SS_ENCODE_TIMEOUT_MS")
                .filter(|v| *v > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.encode_timeout),
            store_timeout: env_parse::<u64>("SS_STORE_TIMEOUT_MS")
                .filter(|v| *v > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            default_top_k: env_parse::<usize>("SS_DEFAULT_TOP_K")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.default_top_k),
            max_top_k: env_parse::<usize>("SS_MAX_TOP_K")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_top_k),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.default_top_k, 5);
        assert_eq!(cfg.encoder_config.dimension, 384);
        assert_eq!(cfg.encoder, "hash");
    }
}
