use siphasher::sip::SipHasher13;
use std::hash::{Hash, Hasher};

use super::{tokenizer, vector, EncodeError, EncoderConfig, ProfileEncoder};

/// Fixed seeds keep hashes stable across Rust versions.
/// Changing either value changes every embedding: bump `version()` and re-embed users.
const HASH_SEED_K0: u64 = 0x5eed_0f5a_11ed_c0de;
const HASH_SEED_K1: u64 = 0x0dd5_a1e5_b0b0_cafe;

const EMPTY_PROFILE_TOKEN: &str = "meta:empty";

/// Deterministic feature-hashing encoder.
///
/// - no model files, no training
/// - O(n) in the number of tokens
/// - signed hashing keeps collisions from only ever adding similarity
/// - output is L2-normalized
pub struct HashEncoder {
    config: EncoderConfig,
}

impl HashEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        let mut cfg = config;
        cfg.dimension = cfg.dimension.max(1);
        Self { config: cfg }
    }

    fn hash_token(token: &str) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        hasher.finish()
    }
}

impl ProfileEncoder for HashEncoder {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn version(&self) -> &str {
        "hash-v1"
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, EncodeError> {
        let mut tokens = tokenizer::tokenize_text(text, self.config.bigram_weight);
        if tokens.is_empty() {
            // profiles with no content words all land on the same point
            tokens.push(tokenizer::WeightedToken::new(EMPTY_PROFILE_TOKEN, 1.0));
        }
        let mut v = vec![0.0f32; self.config.dimension];

        for wt in &tokens {
            let h = Self::hash_token(&wt.token);
            let idx = (h % self.config.dimension as u64) as usize;
            // top bit decides the sign, independent of the bucket bits
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign * wt.weight;
        }

        if !vector::l2_normalize(&mut v) {
            return Err(EncodeError::Degenerate);
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::vector::{inner_product, l2_norm};
    use crate::profile::format_profile_text;

    fn encoder() -> HashEncoder {
        HashEncoder::new(EncoderConfig::default())
    }

    #[test]
    fn produces_unit_vectors_of_configured_dimension() {
        let v = encoder()
            .encode(&format_profile_text(Some("Baker"), &["bread"], &["rust"]))
            .unwrap();

        assert_eq!(v.len(), 384);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-4, "norm was {}", l2_norm(&v));
    }

    #[test]
    fn encoding_is_deterministic() {
        let text = format_profile_text(Some("Teacher"), &["math"], &["drums"]);
        assert_eq!(encoder().encode(&text).unwrap(), encoder().encode(&text).unwrap());
    }

    #[test]
    fn overlapping_profiles_score_higher() {
        let enc = encoder();
        let base = enc
            .encode(&format_profile_text(Some("Rust developer"), &["rust", "postgres"], &["piano"]))
            .unwrap();
        let close = enc
            .encode(&format_profile_text(Some("Rust engineer"), &["rust", "postgres"], &["violin"]))
            .unwrap();
        let far = enc
            .encode(&format_profile_text(Some("Pastry chef"), &["baking"], &["surfing"]))
            .unwrap();

        let close_sim = inner_product(&base, &close).unwrap();
        let far_sim = inner_product(&base, &far).unwrap();
        assert!(close_sim > far_sim, "{close_sim} vs {far_sim}");
    }

    #[test]
    fn empty_profiles_still_encode() {
        let empty: [&str; 0] = [];
        let a = encoder()
            .encode(&format_profile_text(None, &empty, &empty))
            .unwrap();
        let b = encoder()
            .encode(&format_profile_text(Some(""), &empty, &empty))
            .unwrap();

        assert!((l2_norm(&a) - 1.0).abs() < 1e-4);
        assert_eq!(a, b);
    }
}
