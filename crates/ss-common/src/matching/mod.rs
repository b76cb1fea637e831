pub mod engine;
pub mod scoring;
pub mod weights;

pub use engine::MatchEngine;
pub use scoring::{rank_candidates, round_output, similarity_from_distance};
pub use weights::{FeedbackBlend, FEEDBACK_BLEND, RATING_MAX, RATING_MIN};
