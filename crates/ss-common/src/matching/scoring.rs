use std::cmp::Ordering;
use std::collections::HashMap;

use super::weights::FeedbackBlend;
use crate::api::match_response::MatchCandidate;
use crate::store::Neighbor;

/// Decimal places kept in the returned `similarity` and `score`.
pub const OUTPUT_DECIMALS: i32 = 4;

pub fn similarity_from_distance(distance: f64) -> f64 {
    1.0 - distance
}

pub fn round_output(value: f64) -> f64 {
    let factor = 10f64.powi(OUTPUT_DECIMALS);
    (value * factor).round() / factor
}

struct Ranked {
    neighbor: Neighbor,
    similarity: f64,
    previous_feedback: Option<i32>,
    score: f64,
}

/// Descending score, then descending similarity, then ascending user id.
/// Compares unrounded values; rounding happens only when building the output.
fn rank_order(a: &Ranked, b: &Ranked) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.similarity.total_cmp(&a.similarity))
        .then_with(|| a.neighbor.user_id.cmp(&b.neighbor.user_id))
}

/// Blend nearest-neighbour similarity with the requester's own past ratings and keep the
/// best `top_k`.
///
/// `feedback` maps candidate id to the rating the requester gave that candidate. The
/// requester is dropped even if the store returned them.
pub fn rank_candidates(
    requester_id: i64,
    neighbors: Vec<Neighbor>,
    feedback: &HashMap<i64, i32>,
    blend: &FeedbackBlend,
    top_k: usize,
) -> Vec<MatchCandidate> {
    let mut ranked: Vec<Ranked> = neighbors
        .into_iter()
        .filter(|n| n.user_id != requester_id)
        .map(|neighbor| {
            let similarity = similarity_from_distance(neighbor.distance);
            let previous_feedback = feedback.get(&neighbor.user_id).copied();
            let score = blend.score(similarity, previous_feedback);
            Ranked {
                neighbor,
                similarity,
                previous_feedback,
                score,
            }
        })
        .collect();

    ranked.sort_by(rank_order);
    ranked.truncate(top_k);

    ranked
        .into_iter()
        .map(|r| MatchCandidate {
            user_id: r.neighbor.user_id,
            name: r.neighbor.name,
            similarity: round_output(r.similarity),
            previous_feedback: r.previous_feedback,
            score: round_output(r.score),
        })
        .collect()
}
