use serde::{Deserialize, Serialize};

use crate::matching::weights::{RATING_MAX, RATING_MIN};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackRequest {
    pub match_id: i64,
    /// The rater. Must be one of the two participants of the match.
    pub user_id: i64,
    pub rating: i32,
}

impl FeedbackRequest {
    pub fn rating_in_range(&self) -> bool {
        (RATING_MIN..=RATING_MAX).contains(&self.rating)
    }
}
