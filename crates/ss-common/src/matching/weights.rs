/// Lowest and highest rating a participant can give.
pub const RATING_MIN: i32 = 1;
pub const RATING_MAX: i32 = 5;

/// Blend used when the requester has rated a candidate before:
/// 70% embedding similarity, 30% rescaled rating.
pub const FEEDBACK_BLEND: FeedbackBlend = FeedbackBlend {
    similarity: 0.7,
    feedback: 0.3,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackBlend {
    pub similarity: f64,
    pub feedback: f64,
}

impl FeedbackBlend {
    /// Final score of a candidate. Without a rating the similarity is returned unchanged,
    /// so unrated candidates are never pushed down.
    pub fn score(&self, similarity: f64, rating: Option<i32>) -> f64 {
        match rating {
            None => similarity,
            Some(rating) => self.similarity * similarity + self.feedback * rescale_rating(rating),
        }
    }
}

/// Map a rating from `[RATING_MIN, RATING_MAX]` onto `[0, 1]` linearly.
pub fn rescale_rating(rating: i32) -> f64 {
    f64::from(rating - RATING_MIN) / f64::from(RATING_MAX - RATING_MIN)
}
