use serde::{Deserialize, Serialize};

/// One ranked candidate returned to the requester.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchCandidate {
    pub user_id: i64,
    pub name: String,
    /// Cosine similarity of the two profile embeddings, 4 decimals.
    pub similarity: f64,
    /// Rating the requester gave this candidate in an earlier match, if any.
    pub previous_feedback: Option<i32>,
    /// Final ranking score, 4 decimals.
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchesResponse {
    pub matches: Vec<MatchCandidate>,
}
