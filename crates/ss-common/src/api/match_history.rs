use serde::{Deserialize, Serialize};

use crate::store::MatchRecord;

/// A match seen from one participant's side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchHistoryEntry {
    pub match_id: i64,
    pub counterpart_id: i64,
    /// What the viewing user said about the counterpart.
    pub given_feedback: Option<i32>,
    /// What the counterpart said about the viewing user.
    pub received_feedback: Option<i32>,
}

impl MatchHistoryEntry {
    /// `None` when `user_id` is not a participant of `record`.
    pub fn from_record(record: &MatchRecord, user_id: i64) -> Option<Self> {
        let counterpart_id = record.counterpart_of(user_id)?;
        Some(Self {
            match_id: record.id,
            counterpart_id,
            given_feedback: record.feedback_from(user_id),
            received_feedback: record.feedback_from(counterpart_id),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchHistoryResponse {
    pub user_id: i64,
    pub matches: Vec<MatchHistoryEntry>,
}
