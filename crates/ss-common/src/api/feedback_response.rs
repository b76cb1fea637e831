use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::store::Slot;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, AsRefStr)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Recorded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackResponse {
    pub status: FeedbackStatus,
    pub match_id: i64,
    /// Slot the rating was written to.
    pub slot: Slot,
}
