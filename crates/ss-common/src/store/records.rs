use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

/// The single embedding row kept per user.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub user_id: i64,
    pub vector: Vec<f32>,
    pub generated_at: DateTime<Utc>,
}

/// A candidate returned by nearest-neighbour search.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub user_id: i64,
    pub name: String,
    /// Inner-product distance `1 - <target, candidate>`; smaller is closer.
    pub distance: f64,
}

/// Which of the two fixed participant slots of a match a user occupies.
/// A rating is always written into the rater's own slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Slot {
    First,
    Second,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: i64,
    pub user1_id: i64,
    pub user2_id: i64,
    /// What user1 thinks of user2.
    pub feedback_user1: Option<i32>,
    /// What user2 thinks of user1.
    pub feedback_user2: Option<i32>,
}

impl MatchRecord {
    pub fn new(id: i64, user1_id: i64, user2_id: i64) -> Self {
        Self {
            id,
            user1_id,
            user2_id,
            feedback_user1: None,
            feedback_user2: None,
        }
    }

    pub fn slot_of(&self, user_id: i64) -> Option<Slot> {
        if user_id == self.user1_id {
            Some(Slot::First)
        } else if user_id == self.user2_id {
            Some(Slot::Second)
        } else {
            None
        }
    }

    pub fn rating_in(&self, slot: Slot) -> Option<i32> {
        match slot {
            Slot::First => self.feedback_user1,
            Slot::Second => self.feedback_user2,
        }
    }

    pub fn set_rating(&mut self, slot: Slot, rating: i32) {
        match slot {
            Slot::First => self.feedback_user1 = Some(rating),
            Slot::Second => self.feedback_user2 = Some(rating),
        }
    }

    /// Rating `user_id` gave about the other participant, if any.
    pub fn feedback_from(&self, user_id: i64) -> Option<i32> {
        self.slot_of(user_id).and_then(|slot| self.rating_in(slot))
    }

    pub fn counterpart_of(&self, user_id: i64) -> Option<i64> {
        match self.slot_of(user_id)? {
            Slot::First => Some(self.user2_id),
            Slot::Second => Some(self.user1_id),
        }
    }
}
