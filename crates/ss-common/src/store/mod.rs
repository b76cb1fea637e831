pub mod memory;
pub mod records;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::profile::UserProfile;
pub use memory::MemoryStore;
pub use records::{MatchRecord, Neighbor, Slot, StoredEmbedding};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store query failed: {0}")]
    Query(String),
    #[error("invalid stored value: {0}")]
    InvalidData(String),
    /// Raised only when nothing was written.
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Bio and skills of `user_id`, or `None` when the user row does not exist.
    async fn fetch_profile(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn find_embedding(&self, user_id: i64) -> Result<Option<StoredEmbedding>, StoreError>;

    /// Insert-or-update the user's single embedding row. Must be atomic with respect to
    /// concurrent calls for the same user; nothing is written when it fails.
    ///
    /// `deadline` bounds the work before the commit. Once the commit has been sent the call
    /// waits for its outcome, so `StoreError::Timeout` always means the previous row is
    /// still in place.
    async fn upsert_embedding(
        &self,
        user_id: i64,
        vector: &[f32],
        generated_at: DateTime<Utc>,
        deadline: Duration,
    ) -> Result<(), StoreError>;

    /// Every embedded user except `user_id`, closest first.
    async fn nearest_neighbors(
        &self,
        user_id: i64,
        target: &[f32],
    ) -> Result<Vec<Neighbor>, StoreError>;
}

#[async_trait]
pub trait FeedbackLedger: Send + Sync {
    async fn find_match(&self, match_id: i64) -> Result<Option<MatchRecord>, StoreError>;

    /// Overwrite the rating held in `slot`. Returns `false` when the match row is gone.
    async fn write_rating(&self, match_id: i64, slot: Slot, rating: i32)
        -> Result<bool, StoreError>;

    /// Ratings `user_id` entered, keyed by the counterpart they are about. When several
    /// rated matches exist with the same counterpart the most recent one wins.
    async fn feedback_given_by(&self, user_id: i64) -> Result<HashMap<i64, i32>, StoreError>;

    /// Matches `user_id` takes part in, newest first.
    async fn matches_involving(&self, user_id: i64) -> Result<Vec<MatchRecord>, StoreError>;
}

/// Everything the match engine needs from persistence.
#[async_trait]
pub trait MatchStore: ProfileSource + VectorStore + FeedbackLedger {
    async fn ping(&self) -> Result<(), StoreError>;
}
