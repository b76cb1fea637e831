/// Declare a storage error enum that always carries the pool and postgres variants,
/// plus its conversion into [`StoreError`](crate::store::StoreError).
macro_rules! db_error {
    ($name:ident { $($body:tt)* }) => {
        #[derive(Debug, thiserror::Error)]
        pub enum $name {
            #[error("failed to get postgres connection: {0}")]
            Pool(#[from] deadpool_postgres::PoolError),
            #[error("postgres error: {0}")]
            Postgres(#[from] tokio_postgres::Error),
            $($body)*
        }

        impl From<$name> for crate::store::StoreError {
            #[allow(unreachable_patterns)]
            fn from(err: $name) -> Self {
                match err {
                    $name::Pool(e) => crate::store::StoreError::Unavailable(e.to_string()),
                    $name::Postgres(e) => crate::db::classify_pg_error(e),
                    other => crate::store::StoreError::InvalidData(other.to_string()),
                }
            }
        }
    };
}

pub mod embeddings;
pub mod matches;
pub mod migrations;
pub mod pool;
pub mod profiles;
pub mod util;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::error::SqlState;
use tracing::instrument;

use crate::profile::UserProfile;
use crate::store::{
    FeedbackLedger, MatchRecord, MatchStore, Neighbor, ProfileSource, Slot, StoreError,
    StoredEmbedding, VectorStore,
};

pub use embeddings::{
    fetch_embedding, nearest_neighbors, upsert_embedding, EmbeddingStorageError,
};
pub use matches::{
    feedback_given_by, fetch_match, matches_involving, write_rating, MatchStorageError,
};
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool_from_url, create_pool_from_url_checked, DbPoolError, PgPool};
pub use profiles::{fetch_profile, ProfileStorageError};

/// Cancelled statements and dropped connections are reported as unavailability so callers
/// can tell them apart from malformed queries.
pub(crate) fn classify_pg_error(err: tokio_postgres::Error) -> StoreError {
    let cancelled = err.code() == Some(&SqlState::QUERY_CANCELED);
    if cancelled || err.is_closed() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Query(err.to_string())
    }
}

/// Postgres + pgvector implementation of [`MatchStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProfileSource for PgStore {
    async fn fetch_profile(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError> {
        Ok(profiles::fetch_profile(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl VectorStore for PgStore {
    async fn find_embedding(&self, user_id: i64) -> Result<Option<StoredEmbedding>, StoreError> {
        Ok(embeddings::fetch_embedding(&self.pool, user_id).await?)
    }

    async fn upsert_embedding(
        &self,
        user_id: i64,
        vector: &[f32],
        generated_at: DateTime<Utc>,
        deadline: Duration,
    ) -> Result<(), StoreError> {
        embeddings::upsert_embedding(&self.pool, user_id, vector, generated_at, deadline)
            .await
            .map_err(|err| match err {
                EmbeddingStorageError::Timeout(after) => StoreError::Timeout {
                    operation: "upsert_embedding",
                    after,
                },
                other => other.into(),
            })
    }

    async fn nearest_neighbors(
        &self,
        user_id: i64,
        target: &[f32],
    ) -> Result<Vec<Neighbor>, StoreError> {
        Ok(embeddings::nearest_neighbors(&self.pool, user_id, target).await?)
    }
}

#[async_trait]
impl FeedbackLedger for PgStore {
    async fn find_match(&self, match_id: i64) -> Result<Option<MatchRecord>, StoreError> {
        Ok(matches::fetch_match(&self.pool, match_id).await?)
    }

    async fn write_rating(
        &self,
        match_id: i64,
        slot: Slot,
        rating: i32,
    ) -> Result<bool, StoreError> {
        Ok(matches::write_rating(&self.pool, match_id, slot, rating).await?)
    }

    async fn feedback_given_by(&self, user_id: i64) -> Result<HashMap<i64, i32>, StoreError> {
        Ok(matches::feedback_given_by(&self.pool, user_id).await?)
    }

    async fn matches_involving(&self, user_id: i64) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(matches::matches_involving(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl MatchStore for PgStore {
    #[instrument(skip(self))]
    async fn ping(&self) -> Result<(), StoreError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(classify_pg_error)?;
        Ok(())
    }
}
