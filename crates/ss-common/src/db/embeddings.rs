use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use pgvector::Vector;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::db::util::TimedClientExt;
use crate::db::PgPool;
use crate::store::{Neighbor, StoredEmbedding};

db_error!(EmbeddingStorageError {
    #[error("embedding for user {0} is empty")]
    EmptyVector(i64),
    #[error("embedding write timed out after {}ms before commit", .0.as_millis())]
    Timeout(Duration),
});

#[instrument(skip(pool))]
pub async fn fetch_embedding(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<StoredEmbedding>, EmbeddingStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt_cached(
            "SELECT user_id, embedding, generated_at
             FROM user_embeddings
             WHERE user_id = $1",
            &[&user_id],
            "embeddings.fetch",
        )
        .await?;

    Ok(row.map(|row| StoredEmbedding {
        user_id: row.get("user_id"),
        vector: row.get::<_, Vector>("embedding").to_vec(),
        generated_at: row.get("generated_at"),
    }))
}

/// Insert or replace the user's embedding row inside one transaction.
///
/// `deadline` bounds everything up to the commit, both client side and as the
/// transaction's `statement_timeout`. Running out of it drops the transaction, which rolls
/// it back, and returns [`EmbeddingStorageError::Timeout`]. The commit itself is awaited
/// without a client deadline so a reported timeout never hides a committed row.
#[instrument(skip(pool, vector), fields(dimension = vector.len()))]
pub async fn upsert_embedding(
    pool: &PgPool,
    user_id: i64,
    vector: &[f32],
    generated_at: DateTime<Utc>,
    deadline: Duration,
) -> Result<(), EmbeddingStorageError> {
    if vector.is_empty() {
        return Err(EmbeddingStorageError::EmptyVector(user_id));
    }

    let started = Instant::now();
    let mut client = timeout(deadline, pool.get())
        .await
        .map_err(|_| EmbeddingStorageError::Timeout(deadline))??;

    let timeout_setting = format!("{}ms", deadline.as_millis().max(1));
    let embedding = Vector::from(vector.to_vec());
    let remaining = || deadline.saturating_sub(started.elapsed());
    let timed_out = || {
        warn!(
            user_id,
            timeout_ms = deadline.as_millis() as u64,
            "embedding upsert timed out before commit"
        );
        EmbeddingStorageError::Timeout(deadline)
    };

    let tx = timeout(remaining(), client.transaction())
        .await
        .map_err(|_| timed_out())??;

    timeout(remaining(), async {
        tx.query_one(
            "SELECT set_config('statement_timeout', $1, true)",
            &[&timeout_setting],
        )
        .await?;
        tx.timed_execute_cached(
            "INSERT INTO user_embeddings (user_id, embedding, generated_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO UPDATE
             SET embedding = EXCLUDED.embedding,
                 generated_at = EXCLUDED.generated_at",
            &[&user_id, &embedding, &generated_at],
            "embeddings.upsert",
        )
        .await?;
        Ok::<_, EmbeddingStorageError>(())
    })
    .await
    .map_err(|_| timed_out())??;

    tx.commit().await?;
    debug!(user_id, "embedding stored");
    Ok(())
}

/// Every embedded user except `user_id`, ordered by inner-product distance
/// `1 - <target, candidate>` and then by user id.
#[instrument(skip(pool, target))]
pub async fn nearest_neighbors(
    pool: &PgPool,
    user_id: i64,
    target: &[f32],
) -> Result<Vec<Neighbor>, EmbeddingStorageError> {
    let client = pool.get().await?;
    let target = Vector::from(target.to_vec());

    // pgvector's <#> yields the negated inner product.
    let rows = client
        .timed_query_cached(
            "SELECT ue.user_id, u.name, (1 + (ue.embedding <#> $2))::float8 AS distance
             FROM user_embeddings ue
             JOIN users u ON u.id = ue.user_id
             WHERE ue.user_id <> $1
             ORDER BY distance ASC, ue.user_id ASC",
            &[&user_id, &target],
            "embeddings.nearest_neighbors",
        )
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| Neighbor {
            user_id: row.get("user_id"),
            name: row.get::<_, Option<String>>("name").unwrap_or_default(),
            distance: row.get("distance"),
        })
        .collect())
}
