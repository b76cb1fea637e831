use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::PgPool;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
    #[error("embedding dimension must be positive")]
    InvalidDimension,
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: String,
}

/// Ordered schema migrations. `dimension` fixes the `vector(N)` column size and must
/// match the encoder's output length.
fn migrations(dimension: usize) -> Vec<Migration> {
    vec![
        Migration {
            id: 1,
            description: "users, skills and user_skills",
            sql: r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    bio TEXT
);

CREATE TABLE IF NOT EXISTS skills (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS user_skills (
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    skill_id BIGINT NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
    type TEXT NOT NULL CHECK (type IN ('teach', 'learn')),
    PRIMARY KEY (user_id, skill_id, type)
);
"#
            .to_string(),
        },
        Migration {
            id: 2,
            description: "pgvector user embeddings, one row per user",
            sql: format!(
                r#"
CREATE EXTENSION IF NOT EXISTS vector;

CREATE TABLE IF NOT EXISTS user_embeddings (
    user_id BIGINT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    embedding vector({dimension}) NOT NULL,
    generated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#
            ),
        },
        Migration {
            id: 3,
            description: "matches with one feedback slot per participant",
            sql: r#"
CREATE TABLE IF NOT EXISTS matches (
    id BIGSERIAL PRIMARY KEY,
    user1_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    user2_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    feedback_user1 INTEGER CHECK (feedback_user1 IS NULL OR feedback_user1 BETWEEN 1 AND 5),
    feedback_user2 INTEGER CHECK (feedback_user2 IS NULL OR feedback_user2 BETWEEN 1 AND 5),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_matches_user1 ON matches(user1_id);
CREATE INDEX IF NOT EXISTS idx_matches_user2 ON matches(user2_id);
"#
            .to_string(),
        },
    ]
}

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool, dimension: usize) -> Result<(), MigrationError> {
    if dimension == 0 {
        return Err(MigrationError::InvalidDimension);
    }

    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in migrations(dimension) {
        let already_applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .get(0);

        if already_applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(&migration.sql).await?;
        tx.execute(
            "INSERT INTO schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}
