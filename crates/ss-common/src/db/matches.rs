use std::collections::HashMap;

use tokio_postgres::Row;
use tracing::instrument;

use crate::db::util::TimedClientExt;
use crate::db::PgPool;
use crate::store::{MatchRecord, Slot};

db_error!(MatchStorageError {});

fn match_from_row(row: &Row) -> MatchRecord {
    MatchRecord {
        id: row.get("id"),
        user1_id: row.get("user1_id"),
        user2_id: row.get("user2_id"),
        feedback_user1: row.get("feedback_user1"),
        feedback_user2: row.get("feedback_user2"),
    }
}

#[instrument(skip(pool))]
pub async fn fetch_match(
    pool: &PgPool,
    match_id: i64,
) -> Result<Option<MatchRecord>, MatchStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt_cached(
            "SELECT id, user1_id, user2_id, feedback_user1, feedback_user2
             FROM matches
             WHERE id = $1",
            &[&match_id],
            "matches.fetch",
        )
        .await?;
    Ok(row.as_ref().map(match_from_row))
}

/// Each slot has its own fixed statement; column names are never built from input.
#[instrument(skip(pool))]
pub async fn write_rating(
    pool: &PgPool,
    match_id: i64,
    slot: Slot,
    rating: i32,
) -> Result<bool, MatchStorageError> {
    let statement = match slot {
        Slot::First => "UPDATE matches SET feedback_user1 = $2 WHERE id = $1",
        Slot::Second => "UPDATE matches SET feedback_user2 = $2 WHERE id = $1",
    };

    let client = pool.get().await?;
    let updated = client
        .timed_execute_cached(statement, &[&match_id, &rating], "matches.write_rating")
        .await?;
    Ok(updated > 0)
}

/// Ratings `user_id` entered, keyed by counterpart. The newest rated match per
/// counterpart wins.
#[instrument(skip(pool))]
pub async fn feedback_given_by(
    pool: &PgPool,
    user_id: i64,
) -> Result<HashMap<i64, i32>, MatchStorageError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT DISTINCT ON (counterpart_id) counterpart_id, rating
             FROM (
                 SELECT id, user2_id AS counterpart_id, feedback_user1 AS rating
                 FROM matches
                 WHERE user1_id = $1 AND feedback_user1 IS NOT NULL
                 UNION ALL
                 SELECT id, user1_id AS counterpart_id, feedback_user2 AS rating
                 FROM matches
                 WHERE user2_id = $1 AND user1_id <> $1 AND feedback_user2 IS NOT NULL
             ) given
             ORDER BY counterpart_id, id DESC",
            &[&user_id],
            "matches.feedback_given_by",
        )
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("counterpart_id"), row.get("rating")))
        .collect())
}

#[instrument(skip(pool))]
pub async fn matches_involving(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<MatchRecord>, MatchStorageError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT id, user1_id, user2_id, feedback_user1, feedback_user2
             FROM matches
             WHERE user1_id = $1 OR user2_id = $1
             ORDER BY id DESC",
            &[&user_id],
            "matches.involving",
        )
        .await?;
    Ok(rows.iter().map(match_from_row).collect())
}
