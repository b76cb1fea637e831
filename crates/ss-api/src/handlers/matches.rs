use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use ss_common::api::match_response::MatchesResponse;

use super::parse_user_id;
use crate::error::ApiError;
use crate::SharedState;

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    pub top_k: Option<i64>,
}

/// Missing `top_k` falls back to the configured default; large values are clamped.
fn resolve_top_k(requested: Option<i64>, default: usize, max: usize) -> Result<usize, ApiError> {
    match requested {
        None => Ok(default.min(max)),
        Some(value) if value <= 0 => Err(ApiError::BadRequest(
            "top_k must be a positive integer".into(),
        )),
        Some(value) => Ok(usize::try_from(value).unwrap_or(max).min(max)),
    }
}

pub async fn top_matches(
    State(state): State<SharedState>,
    Path(raw_user_id): Path<String>,
    Query(query): Query<MatchesQuery>,
) -> Result<Json<MatchesResponse>, ApiError> {
    let user_id = parse_user_id(&raw_user_id)?;
    let config = state.engine.config();
    let top_k = resolve_top_k(query.top_k, config.default_top_k, config.max_top_k)?;
    let matches = state.engine.top_matches(user_id, top_k).await?;
    Ok(Json(MatchesResponse { matches }))
}
