use axum::{
    extract::{Path, State},
    Json,
};
use ss_common::api::match_history::{MatchHistoryEntry, MatchHistoryResponse};

use super::parse_user_id;
use crate::error::ApiError;
use crate::SharedState;

pub async fn list_user_matches(
    State(state): State<SharedState>,
    Path(raw_user_id): Path<String>,
) -> Result<Json<MatchHistoryResponse>, ApiError> {
    let user_id = parse_user_id(&raw_user_id)?;
    let records = state.engine.matches_involving(user_id).await?;
    let matches = records
        .iter()
        .filter_map(|record| MatchHistoryEntry::from_record(record, user_id))
        .collect();

    Ok(Json(MatchHistoryResponse { user_id, matches }))
}
