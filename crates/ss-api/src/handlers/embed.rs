use axum::{
    extract::{Path, State},
    Json,
};
use ss_common::api::embed_response::EmbedResponse;

use super::parse_user_id;
use crate::error::ApiError;
use crate::SharedState;

pub async fn embed_user(
    State(state): State<SharedState>,
    Path(raw_user_id): Path<String>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let user_id = parse_user_id(&raw_user_id)?;
    state.engine.generate_and_store(user_id).await?;
    Ok(Json(EmbedResponse::stored()))
}
