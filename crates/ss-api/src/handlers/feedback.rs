use axum::{extract::State, Json};
use ss_common::api::feedback_request::FeedbackRequest;
use ss_common::api::feedback_response::{FeedbackResponse, FeedbackStatus};
use ss_common::matching::weights::{RATING_MAX, RATING_MIN};

use crate::error::ApiError;
use crate::SharedState;

pub async fn submit_feedback(
    State(state): State<SharedState>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    if !payload.rating_in_range() {
        return Err(ApiError::BadRequest(format!(
            "rating must be between {RATING_MIN} and {RATING_MAX}"
        )));
    }

    let slot = state
        .engine
        .submit_feedback(payload.match_id, payload.user_id, payload.rating)
        .await?;

    Ok(Json(FeedbackResponse {
        status: FeedbackStatus::Recorded,
        match_id: payload.match_id,
        slot,
    }))
}
