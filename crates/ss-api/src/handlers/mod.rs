pub mod embed;
pub mod feedback;
pub mod health;
pub mod history;
pub mod matches;

use crate::error::ApiError;

/// Parse a user id taken from the path. Anything that is not an integer cannot name a
/// stored user, so it is reported as not found.
pub(crate) fn parse_user_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::NotFound(format!("user {raw} not found")))
}
