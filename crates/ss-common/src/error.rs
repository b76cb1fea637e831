use std::time::Duration;

use serde::Serialize;
use strum::AsRefStr;
use thiserror::Error;

use crate::encoder::EncodeError;
use crate::store::StoreError;

/// Coarse classification of `MatchError`, stable enough for callers to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    NoEmbedding,
    NotParticipant,
    InvalidArgument,
    Infrastructure,
}

/// Store, encoder or runtime failure. Never retried by the engine.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Encoder(#[from] EncodeError),
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("encoder task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("user {0} not found")]
    UserNotFound(i64),
    #[error("match {0} not found")]
    MatchNotFound(i64),
    #[error("user {0} has no embedding; embed the user first")]
    NoEmbedding(i64),
    #[error("user {user_id} is not part of match {match_id}")]
    NotParticipant { match_id: i64, user_id: i64 },
    #[error("top_k must be a positive integer")]
    InvalidTopK,
    #[error("infrastructure error: {0}")]
    Infrastructure(#[from] InfraError),
}

impl MatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchError::UserNotFound(_) | MatchError::MatchNotFound(_) => ErrorKind::NotFound,
            MatchError::NoEmbedding(_) => ErrorKind::NoEmbedding,
            MatchError::NotParticipant { .. } => ErrorKind::NotParticipant,
            MatchError::InvalidTopK => ErrorKind::InvalidArgument,
            MatchError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            MatchError::Infrastructure(InfraError::Timeout { .. })
        )
    }
}

impl From<StoreError> for MatchError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Timeout { operation, after } => {
                MatchError::Infrastructure(InfraError::Timeout { operation, after })
            }
            other => MatchError::Infrastructure(InfraError::Store(other)),
        }
    }
}

impl From<EncodeError> for MatchError {
    fn from(value: EncodeError) -> Self {
        MatchError::Infrastructure(InfraError::Encoder(value))
    }
}
