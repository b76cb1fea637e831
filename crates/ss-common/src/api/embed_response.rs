use serde::{Deserialize, Serialize};

pub const EMBED_SUCCESS_MESSAGE: &str = "User embeddings generated and stored successfully.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedResponse {
    pub message: String,
}

impl EmbedResponse {
    pub fn stored() -> Self {
        Self {
            message: EMBED_SUCCESS_MESSAGE.to_string(),
        }
    }
}
