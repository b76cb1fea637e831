pub mod embed_response;
pub mod feedback_request;
pub mod feedback_response;
pub mod match_history;
pub mod match_response;
