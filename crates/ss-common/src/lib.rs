pub mod api;
pub mod config;
pub mod db;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod matching;
pub mod profile;
pub mod store;

pub use config::EngineConfig;
pub use error::{ErrorKind, InfraError, MatchError};
pub use matching::MatchEngine;
pub use profile::{format_profile_text, SkillDirection, UserProfile};
