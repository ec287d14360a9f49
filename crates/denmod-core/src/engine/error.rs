use super::collaborators::CollaboratorError;
use super::config::ConfigError;
use crate::core::models::hl::HlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("{feature} is not supported")]
    NotSupported { feature: &'static str },

    #[error("Collaborator failure: {source}")]
    Collaborator {
        #[from]
        source: CollaboratorError,
    },

    #[error("Phase evidence combination failed: {source}")]
    PhaseCombination {
        #[from]
        source: HlError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
