//! Assistant errors
//!
//! Only failures the caller cannot act on end up here. Denials, ambiguity,
//! timeouts and missing summaries are ordinary responses.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
    /// The cluster CLI could not be started
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was cancelled before a response was built
    #[error("request cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AssistantError {
    /// Whether the caller went away, as opposed to a server fault
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AssistantError::Cancelled)
    }
}

pub type AssistantResult<T> = Result<T, AssistantError>;
