//! Text generation capability
//!
//! The assistant treats the language model as an injected, fallible
//! capability. Intent extraction uses it as a fallback for phrasing the
//! lexicon does not cover, and the synthesizer uses it to summarize command
//! output. Neither path ever depends on it for safety.

pub mod client;
pub mod factory;
pub mod stub;

pub use client::HttpTextGenerator;
pub use factory::create_generator;
pub use stub::StubGenerator;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Distinguishable failure conditions of a generation call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Provider unreachable, rate limited or failing
    #[error("text generation unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded its time budget
    #[error("text generation timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with something unusable
    #[error("invalid generation output: {0}")]
    InvalidOutput(String),

    /// The request that needed the text was cancelled
    #[error("text generation cancelled")]
    Cancelled,
}

/// Fallible text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt
    ///
    /// `schema_hint` describes the expected output shape; providers that
    /// support a JSON response mode use it to request one.
    async fn generate(
        &self,
        prompt: &str,
        schema_hint: Option<&str>,
    ) -> Result<String, GenerationError>;

    /// Provider name for logs
    fn name(&self) -> &str;
}

/// Run a generation call under a time budget and a cancellation token
///
/// Dropping the in-flight future aborts the underlying request.
pub async fn generate_bounded(
    generator: &dyn TextGenerator,
    prompt: &str,
    schema_hint: Option<&str>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String, GenerationError> {
    if cancel.is_cancelled() {
        return Err(GenerationError::Cancelled);
    }

    tokio::select! {
        _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        outcome = tokio::time::timeout(timeout, generator.generate(prompt, schema_hint)) => {
            match outcome {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout(timeout)),
            }
        }
    }
}

/// Slice the outermost JSON object out of surrounding prose
pub fn extract_json(response: &str) -> Result<&str, GenerationError> {
    let start = response
        .find('{')
        .ok_or_else(|| GenerationError::InvalidOutput("no JSON object in output".into()))?;
    let end = response
        .rfind('}')
        .ok_or_else(|| GenerationError::InvalidOutput("no closing brace in output".into()))?;
    if end < start {
        return Err(GenerationError::InvalidOutput(
            "malformed JSON object in output".into(),
        ));
    }
    Ok(&response[start..=end])
}
