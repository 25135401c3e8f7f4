//! Generator factory
//!
//! Builds the configured text generator, if any.

use super::{HttpTextGenerator, StubGenerator, TextGenerator};
use crate::config::{LlmConfig, LlmProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Create the generator described by `config`
///
/// Returns `None` when generation is disabled or the client cannot be
/// built; the assistant then runs on the lexical path alone and returns raw
/// output without summaries.
pub fn create_generator(config: &LlmConfig) -> Option<Arc<dyn TextGenerator>> {
    let timeout = Duration::from_secs(config.timeout_seconds);

    match config.provider {
        LlmProvider::Disabled => {
            info!("Text generation disabled");
            None
        }
        LlmProvider::Stub => {
            let response = config
                .stub_response
                .clone()
                .unwrap_or_else(|| "Summary unavailable in stub mode.".to_string());
            info!("Using stub text generator");
            Some(Arc::new(StubGenerator::fixed(response)))
        }
        LlmProvider::OpenAi | LlmProvider::Anthropic | LlmProvider::Ollama => {
            let api_key = config
                .api_key
                .as_deref()
                .map(resolve_env_var)
                .filter(|key| !key.is_empty());
            if api_key.is_none() && config.provider != LlmProvider::Ollama {
                warn!(
                    "Provider '{}' normally requires an API key but none is configured",
                    config.provider.as_str()
                );
            }

            match HttpTextGenerator::new(
                config.provider.clone(),
                config.base_url.clone(),
                config.model.clone(),
                api_key,
                timeout,
            ) {
                Ok(generator) => {
                    info!(
                        "Using {} text generator with model {}",
                        config.provider.as_str(),
                        config.model
                    );
                    Some(Arc::new(
                        generator.with_sampling(config.max_tokens, config.temperature),
                    ))
                }
                Err(e) => {
                    warn!("Text generation disabled: {}", e);
                    None
                }
            }
        }
    }
}

/// Resolve an `env:VAR` reference, returning other values unchanged
pub fn resolve_env_var(value: &str) -> String {
    match value.strip_prefix("env:") {
        Some(name) => std::env::var(name).unwrap_or_default(),
        None => value.to_string(),
    }
}
