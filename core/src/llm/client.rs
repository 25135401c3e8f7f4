//! HTTP text generator
//!
//! Speaks the OpenAI-compatible chat completions, Anthropic messages and
//! Ollama generate wire formats over reqwest.

use super::{GenerationError, TextGenerator};
use crate::config::LlmProvider;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a careful assistant for a read-only Kubernetes inspection tool. \
Answer only from the information you are given.";

/// Text generator backed by a hosted or local model API
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl HttpTextGenerator {
    /// Create a generator for `provider`
    ///
    /// `base_url` falls back to the provider's public endpoint.
    pub fn new(
        provider: LlmProvider,
        base_url: Option<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Unavailable(format!("HTTP client: {}", e)))?;

        let base_url = base_url
            .unwrap_or_else(|| default_base_url(&provider).to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            provider,
            base_url,
            model: model.into(),
            api_key,
            max_tokens: 512,
            temperature: 0.0,
            timeout,
        })
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        match self.provider {
            LlmProvider::Anthropic => format!("{}/v1/messages", self.base_url),
            LlmProvider::Ollama => format!("{}/api/generate", self.base_url),
            _ => format!("{}/chat/completions", self.base_url),
        }
    }

    fn request_body(&self, prompt: &str, schema_hint: Option<&str>) -> JsonValue {
        match self.provider {
            LlmProvider::Anthropic => serde_json::json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
                "system": SYSTEM_PROMPT,
                "messages": [{"role": "user", "content": prompt}],
            }),
            LlmProvider::Ollama => {
                let mut body = serde_json::json!({
                    "model": self.model,
                    "system": SYSTEM_PROMPT,
                    "prompt": prompt,
                    "stream": false,
                    "options": {
                        "temperature": self.temperature,
                        "num_predict": self.max_tokens,
                    }
                });
                if schema_hint.is_some() {
                    body["format"] = JsonValue::String("json".into());
                }
                body
            }
            _ => {
                let mut body = serde_json::json!({
                    "model": self.model,
                    "messages": [
                        {"role": "system", "content": SYSTEM_PROMPT},
                        {"role": "user", "content": prompt}
                    ],
                    "temperature": self.temperature,
                    "max_tokens": self.max_tokens,
                });
                if schema_hint.is_some() {
                    body["response_format"] = serde_json::json!({"type": "json_object"});
                }
                body
            }
        }
    }

    fn map_transport_error(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::Timeout(self.timeout)
        } else if error.is_decode() {
            GenerationError::InvalidOutput(error.to_string())
        } else {
            GenerationError::Unavailable(error.to_string())
        }
    }
}

fn default_base_url(provider: &LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Anthropic => "https://api.anthropic.com",
        LlmProvider::Ollama => "http://localhost:11434",
        _ => "https://api.openai.com/v1",
    }
}

/// Pull the generated text out of a provider response body
pub(crate) fn parse_content(
    provider: &LlmProvider,
    body: &JsonValue,
) -> Result<String, GenerationError> {
    let content = match provider {
        LlmProvider::Anthropic => body["content"][0]["text"].as_str(),
        LlmProvider::Ollama => body["response"].as_str(),
        _ => body["choices"][0]["message"]["content"].as_str(),
    };

    match content {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        Some(_) => Err(GenerationError::InvalidOutput("empty completion".into())),
        None => Err(GenerationError::InvalidOutput(
            "completion text missing from response".into(),
        )),
    }
}

fn classify_status(status: StatusCode, body: &str) -> GenerationError {
    let snippet: String = body.chars().take(200).collect();
    if status == StatusCode::TOO_MANY_REQUESTS {
        GenerationError::Unavailable(format!("rate limited: {}", snippet))
    } else if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        GenerationError::Unavailable(format!("provider timeout ({})", status))
    } else if status.is_server_error() {
        GenerationError::Unavailable(format!("provider error {}: {}", status, snippet))
    } else {
        GenerationError::InvalidOutput(format!("HTTP {}: {}", status, snippet))
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(
        &self,
        prompt: &str,
        schema_hint: Option<&str>,
    ) -> Result<String, GenerationError> {
        let url = self.endpoint();
        debug!("Sending generation request to {} ({})", url, self.model);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(api_key) = &self.api_key {
            request = match self.provider {
                LlmProvider::Anthropic => request
                    .header("x-api-key", api_key)
                    .header("anthropic-version", "2023-06-01"),
                _ => request.header("Authorization", format!("Bearer {}", api_key)),
            };
        }

        let response = request
            .json(&self.request_body(prompt, schema_hint))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        parse_content(&self.provider, &body)
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }
}
