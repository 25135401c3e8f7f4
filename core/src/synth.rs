//! Response synthesis
//!
//! Builds the caller-facing response from the policy decision and, when a
//! command ran, its captured output. The raw output is authoritative; the
//! generated summary is optional and never attached to a denial.

use crate::executor::{ExecutionOutcome, ExecutionResult};
use crate::intent::Intent;
use crate::llm::{generate_bounded, TextGenerator};
use crate::policy::PolicyDecision;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Output shown when a successful command printed nothing
pub const EMPTY_OUTPUT: &str = "(no resources found)";

/// Example queries offered with a clarification
const CLARIFY_SUGGESTION: &str =
    "Try \"list pods\", \"describe deployment <name>\" or \"show logs for pod <name> in <namespace>\".";

/// Longest slice of output handed to the summarizer
const SUMMARY_INPUT_CHARS: usize = 8000;

/// Response for a command that ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub query: String,
    pub parsed_intent: Intent,
    pub raw_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_response: Option<String>,
    pub success: bool,
}

/// Response for a denied or unclear request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenialResponse {
    pub query: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_intent: Option<Intent>,
    pub success: bool,
}

/// External response contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssistantResponse {
    Success(SuccessResponse),
    Denial(DenialResponse),
}

impl AssistantResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, AssistantResponse::Success(_))
    }

    pub fn parsed_intent(&self) -> Option<&Intent> {
        match self {
            AssistantResponse::Success(success) => Some(&success.parsed_intent),
            AssistantResponse::Denial(denial) => denial.parsed_intent.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AssistantResponse::Success(_) => None,
            AssistantResponse::Denial(denial) => Some(&denial.error),
        }
    }

    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AssistantResponse::Success(success) => Some(&success.raw_response),
            AssistantResponse::Denial(_) => None,
        }
    }

    pub fn enhanced_response(&self) -> Option<&str> {
        match self {
            AssistantResponse::Success(success) => success.enhanced_response.as_deref(),
            AssistantResponse::Denial(_) => None,
        }
    }

    fn denial(intent: &Intent, error: String, suggestion: Option<String>) -> Self {
        AssistantResponse::Denial(DenialResponse {
            query: intent.raw_text.clone(),
            error,
            suggestion,
            parsed_intent: Some(intent.clone()),
            success: false,
        })
    }
}

/// Turns decisions and execution results into responses
#[derive(Clone)]
pub struct ResponseSynthesizer {
    binary: String,
    command_timeout: Duration,
    max_output_bytes: usize,
    generator: Option<Arc<dyn TextGenerator>>,
    generation_timeout: Duration,
}

impl ResponseSynthesizer {
    pub fn new(binary: impl Into<String>, command_timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            binary: binary.into(),
            command_timeout,
            max_output_bytes,
            generator: None,
            generation_timeout: Duration::from_secs(15),
        }
    }

    /// Summarize successful output with `generator`
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        self.generator = Some(generator);
        self.generation_timeout = timeout;
        self
    }

    /// Build the response for one request
    pub async fn synthesize(
        &self,
        intent: &Intent,
        decision: &PolicyDecision,
        result: Option<&ExecutionResult>,
        cancel: &CancellationToken,
    ) -> AssistantResponse {
        match (decision, result) {
            (PolicyDecision::Deny { reason, suggestion }, _) => {
                AssistantResponse::denial(intent, reason.clone(), Some(suggestion.clone()))
            }
            (PolicyDecision::Clarify { question }, _) => AssistantResponse::denial(
                intent,
                question.clone(),
                Some(CLARIFY_SUGGESTION.to_string()),
            ),
            (PolicyDecision::Allow(_), None) => {
                AssistantResponse::denial(intent, "command was not executed".to_string(), None)
            }
            (PolicyDecision::Allow(_), Some(result)) => {
                let raw_response = self.raw_response(result);
                let enhanced_response = if result.success() {
                    self.enhance(intent, &raw_response, cancel).await
                } else {
                    None
                };
                AssistantResponse::Success(SuccessResponse {
                    query: intent.raw_text.clone(),
                    parsed_intent: intent.clone(),
                    raw_response,
                    enhanced_response,
                    success: true,
                })
            }
        }
    }

    /// Text for `raw_response`, truncation notice included
    pub fn raw_response(&self, result: &ExecutionResult) -> String {
        let body = match result.outcome {
            ExecutionOutcome::TimedOut => format!(
                "Command timed out after {}s and was stopped before completing.",
                self.command_timeout.as_secs()
            ),
            ExecutionOutcome::Cancelled => "Command was cancelled before completing.".to_string(),
            ExecutionOutcome::Completed => match result.exit_code {
                Some(0) => {
                    let stdout = result.stdout.trim_end();
                    let stderr = result.stderr.trim();
                    if !stdout.trim().is_empty() {
                        stdout.to_string()
                    } else if !stderr.is_empty() {
                        stderr.to_string()
                    } else {
                        EMPTY_OUTPUT.to_string()
                    }
                }
                code => {
                    let detail = if result.stderr.trim().is_empty() {
                        result.stdout.trim()
                    } else {
                        result.stderr.trim()
                    };
                    let code = code.map_or_else(|| "unknown".to_string(), |c| c.to_string());
                    format!("{} exited with code {}: {}", self.binary, code, detail)
                }
            },
        };

        if result.truncated {
            format!(
                "[output truncated to {} bytes]\n{}",
                self.max_output_bytes, body
            )
        } else {
            body
        }
    }

    async fn enhance(
        &self,
        intent: &Intent,
        raw_response: &str,
        cancel: &CancellationToken,
    ) -> Option<String> {
        let generator = self.generator.as_ref()?;
        let prompt = summary_prompt(intent, raw_response);

        match generate_bounded(
            generator.as_ref(),
            &prompt,
            None,
            self.generation_timeout,
            cancel,
        )
        .await
        {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                warn!("Summary generation returned empty text, omitting");
                None
            }
            Err(e) => {
                warn!("Summary generation failed, returning raw output only: {}", e);
                None
            }
        }
    }
}

fn summary_prompt(intent: &Intent, raw_response: &str) -> String {
    let output: String = raw_response.chars().take(SUMMARY_INPUT_CHARS).collect();
    debug!("Requesting summary for {} chars of output", output.len());
    format!(
        "An operator asked: {query:?}\n\
         The assistant ran a read-only command ({summary}) and got this output:\n\
         ---\n{output}\n---\n\
         Summarize what the output shows in a few sentences for the operator. \
         Use only facts present in the output; do not invent resources, counts or causes. \
         Point out anything that looks unhealthy, such as restarts, pending or failed states.",
        query = intent.raw_text,
        summary = intent.summary(),
        output = output,
    )
}
