//! Stub generator
//!
//! Scripted generator that never touches the network. Used by tests and by
//! `provider = "stub"` deployments that want deterministic output.

use super::{GenerationError, TextGenerator};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted text generator
///
/// Replies are consumed in order; once the script runs out the last reply is
/// repeated. Every prompt is recorded for later inspection.
#[derive(Debug, Default)]
pub struct StubGenerator {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    last: Mutex<Option<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl StubGenerator {
    /// Create a stub that replays `script`
    pub fn new(script: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Stub that always answers with the same text
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![Ok(response.into())])
    }

    /// Stub that always fails
    pub fn failing(error: GenerationError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Wait before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|prompts| prompts.len()).unwrap_or(0)
    }

    fn next_reply(&self) -> Result<String, GenerationError> {
        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());

        let mut last = match self.last.lock() {
            Ok(last) => last,
            Err(_) => return Err(GenerationError::Unavailable("stub poisoned".into())),
        };
        if let Some(reply) = next {
            *last = Some(reply);
        }
        last.clone()
            .unwrap_or_else(|| Err(GenerationError::Unavailable("stub has no script".into())))
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _schema_hint: Option<&str>,
    ) -> Result<String, GenerationError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_reply()
    }

    fn name(&self) -> &str {
        "stub"
    }
}
