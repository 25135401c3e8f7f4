//! Pipeline orchestrator
//!
//! RECEIVED → EXTRACTED → DECIDED → {EXECUTED | SKIPPED} → RESPONDED.
//! Each stage runs once per request. Every path ends in a well-formed
//! response except cancellation and process-level failures.

use crate::command::RenderedCommand;
use crate::config::AssistantConfig;
use crate::errors::{AssistantError, AssistantResult};
use crate::executor::{CommandExecutor, ExecutionOutcome};
use crate::intent::IntentExtractor;
use crate::llm::{create_generator, TextGenerator};
use crate::policy::{PolicyDecision, PolicyEngine};
use crate::resolver::NameResolver;
use crate::synth::{AssistantResponse, ResponseSynthesizer};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Extracted,
    Decided,
    Executed,
    Skipped,
    Responded,
}

/// Response plus a record of what happened
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub response: AssistantResponse,
    pub stages: Vec<PipelineStage>,
    /// Command that ran, if any
    pub executed: Option<RenderedCommand>,
}

/// Stateless query pipeline, safe to share across concurrent requests
#[derive(Clone)]
pub struct Pipeline {
    extractor: IntentExtractor,
    policy: PolicyEngine,
    resolver: Option<NameResolver>,
    executor: CommandExecutor,
    synthesizer: ResponseSynthesizer,
    command_timeout: Duration,
}

impl Pipeline {
    /// Build a pipeline with the generator described by the configuration
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::with_generator(config, create_generator(&config.llm))
    }

    /// Build a pipeline around an explicit generator
    pub fn with_generator(
        config: &AssistantConfig,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        let cluster = &config.cluster;
        let executor = CommandExecutor::new(cluster.max_output_bytes);

        let mut extractor = IntentExtractor::new(cluster.default_namespace.clone());
        let mut synthesizer = ResponseSynthesizer::new(
            cluster.binary.clone(),
            cluster.command_timeout(),
            cluster.max_output_bytes,
        );
        if let Some(generator) = generator {
            if config.llm.extraction_fallback {
                extractor = extractor.with_generator(generator.clone(), config.llm.timeout());
            }
            if config.llm.enhance_responses {
                synthesizer = synthesizer.with_generator(generator, config.llm.timeout());
            }
        }

        let resolver = cluster.resolve_names.then(|| {
            NameResolver::new(
                cluster.binary.clone(),
                executor.clone(),
                cluster.resolve_timeout(),
            )
        });

        Self {
            extractor,
            policy: PolicyEngine::new(config.policy.clone(), cluster.binary.clone()),
            resolver,
            executor,
            synthesizer,
            command_timeout: cluster.command_timeout(),
        }
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    /// Answer a query, discarding the stage record
    pub async fn handle(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> AssistantResult<AssistantResponse> {
        self.run(query, cancel).await.map(|outcome| outcome.response)
    }

    /// Run a query through every stage
    pub async fn run(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> AssistantResult<PipelineOutcome> {
        let request_id = Uuid::new_v4();
        let span = info_span!("query", request_id = %request_id);
        self.run_stages(query, cancel).instrument(span).await
    }

    async fn run_stages(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> AssistantResult<PipelineOutcome> {
        let mut stages = vec![PipelineStage::Received];
        info!("Received query ({} chars)", query.len());
        ensure_live(cancel)?;

        let mut intent = self.extractor.extract(query.trim(), cancel).await;
        stages.push(PipelineStage::Extracted);
        ensure_live(cancel)?;
        info!(
            verb = %intent.verb,
            source = ?intent.source,
            "Extracted intent: {}",
            intent.summary()
        );

        let mut decision = self.policy.evaluate(&intent);
        if let (PolicyDecision::Allow(_), Some(resolver)) = (&decision, &self.resolver) {
            let resolved = resolver.resolve(intent.clone(), cancel).await;
            ensure_live(cancel)?;
            if resolved != intent {
                intent = resolved;
                decision = self.policy.evaluate(&intent);
            }
        }
        stages.push(PipelineStage::Decided);
        info!(decision = decision.label(), "Policy decision made");

        let mut executed = None;
        let result = match &decision {
            PolicyDecision::Allow(command) => {
                let result = self
                    .executor
                    .execute(command, self.command_timeout, cancel)
                    .await?;
                if result.outcome == ExecutionOutcome::Cancelled {
                    return Err(AssistantError::Cancelled);
                }
                stages.push(PipelineStage::Executed);
                info!(
                    outcome = ?result.outcome,
                    exit_code = ?result.exit_code,
                    duration_ms = result.duration_ms,
                    "Executed {}",
                    command.display()
                );
                executed = Some(command.clone());
                Some(result)
            }
            _ => {
                stages.push(PipelineStage::Skipped);
                None
            }
        };

        let response = self
            .synthesizer
            .synthesize(&intent, &decision, result.as_ref(), cancel)
            .await;
        stages.push(PipelineStage::Responded);
        debug!("Responded, success={}", response.is_success());

        Ok(PipelineOutcome {
            response,
            stages,
            executed,
        })
    }
}

fn ensure_live(cancel: &CancellationToken) -> AssistantResult<()> {
    if cancel.is_cancelled() {
        Err(AssistantError::Cancelled)
    } else {
        Ok(())
    }
}
