//! kubeassist Core
//!
//! Natural-language cluster inspection: intent extraction, a default-deny
//! policy, argument-vector command rendering, bounded subprocess execution
//! and response synthesis, sequenced by [`Pipeline`].

pub mod command;
pub mod config;
pub mod errors;
pub mod executor;
pub mod intent;
pub mod llm;
pub mod pipeline;
pub mod policy;
pub mod resolver;
pub mod synth;

pub use command::{RenderError, RenderedCommand};
pub use config::AssistantConfig;
pub use errors::{AssistantError, AssistantResult};
pub use executor::{CommandExecutor, ExecutionOutcome, ExecutionResult};
pub use intent::{Intent, IntentExtractor, IntentFlag, ResourceKind, Verb};
pub use llm::{GenerationError, TextGenerator};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineStage};
pub use policy::{PolicyConfig, PolicyDecision, PolicyEngine};
pub use synth::{AssistantResponse, DenialResponse, ResponseSynthesizer, SuccessResponse};
