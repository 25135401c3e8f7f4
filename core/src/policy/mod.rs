//! Policy engine
//!
//! Last gate before any process runs with cluster credentials. Evaluation is
//! default-deny: an intent reaches execution only when its verb is in the
//! read-only allow-set, its kind is in the allowed vocabulary, and every
//! user-supplied value passes the Kubernetes naming rules. Anything else is
//! denied with a reason and a suggestion, or sent back for clarification.

use crate::command::{render, RenderedCommand};
use crate::intent::{Intent, IntentFlag, ResourceKind, Verb, KNOWN_KINDS, READ_ONLY_VERBS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Fixed reason for any verb outside the read-only allow-set
pub const READ_ONLY_REASON: &str = "only read-only inspection commands are permitted";
pub const UNSUPPORTED_KIND_REASON: &str = "unsupported resource kind";
pub const INVALID_NAMESPACE_REASON: &str = "invalid namespace";
pub const INVALID_NAME_REASON: &str = "invalid resource name";

const DNS_LABEL: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";
const DNS_SUBDOMAIN: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$";

static LABEL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static SUBDOMAIN_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// RFC 1123 label, as required for namespaces
pub fn is_valid_namespace(value: &str) -> bool {
    value.len() <= 63
        && LABEL_RE
            .get_or_init(|| Regex::new(DNS_LABEL).ok())
            .as_ref()
            .is_some_and(|re| re.is_match(value))
}

/// RFC 1123 subdomain, as required for most resource names
pub fn is_valid_resource_name(value: &str) -> bool {
    value.len() <= 253
        && SUBDOMAIN_RE
            .get_or_init(|| Regex::new(DNS_SUBDOMAIN).ok())
            .as_ref()
            .is_some_and(|re| re.is_match(value))
}

/// Immutable allow/deny configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Verbs that may execute; only read-only verbs are ever honored
    pub allowed_verbs: Vec<Verb>,
    pub allowed_kinds: Vec<ResourceKind>,
    /// Kinds denied even when allowed above
    pub restricted_kinds: Vec<ResourceKind>,
    pub restricted_namespaces: Vec<String>,
    pub max_log_tail_lines: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_verbs: READ_ONLY_VERBS.to_vec(),
            allowed_kinds: KNOWN_KINDS.to_vec(),
            restricted_kinds: vec![
                ResourceKind::Secret,
                ResourceKind::Role,
                ResourceKind::ClusterRole,
                ResourceKind::RoleBinding,
                ResourceKind::ClusterRoleBinding,
            ],
            restricted_namespaces: Vec::new(),
            max_log_tail_lines: 1000,
        }
    }
}

impl PolicyConfig {
    /// Validate policy configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(verb) = self.allowed_verbs.iter().find(|v| !v.is_read_only()) {
            return Err(format!("verb '{}' is not read-only and cannot be allowed", verb));
        }
        if self.allowed_verbs.is_empty() {
            return Err("allowed_verbs must not be empty".to_string());
        }
        if let Some(kind) = self
            .allowed_kinds
            .iter()
            .chain(self.restricted_kinds.iter())
            .find(|k| !k.is_known())
        {
            return Err(format!("unknown resource kind '{}'", kind));
        }
        if let Some(ns) = self
            .restricted_namespaces
            .iter()
            .find(|ns| !is_valid_namespace(ns))
        {
            return Err(format!("restricted namespace '{}' is not a valid namespace", ns));
        }
        if self.max_log_tail_lines == 0 {
            return Err("max_log_tail_lines must be positive".to_string());
        }
        Ok(())
    }

    /// A policy that also allows the sensitive kinds
    pub fn permissive() -> Self {
        Self {
            restricted_kinds: Vec::new(),
            ..Self::default()
        }
    }

    /// A policy limited to listing and describing workloads
    pub fn restrictive() -> Self {
        Self {
            allowed_verbs: vec![Verb::Get, Verb::List, Verb::Describe],
            allowed_kinds: vec![
                ResourceKind::Pod,
                ResourceKind::Service,
                ResourceKind::Deployment,
                ResourceKind::Namespace,
                ResourceKind::Node,
            ],
            max_log_tail_lines: 200,
            ..Self::default()
        }
    }

    /// Allowed verbs intersected with the read-only set
    pub fn effective_verbs(&self) -> Vec<Verb> {
        self.allowed_verbs
            .iter()
            .filter(|verb| verb.is_read_only())
            .cloned()
            .collect()
    }
}

/// Outcome of evaluating one intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow(RenderedCommand),
    Deny { reason: String, suggestion: String },
    Clarify { question: String },
}

impl PolicyDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyDecision::Allow(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            PolicyDecision::Allow(_) => "allow",
            PolicyDecision::Deny { .. } => "deny",
            PolicyDecision::Clarify { .. } => "clarify",
        }
    }

    fn deny(reason: impl Into<String>, suggestion: impl Into<String>) -> Self {
        PolicyDecision::Deny {
            reason: reason.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Evaluates intents against a [`PolicyConfig`]
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    config: PolicyConfig,
    binary: String,
}

impl PolicyEngine {
    /// `binary` is the only program an allowed command may name
    pub fn new(config: PolicyConfig, binary: impl Into<String>) -> Self {
        Self {
            config,
            binary: binary.into(),
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Evaluate an intent
    pub fn evaluate(&self, intent: &Intent) -> PolicyDecision {
        let decision = self.decide(intent);
        match &decision {
            PolicyDecision::Allow(command) => debug!("Policy allow: {}", command.display()),
            PolicyDecision::Deny { reason, .. } => {
                info!("Policy deny for '{}': {}", intent.verb, reason)
            }
            PolicyDecision::Clarify { .. } => debug!("Policy clarify"),
        }
        decision
    }

    fn decide(&self, intent: &Intent) -> PolicyDecision {
        if intent.verb.is_unknown() {
            return PolicyDecision::Clarify {
                question: rephrase_question(),
            };
        }

        if !intent.verb.is_read_only() || !self.config.allowed_verbs.contains(&intent.verb) {
            return PolicyDecision::deny(READ_ONLY_REASON, read_only_suggestion(intent));
        }

        let Some(kind) = &intent.resource_kind else {
            return PolicyDecision::deny(UNSUPPORTED_KIND_REASON, self.kinds_suggestion());
        };
        if self.config.restricted_kinds.contains(kind) {
            return PolicyDecision::deny(
                format!("access to {} resources is restricted", kind),
                "Ask about workloads instead, for example \"list pods\" or \"list deployments\".",
            );
        }
        if !kind.is_known() || !self.config.allowed_kinds.contains(kind) {
            return PolicyDecision::deny(UNSUPPORTED_KIND_REASON, self.kinds_suggestion());
        }

        if let Some(ns) = &intent.namespace {
            if !is_valid_namespace(ns) {
                return PolicyDecision::deny(
                    INVALID_NAMESPACE_REASON,
                    "Namespaces use lowercase letters, digits and '-', for example \"list pods in kube-system\".",
                );
            }
            if self.config.restricted_namespaces.contains(ns) {
                return PolicyDecision::deny(
                    format!("access to namespace {} is restricted", ns),
                    "Choose a different namespace.",
                );
            }
        }
        if intent.has_flag(IntentFlag::AllNamespaces) && !self.config.restricted_namespaces.is_empty() {
            return PolicyDecision::deny(
                "all-namespace queries are disabled while namespaces are restricted",
                "Name a namespace, for example \"list pods in default\".",
            );
        }

        if let Some(name) = &intent.resource_name {
            if !is_valid_resource_name(name) {
                return PolicyDecision::deny(
                    INVALID_NAME_REASON,
                    "Resource names use lowercase letters, digits, '-' and '.'.",
                );
            }
        }

        if intent.verb == Verb::Logs {
            if intent.resource_name.is_none() {
                return PolicyDecision::Clarify {
                    question: format!(
                        "Which {} should I show logs for? For example: \"show logs for {} <name>\".",
                        kind, kind
                    ),
                };
            }
            if !kind.has_logs() {
                return PolicyDecision::deny(
                    format!("logs are not available for {} resources", kind),
                    "Logs can be shown for pods, deployments, statefulsets, daemonsets and jobs.",
                );
            }
        }

        if let Some(flag) = intent.flags.iter().find(|f| !f.applies_to(&intent.verb)) {
            return PolicyDecision::deny(
                format!("flag '{}' is not supported with {}", flag, intent.verb),
                format!("Ask again without '{}'.", flag),
            );
        }
        if let Some(lines) = intent.tail_lines() {
            if lines > self.config.max_log_tail_lines {
                return PolicyDecision::deny(
                    format!(
                        "log tail of {} lines exceeds the limit of {}",
                        lines, self.config.max_log_tail_lines
                    ),
                    format!("Request at most {} lines.", self.config.max_log_tail_lines),
                );
            }
        }

        match render(&self.binary, intent) {
            Ok(command) => PolicyDecision::Allow(command),
            Err(e) => PolicyDecision::deny(e.to_string(), read_only_suggestion(intent)),
        }
    }

    fn kinds_suggestion(&self) -> String {
        let kinds: Vec<&str> = self
            .config
            .allowed_kinds
            .iter()
            .filter(|kind| !self.config.restricted_kinds.contains(kind))
            .map(|kind| kind.cli_name())
            .collect();
        format!("Supported resource kinds: {}.", kinds.join(", "))
    }
}

fn rephrase_question() -> String {
    "I couldn't understand that request. Please rephrase it, for example \"list pods in kube-system\" or \"show logs for pod <name>\".".to_string()
}

/// Read-only rephrasing for a denied verb
fn read_only_suggestion(intent: &Intent) -> String {
    let kind = intent
        .resource_kind
        .as_ref()
        .filter(|kind| kind.is_known())
        .cloned()
        .unwrap_or(ResourceKind::Pod);
    match &intent.resource_name {
        Some(name) => format!(
            "Try a read-only request instead, such as \"describe {} {}\" or \"list {}\".",
            kind,
            name,
            kind.cli_name()
        ),
        None => format!(
            "Try a read-only request instead, such as \"list {}\" or \"describe {}\".",
            kind.cli_name(),
            kind.cli_name()
        ),
    }
}
