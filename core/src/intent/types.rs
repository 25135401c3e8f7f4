//! Intent types
//!
//! Structured, typed interpretation of a free-text cluster query. Every
//! vocabulary here is closed: values that fall outside it are kept as
//! `Other(..)` so they can be reported and rejected, never executed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Action requested by the operator
///
/// Only [`Verb::Get`], [`Verb::List`], [`Verb::Describe`] and [`Verb::Logs`]
/// are read-only. Mutating verbs are still recognized so the policy can deny
/// them with a precise reason instead of asking the operator to rephrase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verb {
    Get,
    List,
    Describe,
    Logs,
    Delete,
    Apply,
    Create,
    Edit,
    Patch,
    Exec,
    Scale,
    /// A verb outside the vocabulary (synthetic, or a future extractor value)
    Other(String),
    /// Extraction could not determine an action
    Unknown,
}

/// Read-only verbs, the only ones that can ever reach execution
pub const READ_ONLY_VERBS: &[Verb] = &[Verb::Get, Verb::List, Verb::Describe, Verb::Logs];

impl Verb {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &str {
        match self {
            Verb::Get => "get",
            Verb::List => "list",
            Verb::Describe => "describe",
            Verb::Logs => "logs",
            Verb::Delete => "delete",
            Verb::Apply => "apply",
            Verb::Create => "create",
            Verb::Edit => "edit",
            Verb::Patch => "patch",
            Verb::Exec => "exec",
            Verb::Scale => "scale",
            Verb::Other(name) => name.as_str(),
            Verb::Unknown => "unknown",
        }
    }

    /// Parse a verb name, returning `None` outside the vocabulary
    pub fn from_vocabulary(name: &str) -> Option<Verb> {
        match Verb::from(name.trim().to_ascii_lowercase()) {
            Verb::Other(_) => None,
            verb => Some(verb),
        }
    }

    /// Whether the verb only inspects cluster state
    pub fn is_read_only(&self) -> bool {
        READ_ONLY_VERBS.contains(self)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Verb::Unknown)
    }
}

/// Serialized form of `Other` values, kept apart from vocabulary names
const OTHER_PREFIX: &str = "other:";

// Exact, case-sensitive match. `Other` is written with `OTHER_PREFIX` so it
// decodes back to `Other` even when its text is a vocabulary word.
impl From<String> for Verb {
    fn from(value: String) -> Self {
        if let Some(rest) = value.strip_prefix(OTHER_PREFIX) {
            return Verb::Other(rest.to_string());
        }
        match value.as_str() {
            "get" => Verb::Get,
            "list" => Verb::List,
            "describe" => Verb::Describe,
            "logs" => Verb::Logs,
            "delete" => Verb::Delete,
            "apply" => Verb::Apply,
            "create" => Verb::Create,
            "edit" => Verb::Edit,
            "patch" => Verb::Patch,
            "exec" => Verb::Exec,
            "scale" => Verb::Scale,
            "unknown" | "" => Verb::Unknown,
            _ => Verb::Other(value),
        }
    }
}

impl From<Verb> for String {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Other(name) => format!("{}{}", OTHER_PREFIX, name),
            verb => verb.as_str().to_string(),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cluster resource kind, normalized to a closed vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Pod,
    Service,
    Deployment,
    ReplicaSet,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
    ConfigMap,
    Ingress,
    Node,
    Namespace,
    PersistentVolume,
    PersistentVolumeClaim,
    Event,
    Secret,
    Role,
    ClusterRole,
    RoleBinding,
    ClusterRoleBinding,
    /// A kind outside the vocabulary
    Other(String),
}

/// Every recognized kind, in lexicon lookup order
pub const KNOWN_KINDS: &[ResourceKind] = &[
    ResourceKind::Pod,
    ResourceKind::Service,
    ResourceKind::Deployment,
    ResourceKind::ReplicaSet,
    ResourceKind::StatefulSet,
    ResourceKind::DaemonSet,
    ResourceKind::Job,
    ResourceKind::CronJob,
    ResourceKind::ConfigMap,
    ResourceKind::Ingress,
    ResourceKind::Node,
    ResourceKind::Namespace,
    ResourceKind::PersistentVolume,
    ResourceKind::PersistentVolumeClaim,
    ResourceKind::Event,
    ResourceKind::Secret,
    ResourceKind::Role,
    ResourceKind::ClusterRole,
    ResourceKind::RoleBinding,
    ResourceKind::ClusterRoleBinding,
];

impl ResourceKind {
    /// Canonical singular name used in intents and configuration
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Pod => "pod",
            ResourceKind::Service => "service",
            ResourceKind::Deployment => "deployment",
            ResourceKind::ReplicaSet => "replicaset",
            ResourceKind::StatefulSet => "statefulset",
            ResourceKind::DaemonSet => "daemonset",
            ResourceKind::Job => "job",
            ResourceKind::CronJob => "cronjob",
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::Ingress => "ingress",
            ResourceKind::Node => "node",
            ResourceKind::Namespace => "namespace",
            ResourceKind::PersistentVolume => "persistentvolume",
            ResourceKind::PersistentVolumeClaim => "persistentvolumeclaim",
            ResourceKind::Event => "event",
            ResourceKind::Secret => "secret",
            ResourceKind::Role => "role",
            ResourceKind::ClusterRole => "clusterrole",
            ResourceKind::RoleBinding => "rolebinding",
            ResourceKind::ClusterRoleBinding => "clusterrolebinding",
            ResourceKind::Other(name) => name.as_str(),
        }
    }

    /// Resource name as passed to the cluster CLI
    pub fn cli_name(&self) -> &str {
        match self {
            ResourceKind::Pod => "pods",
            ResourceKind::Service => "services",
            ResourceKind::Deployment => "deployments",
            ResourceKind::ReplicaSet => "replicasets",
            ResourceKind::StatefulSet => "statefulsets",
            ResourceKind::DaemonSet => "daemonsets",
            ResourceKind::Job => "jobs",
            ResourceKind::CronJob => "cronjobs",
            ResourceKind::ConfigMap => "configmaps",
            ResourceKind::Ingress => "ingresses",
            ResourceKind::Node => "nodes",
            ResourceKind::Namespace => "namespaces",
            ResourceKind::PersistentVolume => "persistentvolumes",
            ResourceKind::PersistentVolumeClaim => "persistentvolumeclaims",
            ResourceKind::Event => "events",
            ResourceKind::Secret => "secrets",
            ResourceKind::Role => "roles",
            ResourceKind::ClusterRole => "clusterroles",
            ResourceKind::RoleBinding => "rolebindings",
            ResourceKind::ClusterRoleBinding => "clusterrolebindings",
            ResourceKind::Other(name) => name.as_str(),
        }
    }

    /// Words an operator may use for this kind
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Pod => &["pod", "pods", "po"],
            ResourceKind::Service => &["service", "services", "svc"],
            ResourceKind::Deployment => &["deployment", "deployments", "deploy"],
            ResourceKind::ReplicaSet => &["replicaset", "replicasets", "rs"],
            ResourceKind::StatefulSet => &["statefulset", "statefulsets", "sts"],
            ResourceKind::DaemonSet => &["daemonset", "daemonsets", "ds"],
            ResourceKind::Job => &["job", "jobs"],
            ResourceKind::CronJob => &["cronjob", "cronjobs", "cj"],
            ResourceKind::ConfigMap => &["configmap", "configmaps", "cm"],
            ResourceKind::Ingress => &["ingress", "ingresses", "ing"],
            ResourceKind::Node => &["node", "nodes"],
            ResourceKind::Namespace => &["namespace", "namespaces", "ns"],
            ResourceKind::PersistentVolume => &["persistentvolume", "persistentvolumes", "pv"],
            ResourceKind::PersistentVolumeClaim => {
                &["persistentvolumeclaim", "persistentvolumeclaims", "pvc", "pvcs"]
            }
            ResourceKind::Event => &["event", "events", "ev"],
            ResourceKind::Secret => &["secret", "secrets"],
            ResourceKind::Role => &["role", "roles"],
            ResourceKind::ClusterRole => &["clusterrole", "clusterroles"],
            ResourceKind::RoleBinding => &["rolebinding", "rolebindings"],
            ResourceKind::ClusterRoleBinding => &["clusterrolebinding", "clusterrolebindings"],
            ResourceKind::Other(_) => &[],
        }
    }

    /// Look up a kind by any of its synonyms, ignoring case
    pub fn from_token(token: &str) -> Option<ResourceKind> {
        Self::from_synonym(&token.to_ascii_lowercase())
    }

    fn from_synonym(exact: &str) -> Option<ResourceKind> {
        KNOWN_KINDS
            .iter()
            .find(|kind| kind.synonyms().contains(&exact))
            .cloned()
    }

    /// Cluster-scoped kinds never carry a namespace
    pub fn is_cluster_scoped(&self) -> bool {
        matches!(
            self,
            ResourceKind::Node
                | ResourceKind::Namespace
                | ResourceKind::PersistentVolume
                | ResourceKind::ClusterRole
                | ResourceKind::ClusterRoleBinding
        )
    }

    /// Kinds whose containers produce logs
    pub fn has_logs(&self) -> bool {
        matches!(
            self,
            ResourceKind::Pod
                | ResourceKind::Deployment
                | ResourceKind::StatefulSet
                | ResourceKind::DaemonSet
                | ResourceKind::Job
        )
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ResourceKind::Other(_))
    }
}

impl From<String> for ResourceKind {
    fn from(value: String) -> Self {
        if let Some(rest) = value.strip_prefix(OTHER_PREFIX) {
            return ResourceKind::Other(rest.to_string());
        }
        ResourceKind::from_synonym(&value).unwrap_or(ResourceKind::Other(value))
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Other(name) => format!("{}{}", OTHER_PREFIX, name),
            kind => kind.as_str().to_string(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional modifiers, rendered only to fixed flag strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IntentFlag {
    AllNamespaces,
    Wide,
    ShowLabels,
    Previous,
    Tail(u32),
}

impl IntentFlag {
    /// Verbs this flag can be combined with
    pub fn applies_to(&self, verb: &Verb) -> bool {
        match self {
            IntentFlag::AllNamespaces => {
                matches!(verb, Verb::Get | Verb::List | Verb::Describe)
            }
            IntentFlag::Wide | IntentFlag::ShowLabels => matches!(verb, Verb::Get | Verb::List),
            IntentFlag::Previous | IntentFlag::Tail(_) => matches!(verb, Verb::Logs),
        }
    }
}

impl TryFrom<String> for IntentFlag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let normalized = value.trim().trim_start_matches('-').to_ascii_lowercase();
        match normalized.as_str() {
            "all-namespaces" | "a" => Ok(IntentFlag::AllNamespaces),
            "wide" | "o wide" | "o=wide" => Ok(IntentFlag::Wide),
            "show-labels" | "labels" => Ok(IntentFlag::ShowLabels),
            "previous" | "p" => Ok(IntentFlag::Previous),
            other => other
                .strip_prefix("tail=")
                .or_else(|| other.strip_prefix("tail "))
                .and_then(|n| n.trim().parse::<u32>().ok())
                .map(IntentFlag::Tail)
                .ok_or_else(|| format!("unsupported flag: {}", value)),
        }
    }
}

impl From<IntentFlag> for String {
    fn from(flag: IntentFlag) -> Self {
        flag.to_string()
    }
}

impl fmt::Display for IntentFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentFlag::AllNamespaces => f.write_str("all-namespaces"),
            IntentFlag::Wide => f.write_str("wide"),
            IntentFlag::ShowLabels => f.write_str("show-labels"),
            IntentFlag::Previous => f.write_str("previous"),
            IntentFlag::Tail(lines) => write!(f, "tail={}", lines),
        }
    }
}

/// How the intent was produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    /// Deterministic lexical grammar
    Lexical,
    /// Text-generation capability, vocabulary-validated
    Generated,
    /// Nothing matched
    #[default]
    None,
}

/// Structured result of extraction
///
/// Created fresh per query and discarded once the response is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub verb: Verb,
    pub resource_kind: Option<ResourceKind>,
    pub resource_name: Option<String>,
    pub namespace: Option<String>,
    #[serde(default)]
    pub flags: Vec<IntentFlag>,
    /// Original query, retained for audit
    pub raw_text: String,
    #[serde(default)]
    pub source: IntentSource,
    /// Partial name the operator typed, when resolution replaced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_from: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_matches: Vec<String>,
}

impl Intent {
    /// Create an intent for a recognized verb and kind
    pub fn new(verb: Verb, kind: ResourceKind, raw_text: impl Into<String>) -> Self {
        Self {
            verb,
            resource_kind: Some(kind),
            resource_name: None,
            namespace: None,
            flags: Vec::new(),
            raw_text: raw_text.into(),
            source: IntentSource::Lexical,
            resolved_from: None,
            other_matches: Vec::new(),
        }
    }

    /// Intent for text that could not be interpreted
    pub fn unknown(raw_text: impl Into<String>) -> Self {
        Self {
            verb: Verb::Unknown,
            resource_kind: None,
            resource_name: None,
            namespace: None,
            flags: Vec::new(),
            raw_text: raw_text.into(),
            source: IntentSource::None,
            resolved_from: None,
            other_matches: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_flag(mut self, flag: IntentFlag) -> Self {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    pub fn has_flag(&self, flag: IntentFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Requested log tail, if any
    pub fn tail_lines(&self) -> Option<u32> {
        self.flags.iter().find_map(|flag| match flag {
            IntentFlag::Tail(lines) => Some(*lines),
            _ => None,
        })
    }

    /// Short human description, e.g. "list pods in kube-system"
    pub fn summary(&self) -> String {
        let mut text = self.verb.to_string();
        if let Some(kind) = &self.resource_kind {
            text.push(' ');
            text.push_str(kind.cli_name());
        }
        if let Some(name) = &self.resource_name {
            text.push(' ');
            text.push_str(name);
        }
        if self.has_flag(IntentFlag::AllNamespaces) {
            text.push_str(" in all namespaces");
        } else if let Some(ns) = &self.namespace {
            text.push_str(" in ");
            text.push_str(ns);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_from_string() {
        assert_eq!(Verb::from("list".to_string()), Verb::List);
        assert_eq!(Verb::from("LIST".to_string()), Verb::Other("LIST".to_string()));
        assert_eq!(Verb::from("delete".to_string()), Verb::Delete);
        assert_eq!(Verb::from(String::new()), Verb::Unknown);
        assert_eq!(
            Verb::from("nuke".to_string()),
            Verb::Other("nuke".to_string())
        );
    }

    #[test]
    fn test_verb_vocabulary_excludes_other() {
        assert_eq!(Verb::from_vocabulary(" Logs "), Some(Verb::Logs));
        assert_eq!(Verb::from_vocabulary("drain"), None);
    }

    #[test]
    fn test_read_only_verbs() {
        assert!(Verb::Get.is_read_only());
        assert!(Verb::Logs.is_read_only());
        assert!(!Verb::Delete.is_read_only());
        assert!(!Verb::Unknown.is_read_only());
        assert!(!Verb::Other("get ".to_string()).is_read_only());
    }

    #[test]
    fn test_kind_synonyms() {
        assert_eq!(ResourceKind::from_token("svc"), Some(ResourceKind::Service));
        assert_eq!(ResourceKind::from_token("PODS"), Some(ResourceKind::Pod));
        assert_eq!(
            ResourceKind::from_token("pvc"),
            Some(ResourceKind::PersistentVolumeClaim)
        );
        assert_eq!(ResourceKind::from_token("widgets"), None);
    }

    #[test]
    fn test_kind_serde_uses_canonical_name() {
        let json = serde_json::to_string(&ResourceKind::Deployment).unwrap();
        assert_eq!(json, "\"deployment\"");
        let kind: ResourceKind = serde_json::from_str("\"deploy\"").unwrap();
        assert_eq!(kind, ResourceKind::Deployment);
        let other: ResourceKind = serde_json::from_str("\"widget\"").unwrap();
        assert_eq!(other, ResourceKind::Other("widget".to_string()));
    }

    #[test]
    fn test_other_never_decodes_to_vocabulary() {
        for word in ["get", "logs", "list", "unknown", ""] {
            let verb = Verb::Other(word.to_string());
            let json = serde_json::to_string(&verb).unwrap();
            assert_eq!(json, format!("\"other:{}\"", word));
            let back: Verb = serde_json::from_str(&json).unwrap();
            assert_eq!(back, verb);
        }
        let kind = ResourceKind::Other("pod".to_string());
        let back: ResourceKind =
            serde_json::from_str(&serde_json::to_string(&kind).unwrap()).unwrap();
        assert_eq!(back, kind);
    }

    #[test]
    fn test_flag_parse_and_display() {
        assert_eq!(
            IntentFlag::try_from("--tail=50".to_string()),
            Ok(IntentFlag::Tail(50))
        );
        assert_eq!(
            IntentFlag::try_from("-A".to_string()),
            Ok(IntentFlag::AllNamespaces)
        );
        assert!(IntentFlag::try_from("--kubeconfig".to_string()).is_err());
        assert_eq!(IntentFlag::Tail(20).to_string(), "tail=20");
    }

    #[test]
    fn test_flag_applicability() {
        assert!(IntentFlag::Wide.applies_to(&Verb::List));
        assert!(!IntentFlag::Wide.applies_to(&Verb::Logs));
        assert!(IntentFlag::Previous.applies_to(&Verb::Logs));
        assert!(!IntentFlag::Tail(5).applies_to(&Verb::Describe));
    }

    #[test]
    fn test_intent_serde_round_trip_keeps_unknown_verb() {
        let intent = Intent::new(
            Verb::Other("drain".to_string()),
            ResourceKind::Node,
            "drain node a",
        )
        .with_name("a");
        let json = serde_json::to_string(&intent).unwrap();
        let back: Intent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, intent);
    }

    #[test]
    fn test_intent_summary() {
        let intent = Intent::new(Verb::List, ResourceKind::Pod, "list pods in kube-system")
            .in_namespace("kube-system");
        assert_eq!(intent.summary(), "list pods in kube-system");
    }
}
