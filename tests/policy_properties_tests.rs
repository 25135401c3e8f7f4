//! Policy property tests
//!
//! Tests for:
//! - A. Default deny for every verb outside the read-only set
//! - B. Denied intents re-evaluate to the same denial after serialization
//! - C. Shell metacharacters in name or namespace never become syntax
//! - D. Restrictive and permissive presets

use kubeassist_core::policy::{is_valid_namespace, is_valid_resource_name};
use kubeassist_core::{
    Intent, IntentExtractor, IntentFlag, PolicyConfig, PolicyDecision, PolicyEngine, ResourceKind,
    Verb,
};

fn engine() -> PolicyEngine {
    PolicyEngine::new(PolicyConfig::default(), "kubectl")
}

const METACHARACTER_VALUES: &[&str] = &[
    "web; rm -rf /",
    "web|cat",
    "web&&reboot",
    "$(id)",
    "`id`",
    "web)",
    "--kubeconfig=/etc/passwd",
    "-o",
    "web\nid",
    "",
];

#[test]
fn every_non_read_verb_is_denied() {
    let engine = engine();
    let mut verbs = vec![
        Verb::Delete,
        Verb::Apply,
        Verb::Create,
        Verb::Edit,
        Verb::Patch,
        Verb::Exec,
        Verb::Scale,
    ];
    for word in ["restart", "drain", "GET", "List", "", "get ", "logs;"] {
        verbs.push(Verb::Other(word.to_string()));
    }

    for verb in verbs {
        for kind in [ResourceKind::Pod, ResourceKind::Deployment, ResourceKind::Node] {
            let intent = Intent::new(verb.clone(), kind, "synthetic").with_name("web-1");
            let decision = engine.evaluate(&intent);
            assert!(
                matches!(decision, PolicyDecision::Deny { .. }),
                "{:?} was not denied: {:?}",
                verb,
                decision
            );
        }
    }
}

#[test]
fn read_verbs_are_allowed() {
    let engine = engine();
    for verb in [Verb::Get, Verb::List, Verb::Describe, Verb::Logs] {
        let intent = Intent::new(verb.clone(), ResourceKind::Pod, "synthetic").with_name("web-1");
        assert!(engine.evaluate(&intent).is_allow(), "{:?} was not allowed", verb);
    }
}

#[test]
fn denied_intent_round_trips_to_same_decision() {
    let engine = engine();
    let extractor = IntentExtractor::new("default");
    let mut intents = Vec::new();
    for text in [
        "delete pod frontend-123",
        "scale deployment api",
        "restart the deployment api",
        "show secrets",
        "exec into pod web-1",
    ] {
        intents.push(
            extractor
                .extract_lexical(text)
                .unwrap_or_else(|| panic!("no lexical intent for {:?}", text)),
        );
    }
    for word in ["get", "logs", "list", "describe", ""] {
        intents.push(
            Intent::new(Verb::Other(word.to_string()), ResourceKind::Pod, "synthetic")
                .with_name("web-1")
                .in_namespace("default"),
        );
    }
    for word in ["pod", "pods", "service"] {
        intents.push(
            Intent::new(Verb::Get, ResourceKind::Other(word.to_string()), "synthetic")
                .with_name("web-1")
                .in_namespace("default"),
        );
    }

    for intent in intents {
        let first = engine.evaluate(&intent);
        assert!(matches!(first, PolicyDecision::Deny { .. }), "{:?}", intent);

        let json = serde_json::to_string(&intent).unwrap();
        let restored: Intent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, intent);
        assert_eq!(engine.evaluate(&restored), first, "{:?}", intent);
    }
}

#[test]
fn metacharacters_never_render_as_arguments() {
    let engine = engine();
    for value in METACHARACTER_VALUES {
        let named = Intent::new(Verb::Describe, ResourceKind::Pod, "synthetic").with_name(*value);
        match engine.evaluate(&named) {
            PolicyDecision::Allow(command) => {
                panic!("name {:?} rendered as {:?}", value, command.args())
            }
            PolicyDecision::Deny { reason, .. } => {
                assert_eq!(reason, "invalid resource name", "name {:?}", value)
            }
            PolicyDecision::Clarify { .. } => {}
        }

        let scoped = Intent::new(Verb::List, ResourceKind::Pod, "synthetic").in_namespace(*value);
        assert!(
            !engine.evaluate(&scoped).is_allow(),
            "namespace {:?} was allowed",
            value
        );
    }
}

#[test]
fn validators_reject_metacharacters() {
    for value in METACHARACTER_VALUES {
        assert!(!is_valid_namespace(value), "{:?}", value);
        assert!(!is_valid_resource_name(value), "{:?}", value);
    }
    assert!(is_valid_namespace("kube-system"));
    assert!(is_valid_resource_name("frontend-7d9f8.abc"));
}

#[test]
fn allowed_command_is_an_argument_vector() {
    let engine = engine();
    let intent = Intent::new(Verb::Logs, ResourceKind::Pod, "synthetic")
        .with_name("web-1")
        .in_namespace("shop")
        .with_flag(IntentFlag::Tail(50));
    match engine.evaluate(&intent) {
        PolicyDecision::Allow(command) => {
            assert_eq!(command.program(), "kubectl");
            assert_eq!(command.args(), ["logs", "web-1", "-n", "shop", "--tail=50"]);
        }
        other => panic!("expected allow, got {:?}", other),
    }
}

#[test]
fn restrictive_preset_narrows_verbs() {
    let engine = PolicyEngine::new(PolicyConfig::restrictive(), "kubectl");
    let logs = Intent::new(Verb::Logs, ResourceKind::Pod, "synthetic").with_name("web-1");
    assert!(!engine.evaluate(&logs).is_allow());

    let permissive = PolicyEngine::new(PolicyConfig::permissive(), "kubectl");
    assert!(permissive.evaluate(&logs).is_allow());
    // Whatever the preset allows, it stays inside the read-only set.
    for verb in engine.config().effective_verbs() {
        assert!(verb.is_read_only());
    }
}
