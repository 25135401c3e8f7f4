//! Pipeline scenario tests
//!
//! End-to-end runs through extraction, policy, execution and synthesis:
//! - A. Allowed list query runs and returns output
//! - B. Mutating query is denied, nothing runs
//! - C. Unrecognized query asks for clarification
//! - D. Slow command is reported as a timeout
//! - E. Summary unavailable, raw output still returned
//! - F. Metacharacters in a name or namespace are refused
//!
//! `echo` stands in for kubectl so the rendered argument vector comes back
//! as output.

use std::sync::Arc;

use kubeassist_core::llm::{GenerationError, StubGenerator};
use kubeassist_core::{AssistantConfig, Pipeline, PipelineStage, ResourceKind, Verb};
use tokio_util::sync::CancellationToken;

const MISSING_BINARY: &str = "kubeassist-no-such-binary-12345";

fn config(binary: &str) -> AssistantConfig {
    let mut config = AssistantConfig::default();
    config.cluster.binary = binary.to_string();
    config.cluster.resolve_names = false;
    config
}

#[cfg(unix)]
#[tokio::test]
async fn scenario_a_list_all_pods() {
    let pipeline = Pipeline::from_config(&config("echo"));
    let outcome = pipeline
        .run("list all pods", &CancellationToken::new())
        .await
        .unwrap();

    let intent = outcome.response.parsed_intent().unwrap();
    assert_eq!(intent.verb, Verb::List);
    assert_eq!(intent.resource_kind, Some(ResourceKind::Pod));

    assert!(outcome.response.is_success());
    assert!(outcome.response.error().is_none());
    assert_eq!(outcome.response.raw_response(), Some("get pods -n default"));
    assert!(outcome.stages.contains(&PipelineStage::Executed));
    assert_eq!(outcome.executed.unwrap().program(), "echo");
}

#[tokio::test]
async fn scenario_b_delete_is_denied() {
    let stub = Arc::new(StubGenerator::fixed("should not be used"));
    let pipeline = Pipeline::with_generator(&config(MISSING_BINARY), Some(stub.clone()));
    let outcome = pipeline
        .run("delete pod frontend-123", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        outcome.response.error(),
        Some("only read-only inspection commands are permitted")
    );
    let json = serde_json::to_value(&outcome.response).unwrap();
    let suggestion = json["suggestion"].as_str().unwrap();
    assert!(suggestion.contains("describe pod frontend-123"));
    assert_eq!(json["parsed_intent"]["verb"], "delete");

    assert!(outcome.executed.is_none());
    assert!(!outcome.stages.contains(&PipelineStage::Executed));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn scenario_c_gibberish_asks_to_rephrase() {
    let pipeline = Pipeline::from_config(&config(MISSING_BINARY));
    let outcome = pipeline
        .run("blah blah", &CancellationToken::new())
        .await
        .unwrap();

    assert!(!outcome.response.is_success());
    assert!(outcome.response.error().unwrap().contains("rephrase"));
    assert_eq!(
        outcome.response.parsed_intent().map(|intent| &intent.verb),
        Some(&Verb::Unknown)
    );
    assert!(outcome.executed.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn scenario_d_timeout_is_reported() {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("slow-kubectl");
    {
        let mut file = std::fs::File::create(&script).unwrap();
        writeln!(file, "#!/bin/sh\nexec sleep 30").unwrap();
    }
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut config = config(script.to_str().unwrap());
    config.cluster.command_timeout_seconds = 1;
    let pipeline = Pipeline::from_config(&config);

    let started = std::time::Instant::now();
    let outcome = pipeline
        .run("list pods", &CancellationToken::new())
        .await
        .unwrap();
    assert!(started.elapsed() < std::time::Duration::from_secs(10));

    let raw = outcome.response.raw_response().unwrap();
    assert!(raw.contains("timed out after 1s"), "raw: {}", raw);
    assert!(outcome.response.error().is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn scenario_e_summary_unavailable() {
    let stub = Arc::new(StubGenerator::failing(GenerationError::Unavailable(
        "connection refused".to_string(),
    )));
    let pipeline = Pipeline::with_generator(&config("echo"), Some(stub.clone()));
    let outcome = pipeline
        .run("list all pods", &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.response.is_success());
    assert_eq!(outcome.response.raw_response(), Some("get pods -n default"));
    assert!(outcome.response.enhanced_response().is_none());
    assert!(outcome.response.error().is_none());
    assert_eq!(stub.call_count(), 1);

    let json = serde_json::to_value(&outcome.response).unwrap();
    assert!(json.get("enhanced_response").is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn summary_is_attached_when_available() {
    let stub = Arc::new(StubGenerator::fixed("No pods need attention."));
    let pipeline = Pipeline::with_generator(&config("echo"), Some(stub));
    let response = pipeline
        .handle("list all pods", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.enhanced_response(), Some("No pods need attention."));
}

#[tokio::test]
async fn metacharacters_in_name_or_namespace_are_refused() {
    let pipeline = Pipeline::from_config(&config(MISSING_BINARY));
    let cancel = CancellationToken::new();
    for (query, reason) in [
        ("describe pod web;id", "invalid resource name"),
        ("describe pod web$(id)", "invalid resource name"),
        ("list pods -n prod$(id)", "invalid namespace"),
        ("list pods -n prod|id", "invalid namespace"),
    ] {
        let outcome = pipeline.run(query, &cancel).await.unwrap();
        assert!(outcome.executed.is_none(), "{:?} executed", query);
        assert_eq!(outcome.response.error(), Some(reason), "{:?}", query);
        let verb = &outcome.response.parsed_intent().unwrap().verb;
        assert!(verb.is_read_only(), "{:?} parsed as {:?}", query, verb);
    }
}

#[tokio::test]
async fn extraction_is_deterministic() {
    let pipeline = Pipeline::from_config(&config(MISSING_BINARY));
    let cancel = CancellationToken::new();
    let first = pipeline.handle("delete deployment api", &cancel).await.unwrap();
    let second = pipeline.handle("delete deployment api", &cancel).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn cancelled_request_is_an_error() {
    let pipeline = Pipeline::from_config(&config(MISSING_BINARY));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = pipeline.run("list pods", &cancel).await;
    assert!(matches!(result, Err(e) if e.is_cancelled()));
}
