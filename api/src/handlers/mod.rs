//! API Handlers Module
//!
//! Request handlers for the cluster assistant endpoints.

use axum::{extract::State, http::StatusCode, response::Json};
use kubeassist_core::{AssistantResponse, Pipeline};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::models::{ErrorBody, HealthResponse, QueryRequest};

/// Shared state of the API server
pub struct ApiState {
    /// Query pipeline, stateless and shared by all requests
    pub pipeline: Pipeline,
}

impl ApiState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }
}

/// Service health check
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("kubeassist-api"))
}

/// Assistant health check
pub async fn assistant_health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("k8s-assistant"))
}

/// Answer a natural-language cluster query
///
/// Denials and clarifications are 200 responses with an `error` field. Only
/// internal faults map to 500, with no detail in the body.
pub async fn process_query(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<AssistantResponse>, (StatusCode, Json<ErrorBody>)> {
    // Dropping this future (client gone) cancels the pipeline.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.pipeline.handle(&request.query, &cancel).await {
        Ok(response) => Ok(Json(response)),
        Err(e) if e.is_cancelled() => {
            info!("Query cancelled");
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::internal())))
        }
        Err(e) => {
            error!("Failed to process query: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::internal())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::create_router;
    use axum::body::Body;
    use axum::http::Request;
    use kubeassist_core::config::AssistantConfig;
    use serde_json::Value;
    use tower::ServiceExt;

    fn router(binary: &str) -> axum::Router {
        let mut config = AssistantConfig::default();
        config.cluster.binary = binary.to_string();
        config.cluster.resolve_names = false;
        let state = Arc::new(ApiState::new(Pipeline::from_config(&config)));
        create_router(state, config.server.max_body_bytes)
    }

    fn query(text: &str) -> Request<Body> {
        let body = serde_json::json!({ "query": text }).to_string();
        Request::builder()
            .method("POST")
            .uri("/api/k8s/query")
            .header("content-type", "application/json")
            .header("content-length", body.len())
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        for uri in ["/health", "/api/k8s/health"] {
            let response = router("kubectl")
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["status"], "healthy");
        }
    }

    #[tokio::test]
    async fn test_denial_is_200() {
        let response = router("kubeassist-no-such-binary-12345")
            .oneshot(query("delete pod frontend-123"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body["error"],
            "only read-only inspection commands are permitted"
        );
        assert!(body["suggestion"].as_str().unwrap().contains("describe"));
        assert_eq!(body["parsed_intent"]["verb"], "delete");
        assert!(body.get("enhanced_response").is_none());
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_clarify_is_200() {
        let response = router("kubeassist-no-such-binary-12345")
            .oneshot(query("blah blah"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("rephrase"));
    }

    #[tokio::test]
    async fn test_internal_failure_hides_detail() {
        let response = router("kubeassist-no-such-binary-12345")
            .oneshot(query("list all pods"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body, serde_json::json!({ "error": "internal error" }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_response() {
        let response = router("echo")
            .oneshot(query("list all pods"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["raw_response"], "get pods -n default");
        assert_eq!(body["parsed_intent"]["resource_kind"], "pod");
        assert_eq!(body["query"], "list all pods");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let big = "a".repeat(32 * 1024);
        let response = router("kubectl").oneshot(query(&big)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_malformed_body_is_client_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/k8s/query")
            .header("content-type", "application/json")
            .body(Body::from("{\"q\": 1}"))
            .unwrap();
        let response = router("kubectl").oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
