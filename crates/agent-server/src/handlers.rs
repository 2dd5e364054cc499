//! HTTP Handlers
//!
//! The provider protocol (`/tools`, `/tools/call`) plus a direct chat
//! endpoint that starts a root session on this node.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use agent_core::protocol::{DiscoveryResponse, InvocationRequest, ToolOutput};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub agent: String,
    pub tools: usize,
    pub max_depth: u32,
}

/// There is no conversation store: each request is a fresh root session
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    /// Id of the root session that produced `message`, for log correlation
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(rejection: &JsonRejection) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: rejection.body_text(),
            code: "BAD_REQUEST".into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        agent: state.bridge.name().to_string(),
        tools: state.bridge.list_offered_tools().len(),
        max_depth: state.bridge.max_depth(),
    })
}

/// Discovery: tools and capabilities offered by this node
pub async fn list_tools(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        tools: state.bridge.list_offered_tools(),
    })
}

/// Invocation: tool-level failures are a 200 with `is_error` set
pub async fn call_tool(
    State(state): State<AppState>,
    payload: Result<Json<InvocationRequest>, JsonRejection>,
) -> Result<Json<ToolOutput>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!("Rejected invocation: {}", rejection.body_text());
        bad_request(&rejection)
    })?;

    let output = state
        .bridge
        .handle_invocation(&request.name, request.arguments, request.recursion)
        .await
        .unwrap_or_else(ToolOutput::from);

    Ok(Json(output))
}

/// Direct request: runs a root session on this node. The session is
/// cancelled if the client goes away before it finishes.
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| bad_request(&rejection))?;

    let mut root = state.composer.start_session(&payload.message);
    let session_id = root.session().id.to_string();
    let cancel = state.composer.shutdown_token().child_token();
    let _guard = cancel.clone().drop_guard();

    let response = state.composer.run_session(&mut root, &cancel).await.map_err(|e| {
        tracing::error!(session = %session_id, "Agent error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.user_message(),
                code: "AGENT_ERROR".into(),
            }),
        )
    })?;

    Ok(Json(ChatResponse {
        message: response,
        session_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router;
    use agent_core::provider::{Completion, GenerationOptions};
    use agent_core::tool::CalculatorTool;
    use agent_core::{AgentComposer, CapabilityConfig, LlmProvider, Message, Result};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct ParrotModel;

    #[async_trait]
    impl LlmProvider for ParrotModel {
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(&self, messages: &[Message], _options: &GenerationOptions) -> Result<Completion> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(Completion::text(format!("parrot: {}", last)))
        }
    }

    async fn state() -> AppState {
        let composer = AgentComposer::builder()
            .name("test-node")
            .model(Arc::new(ParrotModel))
            .local_tool(Arc::new(CalculatorTool))
            .capability(CapabilityConfig {
                name: "explain".into(),
                description: "Explain a topic".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": { "topic": { "type": "string" } },
                    "required": ["topic"]
                }),
                prompt_template: "Explain {topic}".into(),
            })
            .max_depth(1)
            .build()
            .await
            .unwrap();
        AppState::new(Arc::new(composer))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state().await).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_discovery_lists_capabilities_as_tools() {
        let (status, body) = send(Request::get("/tools").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body["tools"].as_array().unwrap().iter().map(|t| t["name"].clone()).collect();
        assert_eq!(names, vec![json!("calculate"), json!("explain")]);
    }

    #[tokio::test]
    async fn test_call_capability() {
        let (status, body) = send(post("/tools/call", r#"{"name": "explain", "arguments": {"topic": "tides"}}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "parrot: Explain tides");
        assert_eq!(body["is_error"], false);
    }

    #[tokio::test]
    async fn test_tool_errors_are_results() {
        let request = r#"{"name": "explain", "arguments": {"topic": "x"}, "recursion": {"current_depth": 1, "max_depth": 4}}"#;
        let (status, body) = send(post("/tools/call", request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_error"], true);
        assert!(body["content"].as_str().unwrap().contains("Recursion limit exceeded"));

        let (status, body) = send(post("/tools/call", r#"{"name": "nope"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_error"], true);
    }

    #[tokio::test]
    async fn test_malformed_invocation_is_bad_request() {
        let (status, body) = send(post("/tools/call", r#"{"arguments": {}}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, _) = send(post("/tools/call", "not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_and_chat() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["agent"], "test-node");
        assert_eq!(body["tools"], 2);

        let (status, body) = send(post("/api/chat", r#"{"message": "hello"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "parrot: hello");
        assert_eq!(body["session_id"].as_str().unwrap().len(), 36);
        assert!(body.get("conversation_id").is_none());
    }
}
