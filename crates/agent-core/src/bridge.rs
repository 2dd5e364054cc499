//! Service Bridge
//!
//! The provider-facing side of an agent. It advertises the tool catalog plus
//! every capability as a plain tool, and executes inbound invocations against
//! the same catalog snapshot the local reasoning engine uses.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogHandle;
use crate::error::ToolError;
use crate::protocol::{Arguments, ToolDefinition, ToolOutput};
use crate::provider::LlmProvider;
use crate::reasoning::{EngineConfig, ReasoningEngine};
use crate::recursion::RecursionContext;
use crate::tool::ToolCall;

pub struct ServiceBridge {
    name: String,
    model: Arc<dyn LlmProvider>,
    catalogs: CatalogHandle,
    engine_config: Arc<EngineConfig>,
    max_depth: u32,
    shutdown: CancellationToken,
}

impl ServiceBridge {
    /// Bridge over `catalogs`; every inbound session is a child of `shutdown`
    pub fn new(
        name: impl Into<String>,
        model: Arc<dyn LlmProvider>,
        catalogs: CatalogHandle,
        engine_config: Arc<EngineConfig>,
        max_depth: u32,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            catalogs,
            engine_config,
            max_depth,
            shutdown,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Tools then capabilities, in registration order
    pub fn list_offered_tools(&self) -> Vec<ToolDefinition> {
        self.catalogs.snapshot().offered_tools()
    }

    /// Execute one inbound invocation.
    ///
    /// Dropping the returned future cancels any nested session it started.
    pub async fn handle_invocation(
        &self,
        name: &str,
        arguments: Arguments,
        inbound: Option<RecursionContext>,
    ) -> Result<ToolOutput, ToolError> {
        let cancel = self.shutdown.child_token();
        let _guard = cancel.clone().drop_guard();
        self.handle_invocation_with_cancel(name, arguments, inbound, &cancel).await
    }

    /// Like [`Self::handle_invocation`], under a caller-supplied token
    pub async fn handle_invocation_with_cancel(
        &self,
        name: &str,
        arguments: Arguments,
        inbound: Option<RecursionContext>,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ToolError> {
        // A caller that sends no context starts a fresh chain
        let recursion = inbound.map_or_else(
            || RecursionContext::root(self.max_depth),
            |ctx| ctx.with_ceiling(self.max_depth),
        );

        tracing::info!(
            agent = %self.name,
            tool = %name,
            depth = recursion.current_depth,
            max_depth = recursion.max_depth,
            "Inbound invocation"
        );

        let engine = ReasoningEngine::new(
            self.model.clone(),
            self.catalogs.snapshot(),
            self.engine_config.clone(),
        );

        let mut call = ToolCall::new(name);
        call.arguments = arguments;

        match engine.invoke(&call, recursion, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(agent = %self.name, tool = %name, error = %e, "Inbound invocation failed");
                Err(ToolError::Execution(e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for ServiceBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBridge")
            .field("name", &self.name)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityDescriptor;
    use crate::catalog::{AgentCatalogs, CapabilityCatalog, ToolCatalog};
    use crate::error::{Result, TemplateError};
    use crate::message::Message;
    use crate::provider::{Completion, GenerationOptions};
    use crate::tool::CalculatorTool;
    use async_trait::async_trait;
    use serde_json::json;

    /// Answers every prompt by echoing the last user message
    struct EchoModel;

    #[async_trait]
    impl LlmProvider for EchoModel {
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(&self, messages: &[Message], _options: &GenerationOptions) -> Result<Completion> {
            let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(Completion::text(format!("echo: {}", prompt)))
        }
    }

    fn bridge(max_depth: u32) -> ServiceBridge {
        let mut tools = ToolCatalog::new();
        tools.register_local(Arc::new(CalculatorTool)).unwrap();
        let mut capabilities = CapabilityCatalog::new();
        capabilities
            .register(
                CapabilityDescriptor::new(
                    "summarize",
                    "Summarize a topic",
                    json!({
                        "type": "object",
                        "properties": {"topic": {"type": "string"}},
                        "required": ["topic"]
                    }),
                    "Summarize {topic}.",
                )
                .unwrap(),
            )
            .unwrap();

        ServiceBridge::new(
            "bridge",
            Arc::new(EchoModel),
            CatalogHandle::new(AgentCatalogs::new(tools, capabilities)),
            Arc::new(EngineConfig::default()),
            max_depth,
            CancellationToken::new(),
        )
    }

    fn args(value: serde_json::Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_capabilities_offered_as_tools() {
        let offered = bridge(2).list_offered_tools();
        let names: Vec<_> = offered.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["calculate", "summarize"]);
        assert_eq!(offered[1].input_schema["required"][0], "topic");
    }

    #[tokio::test]
    async fn test_plain_tool_runs_directly() {
        let output = bridge(0)
            .handle_invocation("calculate", args(json!({"expression": "1 + 2"})), None)
            .await
            .unwrap();
        assert_eq!(output.content, "1 + 2 = 3");
        assert!(!output.is_error);
    }

    #[tokio::test]
    async fn test_capability_runs_nested_session() {
        let output = bridge(2)
            .handle_invocation("summarize", args(json!({"topic": "tides"})), None)
            .await
            .unwrap();
        assert_eq!(output.content, "echo: Summarize tides.");
    }

    #[tokio::test]
    async fn test_inbound_depth_is_respected() {
        let lenient = bridge(5);
        let inbound = RecursionContext { current_depth: 1, max_depth: 1 };
        let err = lenient
            .handle_invocation("summarize", args(json!({"topic": "tides"})), Some(inbound))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::RecursionLimitExceeded { depth: 2, max_depth: 1 });

        // Local ceiling is stricter than the caller's
        let inbound = RecursionContext { current_depth: 0, max_depth: 9 };
        let strict = bridge(0);
        assert!(matches!(
            strict.handle_invocation("summarize", args(json!({"topic": "x"})), Some(inbound)).await,
            Err(ToolError::RecursionLimitExceeded { depth: 1, max_depth: 0 })
        ));
    }

    #[tokio::test]
    async fn test_missing_template_argument() {
        let err = bridge(2).handle_invocation("summarize", Arguments::new(), None).await.unwrap_err();
        assert_eq!(err, ToolError::Template(TemplateError::MissingArgument("topic".into())));
    }

    #[tokio::test]
    async fn test_unknown_name() {
        let err = bridge(2).handle_invocation("nope", Arguments::new(), None).await.unwrap_err();
        assert_eq!(err, ToolError::NotFound("nope".into()));
    }
}
