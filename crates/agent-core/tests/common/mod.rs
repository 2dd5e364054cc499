//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use agent_core::provider::{Completion, GenerationOptions};
use agent_core::tool::{ParameterSchema, ToolSchema};
use agent_core::{
    AgentComposer, Arguments, BridgeConnection, CapabilityConfig, LlmProvider, Message, ProviderConnection, Result,
    Role, Tool, ToolCall, ToolOutput,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

/// Model that delegates the user prompt to one tool, then reports the tool
/// result as its answer. Without a tool it answers directly.
pub struct DelegatingModel {
    label: String,
    tool: Option<(String, String)>,
    calls: AtomicUsize,
}

impl DelegatingModel {
    /// Call `tool` with `{argument: <user prompt>}`
    pub fn delegate(label: &str, tool: &str, argument: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            tool: Some((tool.into(), argument.into())),
            calls: AtomicUsize::new(0),
        })
    }

    /// Answer every prompt directly
    pub fn answering(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            tool: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for DelegatingModel {
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(&self, messages: &[Message], _options: &GenerationOptions) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(last) = messages.last() else {
            return Ok(Completion::text(format!("{}: empty", self.label)));
        };

        match (&self.tool, last.role) {
            (Some((tool, argument)), Role::User) => Ok(Completion::with_tool_calls(vec![
                ToolCall::new(tool.as_str()).with_argument(argument.as_str(), last.content.clone()),
            ])),
            _ => Ok(Completion::text(format!("{}: {}", self.label, last.content))),
        }
    }
}

/// Model that never answers; counts how many pending calls were dropped
pub struct HangingModel {
    pub started: Arc<Notify>,
    pub dropped: Arc<AtomicUsize>,
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmProvider for HangingModel {
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(&self, _messages: &[Message], _options: &GenerationOptions) -> Result<Completion> {
        let _counter = DropCounter(self.dropped.clone());
        self.started.notify_one();
        std::future::pending::<Result<Completion>>().await
    }
}

/// Local tool returning canned search results
pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search".into(),
            description: "Search the web".into(),
            parameters: vec![ParameterSchema::new("query", "string", "Search query").required()],
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput> {
        let query = call.arguments.get("query").and_then(Value::as_str).unwrap_or_default();
        Ok(ToolOutput::success(format!("results for '{}'", query)))
    }
}

/// Capability with one required string input
pub fn capability(name: &str, input: &str, template: &str) -> CapabilityConfig {
    CapabilityConfig {
        name: name.into(),
        description: format!("{} capability", name),
        input_schema: json!({
            "type": "object",
            "properties": { input: { "type": "string" } },
            "required": [input]
        }),
        prompt_template: template.into(),
    }
}

/// In-process connection to another agent's bridge
pub fn connect(identity: &str, agent: &AgentComposer) -> Arc<dyn ProviderConnection> {
    Arc::new(BridgeConnection::new(identity, agent.bridge()))
}

pub fn args(value: Value) -> Arguments {
    value.as_object().cloned().unwrap_or_default()
}
