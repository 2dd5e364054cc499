//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for the reasoning model behind every session
//! (Ollama, OpenAI, Anthropic, test doubles), so the engine never depends on
//! a concrete client.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{LlmProvider, GenerationOptions};
//!
//! let completion = provider.complete(conversation.messages(), &options).await?;
//! if completion.tool_calls.is_empty() { /* final answer */ }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::ToolCall;

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama3.2", "gpt-4", "claude-3-sonnet")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 2048 }
fn default_top_p() -> f32 { 0.9 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
        }
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Structured tool calls, for providers with native function calling.
    /// When empty the engine looks for tool calls inside `content`.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    /// Plain text completion
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Completion that requests the given tool calls
    pub fn with_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            content: String::new(),
            tool_calls: calls,
        }
    }
}

/// Strategy trait for LLM providers
///
/// The reasoning engine works exclusively through this interface. An error
/// from `complete` is unrecoverable for the session that issued it.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Generate a completion from messages
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.temperature, 0.7);
        assert_eq!(opts.max_tokens, 2048);
        assert_eq!(opts.model, "llama3.2");
    }

    #[test]
    fn test_completion_constructors() {
        let text = Completion::text("done");
        assert_eq!(text.content, "done");
        assert!(text.tool_calls.is_empty());

        let calls = Completion::with_tool_calls(vec![ToolCall::new("search")]);
        assert!(calls.content.is_empty());
        assert_eq!(calls.tool_calls[0].name, "search");
    }

    #[test]
    fn test_completion_from_json_without_tool_calls() {
        let completion: Completion = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
        assert_eq!(completion.content, "hi");
        assert!(completion.tool_calls.is_empty());
    }
}
