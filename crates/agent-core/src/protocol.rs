//! Wire Types
//!
//! Shapes exchanged with tool providers: one discovery call returning an
//! ordered tool list, and one invocation call returning `{content, is_error}`.
//! The same shapes are served by [`ServiceBridge`](crate::bridge::ServiceBridge).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;
use crate::recursion::RecursionContext;

/// Structured tool arguments
pub type Arguments = Map<String, Value>;

/// A tool as advertised over the protocol
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// JSON Schema object describing the arguments
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

pub(crate) fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// Response to the discovery call
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    pub tools: Vec<ToolDefinition>,
}

/// Body of the invocation call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub name: String,

    #[serde(default)]
    pub arguments: Arguments,

    /// Delegation depth of the caller; absent for callers outside any session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursion: Option<RecursionContext>,
}

/// Result of one invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: String,

    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

impl From<ToolError> for ToolOutput {
    fn from(err: ToolError) -> Self {
        Self::failure(err.to_string())
    }
}
