//! Error Types
//!
//! Two layers of failure exist. [`AgentError`] ends a reasoning session (or
//! an agent operation) and travels up to whoever awaits it. [`ToolError`]
//! never ends a session: it is rendered into the conversation as a failed
//! tool result so the model can react to it.

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// A tool provider could not be reached or returned a malformed catalog
    #[error("Connection to '{provider}' failed: {reason}")]
    Connection { provider: String, reason: String },

    /// Protocol-level failure while talking to a provider (includes timeouts)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Name not present in any catalog
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Catalog already holds an entry with this name
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Capability template rejected at load time
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Maximum iterations reached in reasoning loop
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Session was cancelled before reaching a terminal state
    #[error("Session cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable.
    ///
    /// The core never retries on its own; callers use this to decide.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::Connection { .. }
                | AgentError::Transport(_)
                | AgentError::Io(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(msg) => format!("The AI service encountered an error: {}", msg),
            AgentError::Connection { provider, .. } => format!("The tool provider '{}' is unreachable.", provider),
            AgentError::Transport(_) => "A downstream tool provider stopped responding.".into(),
            AgentError::ToolNotFound(name) => format!("The tool '{}' is not available.", name),
            AgentError::MaxIterations(_) => "The request took too long to process. Please try a simpler query.".into(),
            AgentError::Cancelled => "The request was cancelled.".into(),
            AgentError::Config(msg) => format!("Configuration problem: {}", msg),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

/// Failures that become tool-result content instead of ending the session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Unknown tool or capability requested by the model
    #[error("No tool or capability named '{0}'")]
    NotFound(String),

    /// Capability arguments did not satisfy the prompt template
    #[error("{0}")]
    Template(#[from] TemplateError),

    /// Delegation would exceed the configured depth ceiling
    #[error("Recursion limit exceeded: depth {depth} is above the maximum of {max_depth}")]
    RecursionLimitExceeded { depth: u32, max_depth: u32 },

    /// The tool or the nested session itself failed
    #[error("Execution failed: {0}")]
    Execution(String),

    /// The invocation was in flight when its session was cancelled
    #[error("Invocation cancelled")]
    Cancelled,
}

/// Prompt template problems
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Unbalanced braces or an invalid placeholder name
    #[error("Malformed template at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },

    /// Placeholder that the input schema does not declare
    #[error("Placeholder '{{{0}}}' is not a declared input property")]
    UnknownPlaceholder(String),

    /// Argument required by the template or schema but not supplied
    #[error("Missing required argument '{0}'")]
    MissingArgument(String),
}
