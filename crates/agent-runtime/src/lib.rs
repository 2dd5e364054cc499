//! # agent-runtime
//!
//! Concrete collaborators for `agent-core`.
//!
//! ## Providers
//!
//! - **Ollama** (default): reasoning model backed by local Ollama inference
//! - **HTTP**: tool provider connection speaking the discovery/invocation
//!   protocol over HTTP
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{HttpProviderConnection, OllamaProvider};
//!
//! let agent = AgentComposer::builder()
//!     .model(Arc::new(OllamaProvider::from_env()))
//!     .connection(Arc::new(HttpProviderConnection::new("search", "http://localhost:3001", timeout)?))
//!     .build()
//!     .await?;
//! ```

pub mod http;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use http::HttpProviderConnection;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use agent_core::{
    AgentComposer, AgentError, LlmProvider, Message, ProviderConnection, Result, Role, Tool,
};
