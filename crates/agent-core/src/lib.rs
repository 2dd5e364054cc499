//! # agent-core
//!
//! Composable agents: every agent is a reasoning client of its own catalogs
//! and, at the same time, a tool provider to whoever sits above it.
//!
//! ## Architecture
//!
//! ```text
//!              upstream caller (another agent)
//!                         │ invoke(name, args, recursion)
//! ┌───────────────────────▼─────────────────────────────────────┐
//! │                    AgentComposer                             │
//! │  ┌─────────────────┐        ┌─────────────────────────────┐  │
//! │  │  ServiceBridge  │        │      ReasoningEngine        │  │
//! │  │   (provider)    │        │  (session state machine)    │  │
//! │  └────────┬────────┘        └──────────────┬──────────────┘  │
//! │           └──────────┬─────────────────────┘                 │
//! │            ┌─────────▼─────────┐   ┌──────────────────┐      │
//! │            │  AgentCatalogs    │   │   LlmProvider    │      │
//! │            │ tools+capabilities│   │   (Strategy)     │      │
//! │            └─────────┬─────────┘   └──────────────────┘      │
//! └──────────────────────┼───────────────────────────────────────┘
//!                        │ ProviderConnection
//!              downstream providers (tools, other agents)
//! ```
//!
//! Capabilities run as nested reasoning sessions. The recursion depth rides
//! along with every invocation, so the ceiling holds across a whole chain
//! of agents, not just within one process.

pub mod bridge;
pub mod capability;
pub mod catalog;
pub mod composer;
pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;
pub mod provider;
pub mod reasoning;
pub mod recursion;
pub mod session;
pub mod tool;

pub use bridge::ServiceBridge;
pub use capability::{CapabilityConfig, CapabilityDescriptor, PromptTemplate};
pub use catalog::{AgentCatalogs, CapabilityCatalog, ToolCatalog};
pub use composer::{AgentComposer, AgentComposerBuilder, RootSession};
pub use config::{AgentRole, NodeConfig, ProviderTarget};
pub use connection::{BridgeConnection, ProviderConnection};
pub use error::{AgentError, Result, TemplateError, ToolError};
pub use message::{Message, Role};
pub use protocol::{Arguments, ToolDefinition, ToolOutput};
pub use provider::LlmProvider;
pub use reasoning::{EngineConfig, ReasoningEngine};
pub use recursion::RecursionContext;
pub use session::{ReasoningSession, SessionState};
pub use tool::{Tool, ToolCall, ToolDescriptor};

// Re-exported so callers share the token type without a direct dependency
pub use tokio_util::sync::CancellationToken;
