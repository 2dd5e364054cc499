//! Provider Connections
//!
//! One live session to one external tool provider. Transports (HTTP, stdio,
//! in-process) implement [`ProviderConnection`]; the rest of the crate only
//! sees discovery and invocation.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::bridge::ServiceBridge;
use crate::error::{AgentError, Result};
use crate::protocol::{Arguments, ToolDefinition, ToolOutput};
use crate::recursion::RecursionContext;

/// A session with a tool provider
///
/// `invoke` forwards exactly one call and never retries. A tool that fails on
/// the provider side comes back as `Ok` with `is_error` set; `Err` means the
/// exchange itself failed (`Transport`) or the connection is gone
/// (`Connection`).
#[async_trait]
pub trait ProviderConnection: Send + Sync {
    /// Stable name of the provider, used as the tool origin
    fn identity(&self) -> &str;

    /// Query the provider's catalog
    async fn discover(&self) -> Result<Vec<ToolDefinition>>;

    /// Invoke one tool, carrying the caller's delegation depth
    async fn invoke(
        &self,
        name: &str,
        arguments: &Arguments,
        recursion: &RecursionContext,
    ) -> Result<ToolOutput>;

    /// Whether the connection is still usable
    fn is_connected(&self) -> bool;

    /// Tear the connection down; tools sourced from it stop working
    async fn close(&self) -> Result<()>;
}

/// Connection to a [`ServiceBridge`] living in the same process
pub struct BridgeConnection {
    identity: String,
    bridge: Arc<ServiceBridge>,
    connected: AtomicBool,
}

impl BridgeConnection {
    pub fn new(identity: impl Into<String>, bridge: Arc<ServiceBridge>) -> Self {
        Self {
            identity: identity.into(),
            bridge,
            connected: AtomicBool::new(true),
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(AgentError::Connection {
                provider: self.identity.clone(),
                reason: "connection closed".into(),
            })
        }
    }
}

#[async_trait]
impl ProviderConnection for BridgeConnection {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn discover(&self) -> Result<Vec<ToolDefinition>> {
        self.ensure_connected()?;
        Ok(self.bridge.list_offered_tools())
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: &Arguments,
        recursion: &RecursionContext,
    ) -> Result<ToolOutput> {
        self.ensure_connected()?;
        let outcome = self.bridge
            .handle_invocation(name, arguments.clone(), Some(*recursion))
            .await;
        Ok(outcome.unwrap_or_else(ToolOutput::from))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
