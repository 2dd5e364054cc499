//! HTTP Provider Connection
//!
//! Talks to a tool provider (usually another agent's service bridge) over
//! the JSON binding of the discovery/invocation protocol:
//!
//! - `GET  {base}/tools`      → `{"tools": [{name, description, input_schema}]}`
//! - `POST {base}/tools/call` ← `{name, arguments, recursion}` → `{content, is_error}`

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use agent_core::{
    config::ProviderTarget,
    connection::ProviderConnection,
    error::{AgentError, Result},
    protocol::{Arguments, DiscoveryResponse, InvocationRequest, ToolDefinition, ToolOutput},
    recursion::RecursionContext,
};
use async_trait::async_trait;

/// Connection to one HTTP tool provider
pub struct HttpProviderConnection {
    identity: String,
    base_url: String,
    client: reqwest::Client,
    connected: AtomicBool,
}

impl HttpProviderConnection {
    /// Every request made through this connection is bounded by `timeout`
    pub fn new(identity: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url: String = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            identity: identity.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            connected: AtomicBool::new(true),
        })
    }

    pub fn from_target(target: &ProviderTarget) -> Result<Self> {
        Self::new(target.name.clone(), target.url.clone(), target.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn connection_error(&self, reason: impl Into<String>) -> AgentError {
        AgentError::Connection {
            provider: self.identity.clone(),
            reason: reason.into(),
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(self.connection_error("connection closed"))
        }
    }
}

#[async_trait]
impl ProviderConnection for HttpProviderConnection {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn discover(&self) -> Result<Vec<ToolDefinition>> {
        self.ensure_connected()?;

        let response = self
            .client
            .get(self.url("/tools"))
            .send()
            .await
            .map_err(|e| self.connection_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.connection_error(format!("discovery returned {}", response.status())));
        }

        let catalog: DiscoveryResponse = response
            .json()
            .await
            .map_err(|e| self.connection_error(format!("malformed catalog: {}", e)))?;

        tracing::debug!(provider = %self.identity, tools = catalog.tools.len(), "Discovered tools");
        Ok(catalog.tools)
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: &Arguments,
        recursion: &RecursionContext,
    ) -> Result<ToolOutput> {
        self.ensure_connected()?;

        let request = InvocationRequest {
            name: name.to_string(),
            arguments: arguments.clone(),
            recursion: Some(*recursion),
        };

        tracing::debug!(provider = %self.identity, tool = %name, depth = recursion.current_depth, "Invoking");

        let response = self
            .client
            .post(self.url("/tools/call"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Transport(format!("'{}' on '{}' timed out", name, self.identity))
                } else {
                    AgentError::Transport(format!("'{}' on '{}': {}", name, self.identity, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Transport(format!(
                "'{}' on '{}' returned {}: {}",
                name, self.identity, status, body
            )));
        }

        response
            .json::<ToolOutput>()
            .await
            .map_err(|e| AgentError::Transport(format!("malformed result from '{}': {}", self.identity, e)))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        tracing::debug!(provider = %self.identity, "Connection closed");
        Ok(())
    }
}
