//! Agent Composer
//!
//! Owns everything one agent node is made of: the reasoning model, its
//! provider connections, the catalog snapshot, and the shutdown token. The
//! same snapshot backs both the local reasoning engine and the
//! [`ServiceBridge`], so an agent is a client of its own catalogs and a
//! provider to its parent at the same time.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let agent = AgentComposer::builder()
//!     .name("research")
//!     .model(Arc::new(OllamaProvider::from_env()))
//!     .connection(Arc::new(search_provider))
//!     .local_tool(Arc::new(DateTimeTool))
//!     .capability(research_capability)
//!     .max_depth(2)
//!     .build()
//!     .await?;
//!
//! let answer = agent.ask("What changed in tokio 1.42?").await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::bridge::ServiceBridge;
use crate::capability::{CapabilityConfig, CapabilityDescriptor};
use crate::catalog::{AgentCatalogs, CapabilityCatalog, CatalogHandle, ToolCatalog};
use crate::connection::ProviderConnection;
use crate::error::{AgentError, Result};
use crate::provider::LlmProvider;
use crate::reasoning::{EngineConfig, ReasoningEngine};
use crate::recursion::RecursionContext;
use crate::session::ReasoningSession;
use crate::tool::Tool;

pub struct AgentComposer {
    name: String,
    model: Arc<dyn LlmProvider>,
    connections: Vec<Arc<dyn ProviderConnection>>,
    local_tools: Vec<Arc<dyn Tool>>,
    capabilities: Vec<CapabilityDescriptor>,
    catalogs: CatalogHandle,
    engine_config: Arc<EngineConfig>,
    max_depth: u32,
    shutdown: CancellationToken,
}

impl AgentComposer {
    pub fn builder() -> AgentComposerBuilder {
        AgentComposerBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Context for a fresh root session
    pub fn root_context(&self) -> RecursionContext {
        RecursionContext::root(self.max_depth)
    }

    /// Current catalog snapshot
    pub fn catalogs(&self) -> Arc<AgentCatalogs> {
        self.catalogs.snapshot()
    }

    pub fn connections(&self) -> &[Arc<dyn ProviderConnection>] {
        &self.connections
    }

    /// Engine bound to the current snapshot
    pub fn engine(&self) -> ReasoningEngine {
        ReasoningEngine::new(self.model.clone(), self.catalogs.snapshot(), self.engine_config.clone())
    }

    /// Answer a user request in a root session
    pub async fn ask(&self, request: &str) -> Result<String> {
        let cancel = self.shutdown.child_token();
        self.ask_with_cancel(request, &cancel).await
    }

    /// Answer a user request; cancelling `cancel` cancels every nested
    /// session the request spawned
    pub async fn ask_with_cancel(&self, request: &str, cancel: &CancellationToken) -> Result<String> {
        let mut session = self.start_session(request);
        self.run_session(&mut session, cancel).await
    }

    /// Root session seeded with `request`, not yet run. It stays bound to
    /// the snapshot current at this call.
    pub fn start_session(&self, request: &str) -> RootSession {
        let engine = self.engine();
        let session = engine.root_session(request, self.root_context());
        RootSession { engine, session }
    }

    /// Drive a session on the snapshot it was started with, stopping early
    /// on shutdown
    pub async fn run_session(&self, root: &mut RootSession, cancel: &CancellationToken) -> Result<String> {
        let RootSession { engine, session } = root;
        tokio::select! {
            biased;
            result = engine.run(session, cancel) => result,
            _ = self.shutdown.cancelled() => {
                cancel.cancel();
                Err(AgentError::Cancelled)
            }
        }
    }

    /// Provider-side view of this agent over the shared catalogs
    pub fn bridge(&self) -> Arc<ServiceBridge> {
        Arc::new(ServiceBridge::new(
            self.name.clone(),
            self.model.clone(),
            self.catalogs.clone(),
            self.engine_config.clone(),
            self.max_depth,
            self.shutdown.clone(),
        ))
    }

    /// Token cancelled by [`Self::shutdown`]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Rediscover every live connection and swap in a new snapshot.
    ///
    /// Sessions already running keep the snapshot they started with. On
    /// error the current snapshot stays in place.
    pub async fn refresh_catalogs(&self) -> Result<Arc<AgentCatalogs>> {
        let catalogs = self.build_catalogs().await?;
        tracing::info!(
            agent = %self.name,
            tools = catalogs.tools.len(),
            capabilities = catalogs.capabilities.len(),
            "Catalogs rebuilt"
        );
        self.catalogs.swap(catalogs);
        Ok(self.catalogs.snapshot())
    }

    /// Cancel every session started through this agent and close every
    /// connection
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        for connection in &self.connections {
            if let Err(e) = connection.close().await {
                tracing::warn!(provider = connection.identity(), error = %e, "Failed to close connection");
            }
        }
        tracing::info!(agent = %self.name, "Agent shut down");
    }

    /// Local tools first, then each provider's tools in connection order,
    /// then capabilities
    async fn build_catalogs(&self) -> Result<AgentCatalogs> {
        let mut tools = ToolCatalog::new();

        for tool in &self.local_tools {
            if let Err(e) = tools.register_local(tool.clone()) {
                tracing::warn!(error = %e, "Skipping local tool");
            }
        }

        // Discovery runs concurrently; registration stays in connection order
        let live: Vec<&Arc<dyn ProviderConnection>> = self.connections.iter().filter(|c| c.is_connected()).collect();
        let mut pending = Vec::with_capacity(live.len());
        for connection in &live {
            pending.push(connection.discover());
        }
        let discovered = join_all(pending).await;

        for (connection, result) in live.into_iter().zip(discovered) {
            let definitions = match result {
                Ok(definitions) => definitions,
                Err(e) => {
                    tracing::error!(provider = connection.identity(), error = %e, "Discovery failed, skipping provider");
                    continue;
                }
            };

            let offered = definitions.len();
            let mut registered = 0;
            for definition in definitions {
                match tools.register_remote(definition, connection.clone()) {
                    Ok(()) => registered += 1,
                    Err(e) => tracing::warn!(provider = connection.identity(), error = %e, "Skipping tool"),
                }
            }
            tracing::info!(provider = connection.identity(), offered, registered, "Provider connected");
        }

        let mut capabilities = CapabilityCatalog::new();
        for capability in &self.capabilities {
            if tools.contains(&capability.name) {
                return Err(AgentError::DuplicateName(capability.name.clone()));
            }
            capabilities.register(capability.clone())?;
        }

        Ok(AgentCatalogs::new(tools, capabilities))
    }
}

impl std::fmt::Debug for AgentComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentComposer")
            .field("name", &self.name)
            .field("connections", &self.connections.len())
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

/// A root session together with the engine and catalog snapshot it runs on
pub struct RootSession {
    engine: ReasoningEngine,
    session: ReasoningSession,
}

impl RootSession {
    pub fn session(&self) -> &ReasoningSession {
        &self.session
    }

    /// Snapshot every turn of this session resolves against
    pub fn catalogs(&self) -> &Arc<AgentCatalogs> {
        self.engine.catalogs()
    }
}

/// Builder for [`AgentComposer`]
pub struct AgentComposerBuilder {
    name: String,
    model: Option<Arc<dyn LlmProvider>>,
    connections: Vec<Arc<dyn ProviderConnection>>,
    local_tools: Vec<Arc<dyn Tool>>,
    capabilities: Vec<CapabilityConfig>,
    config: EngineConfig,
    max_depth: u32,
}

impl AgentComposerBuilder {
    pub fn new() -> Self {
        Self {
            name: "agent".into(),
            model: None,
            connections: Vec::new(),
            local_tools: Vec::new(),
            capabilities: Vec::new(),
            config: EngineConfig::default(),
            max_depth: 3,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn model(mut self, model: Arc<dyn LlmProvider>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn connection(mut self, connection: Arc<dyn ProviderConnection>) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn connections(mut self, connections: impl IntoIterator<Item = Arc<dyn ProviderConnection>>) -> Self {
        self.connections.extend(connections);
        self
    }

    pub fn local_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.local_tools.push(tool);
        self
    }

    pub fn capability(mut self, capability: CapabilityConfig) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = CapabilityConfig>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.config.max_tool_rounds = rounds;
        self
    }

    pub fn invoke_timeout(mut self, timeout: Duration) -> Self {
        self.config.invoke_timeout = timeout;
        self
    }

    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Compile capability templates, discover every provider, freeze the
    /// catalogs.
    ///
    /// Unreachable providers are logged and skipped. A malformed template,
    /// a duplicate capability, or a capability shadowing a tool fails the
    /// build.
    pub async fn build(self) -> Result<AgentComposer> {
        let model = self
            .model
            .ok_or_else(|| AgentError::Config("reasoning model is required".into()))?;

        let capabilities = self
            .capabilities
            .iter()
            .map(|config| {
                CapabilityDescriptor::from_config(config).map_err(|e| {
                    AgentError::Config(format!("capability '{}': {}", config.name, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let composer = AgentComposer {
            name: self.name,
            model,
            connections: self.connections,
            local_tools: self.local_tools,
            capabilities,
            catalogs: CatalogHandle::default(),
            engine_config: Arc::new(self.config),
            max_depth: self.max_depth,
            shutdown: CancellationToken::new(),
        };

        let catalogs = composer.build_catalogs().await?;
        tracing::info!(
            agent = %composer.name,
            tools = catalogs.tools.len(),
            capabilities = catalogs.capabilities.len(),
            max_depth = composer.max_depth,
            "Agent ready"
        );
        composer.catalogs.swap(catalogs);

        Ok(composer)
    }
}

impl Default for AgentComposerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
