//! Catalogs
//!
//! Catalogs are filled once at startup and then frozen inside an
//! [`AgentCatalogs`] snapshot shared by every session. Names are unique:
//! the first registration wins and later ones fail with
//! [`AgentError::DuplicateName`]. Listing follows registration order.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::capability::CapabilityDescriptor;
use crate::connection::ProviderConnection;
use crate::error::{AgentError, Result};
use crate::protocol::ToolDefinition;
use crate::tool::{Tool, ToolDescriptor, ToolOrigin};

/// What executes a tool entry
#[derive(Clone)]
pub enum ToolTarget {
    Local(Arc<dyn Tool>),
    Remote(Arc<dyn ProviderConnection>),
}

/// A tool entry together with its executable target
#[derive(Clone)]
pub struct ToolEntry {
    pub descriptor: ToolDescriptor,
    pub target: ToolTarget,
}

/// Federated tool namespace
#[derive(Clone, Default)]
pub struct ToolCatalog {
    entries: Vec<ToolEntry>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry; the first registration of a name wins
    pub fn register(&mut self, descriptor: ToolDescriptor, target: ToolTarget) -> Result<()> {
        if self.index.contains_key(&descriptor.name) {
            return Err(AgentError::DuplicateName(descriptor.name));
        }
        self.index.insert(descriptor.name.clone(), self.entries.len());
        self.entries.push(ToolEntry { descriptor, target });
        Ok(())
    }

    /// Register a local tool
    pub fn register_local(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let descriptor = tool.schema().descriptor();
        self.register(descriptor, ToolTarget::Local(tool))
    }

    /// Register a discovered remote tool owned by `connection`
    pub fn register_remote(
        &mut self,
        definition: ToolDefinition,
        connection: Arc<dyn ProviderConnection>,
    ) -> Result<()> {
        let origin = ToolOrigin::Provider(connection.identity().to_string());
        let descriptor = ToolDescriptor::from_definition(definition, origin);
        self.register(descriptor, ToolTarget::Remote(connection))
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolEntry> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptors in registration order
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCatalog")
            .field("tools", &self.entries.iter().map(|e| &e.descriptor.name).collect::<Vec<_>>())
            .finish()
    }
}

/// Capabilities defined on this agent
#[derive(Clone, Debug, Default)]
pub struct CapabilityCatalog {
    entries: Vec<Arc<CapabilityDescriptor>>,
    index: HashMap<String, usize>,
}

impl CapabilityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: CapabilityDescriptor) -> Result<()> {
        if self.index.contains_key(&capability.name) {
            return Err(AgentError::DuplicateName(capability.name));
        }
        self.index.insert(capability.name.clone(), self.entries.len());
        self.entries.push(Arc::new(capability));
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&Arc<CapabilityDescriptor>> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    pub fn list(&self) -> Vec<&CapabilityDescriptor> {
        self.entries.iter().map(|c| &**c).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A name resolved against both catalogs
pub enum Resolved<'a> {
    Tool(&'a ToolEntry),
    Capability(&'a Arc<CapabilityDescriptor>),
}

/// Immutable snapshot of both catalogs
#[derive(Clone, Debug, Default)]
pub struct AgentCatalogs {
    pub tools: ToolCatalog,
    pub capabilities: CapabilityCatalog,
}

impl AgentCatalogs {
    pub fn new(tools: ToolCatalog, capabilities: CapabilityCatalog) -> Self {
        Self { tools, capabilities }
    }

    /// Tools first, then capabilities
    pub fn resolve(&self, name: &str) -> Result<Resolved<'_>> {
        if let Ok(entry) = self.tools.resolve(name) {
            return Ok(Resolved::Tool(entry));
        }
        self.capabilities.resolve(name).map(Resolved::Capability)
    }

    /// Everything a reasoning session may call, tools first
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .list()
            .into_iter()
            .cloned()
            .chain(self.capabilities.list().into_iter().map(CapabilityDescriptor::as_tool))
            .collect()
    }

    /// What this agent advertises as a provider; capabilities look like tools
    pub fn offered_tools(&self) -> Vec<ToolDefinition> {
        self.descriptors().iter().map(ToolDescriptor::definition).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.capabilities.is_empty()
    }

    /// Tool section for the system prompt
    pub fn generate_prompt_section(&self) -> String {
        let mut prompt = String::from("## Available Tools\n\n");
        prompt.push_str("Call a tool by responding with one JSON block per call:\n\n");
        prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");
        prompt.push_str("You may include several blocks in one response; they run in order.\n\n");

        for descriptor in self.descriptors() {
            prompt.push_str(&descriptor.format_for_llm());
            prompt.push('\n');
        }

        prompt
    }
}

/// Shared slot holding the current snapshot.
///
/// Sessions take a snapshot when they start and keep it until they end;
/// a rebuild swaps the slot without touching running sessions.
#[derive(Clone, Default)]
pub struct CatalogHandle {
    current: Arc<RwLock<Arc<AgentCatalogs>>>,
}

impl CatalogHandle {
    pub fn new(catalogs: AgentCatalogs) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalogs))),
        }
    }

    pub fn snapshot(&self) -> Arc<AgentCatalogs> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn swap(&self, catalogs: AgentCatalogs) -> Arc<AgentCatalogs> {
        let next = Arc::new(catalogs);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}
