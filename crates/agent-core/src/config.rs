//! Node Configuration
//!
//! One agent node is described by a JSON document. Environment variables
//! override the deployment-specific bits.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityConfig;
use crate::error::{AgentError, Result};
use crate::provider::GenerationOptions;
use crate::reasoning::{EngineConfig, DEFAULT_SYSTEM_PROMPT};
use crate::tool::BUILTIN_TOOLS;

/// Which sides of the agent are active
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Interactive sessions only
    #[default]
    Client,
    /// Serve the bridge only
    Server,
    Both,
}

impl AgentRole {
    pub fn serves(self) -> bool {
        matches!(self, Self::Server | Self::Both)
    }

    pub fn interactive(self) -> bool {
        matches!(self, Self::Client | Self::Both)
    }
}

impl FromStr for AgentRole {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            "both" => Ok(Self::Both),
            other => Err(AgentError::Config(format!("unknown role '{}'", other))),
        }
    }
}

/// A downstream tool provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderTarget {
    pub name: String,

    /// Base URL of the provider's HTTP endpoint
    pub url: String,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_timeout() -> u64 { 60 }

impl ProviderTarget {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for one agent node
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub name: String,
    pub role: AgentRole,
    pub model: GenerationOptions,

    /// Registered in this order; the first provider to offer a name keeps it
    pub providers: Vec<ProviderTarget>,

    /// Built-in tools to enable, by name
    pub local_tools: Vec<String>,

    pub capabilities: Vec<CapabilityConfig>,
    pub max_depth: u32,
    pub max_tool_rounds: usize,
    pub invoke_timeout_secs: u64,
    pub bind_addr: String,
    pub system_prompt: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "agent".into(),
            role: AgentRole::default(),
            model: GenerationOptions::default(),
            providers: Vec::new(),
            local_tools: BUILTIN_TOOLS.iter().map(|t| (*t).to_string()).collect(),
            capabilities: Vec::new(),
            max_depth: 3,
            max_tool_rounds: 10,
            invoke_timeout_secs: 60,
            bind_addr: "0.0.0.0:3000".into(),
            system_prompt: None,
        }
    }
}

impl NodeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Load from `AGENT_CONFIG` (default `agent.json`) and apply environment
    /// overrides. A missing default file yields the default configuration.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("AGENT_CONFIG") {
            Ok(path) => Self::from_file(&path)
                .map_err(|e| AgentError::Config(format!("{}: {}", path, e)))?,
            Err(_) if Path::new("agent.json").exists() => Self::from_file("agent.json")?,
            Err(_) => {
                tracing::warn!("No agent.json found, using defaults");
                Self::default()
            }
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `AGENT_ROLE` and `BIND_ADDR`
    pub fn apply_env(&mut self) {
        if let Ok(role) = std::env::var("AGENT_ROLE") {
            match role.parse() {
                Ok(role) => self.role = role,
                Err(e) => tracing::warn!("Ignoring AGENT_ROLE: {}", e),
            }
        }
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            self.bind_addr = addr;
        }
    }

    /// Every problem found; empty when the configuration is usable
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("name must not be empty".to_string());
        }
        if self.invoke_timeout_secs == 0 {
            errors.push("invoke_timeout_secs must be greater than zero".to_string());
        }
        if self.max_tool_rounds == 0 {
            errors.push("max_tool_rounds must be greater than zero".to_string());
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                errors.push(format!("provider with url '{}' has no name", provider.url));
            }
            if !seen.insert(provider.name.as_str()) {
                errors.push(format!("duplicate provider name '{}'", provider.name));
            }
            if provider.timeout_secs == 0 {
                errors.push(format!("provider '{}' has a zero timeout", provider.name));
            }
        }

        for tool in &self.local_tools {
            if !BUILTIN_TOOLS.contains(&tool.as_str()) {
                errors.push(format!("unknown local tool '{}'", tool));
            }
        }

        for capability in &self.capabilities {
            if capability.name.trim().is_empty() {
                errors.push("capability with an empty name".to_string());
            }
        }

        errors
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            system_prompt: self
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.into()),
            max_tool_rounds: self.max_tool_rounds,
            generation: self.model.clone(),
            inject_tool_descriptions: true,
            invoke_timeout: Duration::from_secs(self.invoke_timeout_secs),
        }
    }
}
