//! Application State

use std::sync::Arc;

use agent_core::{AgentComposer, ServiceBridge};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The agent node; root sessions for direct requests start here
    pub composer: Arc<AgentComposer>,

    /// Provider-side view over the same catalogs
    pub bridge: Arc<ServiceBridge>,
}

impl AppState {
    pub fn new(composer: Arc<AgentComposer>) -> Self {
        let bridge = composer.bridge();
        Self { composer, bridge }
    }
}
