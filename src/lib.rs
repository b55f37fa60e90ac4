// src/lib.rs

use std::sync::Arc;

pub mod api;
pub mod blockchain;
pub mod config;
pub mod exchange;
pub mod gateway;
pub mod mcp;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: config::Config,
    /// Builds authenticated per-invocation sessions over the swappable gateway state
    pub sessions: gateway::SessionFactory,
}

impl AppState {
    pub fn new(
        config: config::Config,
        gateway: Arc<gateway::GatewayState>,
        clients: Arc<dyn exchange::ExchangeClientFactory>,
    ) -> Self {
        Self {
            config,
            sessions: gateway::SessionFactory::new(gateway, clients),
        }
    }

    pub fn gateway(&self) -> &Arc<gateway::GatewayState> {
        self.sessions.state()
    }
}
