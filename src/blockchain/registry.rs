//! Per-network RPC connection set, built from a validated runtime configuration.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::{
    connection::{Connector, RpcConnection, RpcError},
    fees::LegacyFeeConnection,
    networks::NetworkDescriptor,
};
use crate::gateway::decoder::RuntimeConfig;

#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    #[error("failed to initialize provider: {0}")]
    ProviderInit(String),
}

/// A registry entry: the raw connection plus its lazily installed legacy-fee
/// decorator. The decorator is installed at most once per connection.
pub struct NetworkConnection {
    descriptor: NetworkDescriptor,
    raw: Arc<dyn RpcConnection>,
    legacy: OnceCell<Arc<LegacyFeeConnection>>,
}

impl NetworkConnection {
    pub fn new(descriptor: NetworkDescriptor, raw: Arc<dyn RpcConnection>) -> Self {
        Self {
            descriptor,
            raw,
            legacy: OnceCell::new(),
        }
    }

    pub fn descriptor(&self) -> &NetworkDescriptor {
        &self.descriptor
    }

    pub fn raw(&self) -> &Arc<dyn RpcConnection> {
        &self.raw
    }

    /// Returns the legacy-fee view of this connection, sampling fee data from
    /// the node the first time it is requested.
    pub async fn legacy_fee_connection(&self) -> Result<Arc<LegacyFeeConnection>, RpcError> {
        self.legacy
            .get_or_try_init(|| async {
                LegacyFeeConnection::install(self.raw.clone())
                    .await
                    .map(Arc::new)
            })
            .await
            .cloned()
    }

    pub fn has_fee_override(&self) -> bool {
        self.legacy.initialized()
    }
}

/// Immutable mapping of network id to connection. Rebuilt, never mutated.
#[derive(Default)]
pub struct NetworkRegistry {
    connections: HashMap<u64, Arc<NetworkConnection>>,
}

impl std::fmt::Debug for NetworkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkRegistry")
            .field("networks", &self.connections.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl NetworkRegistry {
    /// Builds one connection per descriptor. Connections make no network calls here.
    pub fn build(
        config: &RuntimeConfig,
        networks: &[NetworkDescriptor],
        connector: &dyn Connector,
    ) -> Result<Self, RegistryError> {
        if config.rpc_api_key().trim().is_empty() {
            return Err(RegistryError::ProviderInit("rpc api key is empty".to_string()));
        }

        let mut connections = HashMap::with_capacity(networks.len());
        for network in networks {
            let endpoint = network.endpoint(config.rpc_api_key());
            let raw = connector.connect(network, &endpoint).map_err(|e| {
                warn!(network_id = network.network_id, "failed to create provider: {}", e);
                RegistryError::ProviderInit(format!("network {}: {}", network.network_id, e))
            })?;
            connections.insert(
                network.network_id,
                Arc::new(NetworkConnection::new(network.clone(), raw)),
            );
        }

        info!(networks = connections.len(), "network registry built");
        Ok(Self { connections })
    }

    pub fn get(&self, network_id: u64) -> Option<&Arc<NetworkConnection>> {
        self.connections.get(&network_id)
    }

    pub fn network_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.connections.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
