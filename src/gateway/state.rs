//! Process-wide configuration and network registry, held as one immutable
//! snapshot that is swapped atomically on reconfiguration.

use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::decoder::{self, ConfigError, RuntimeConfig};
use crate::blockchain::{
    connection::Connector,
    networks::NetworkDescriptor,
    registry::{NetworkRegistry, RegistryError},
};

#[derive(Error, Debug, Clone)]
pub enum ReconfigureError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ReconfigureError {
    pub fn kind(&self) -> &'static str {
        match self {
            ReconfigureError::Config(e) => e.kind(),
            ReconfigureError::Registry(RegistryError::ProviderInit(_)) => "provider_init",
        }
    }
}

/// Configuration and the registry built from it. Readers always see a
/// matching pair.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub config: Option<Arc<RuntimeConfig>>,
    pub registry: NetworkRegistry,
}

impl Snapshot {
    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }
}

pub struct GatewayState {
    current: ArcSwap<Snapshot>,
    networks: Vec<NetworkDescriptor>,
    connector: Arc<dyn Connector>,
    // Serializes writers; readers never take it.
    reconfigure_lock: Mutex<()>,
}

impl GatewayState {
    /// Unconfigured state over the given network table.
    pub fn new(networks: Vec<NetworkDescriptor>, connector: Arc<dyn Connector>) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
            networks,
            connector,
            reconfigure_lock: Mutex::new(()),
        }
    }

    /// Lock-free read of the current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn networks(&self) -> &[NetworkDescriptor] {
        &self.networks
    }

    pub fn network(&self, network_id: u64) -> Option<&NetworkDescriptor> {
        self.networks.iter().find(|n| n.network_id == network_id)
    }

    /// Decodes `source`, rebuilds the registry and swaps both in. On any
    /// failure the previous snapshot stays in place.
    pub async fn reconfigure(&self, source: &str) -> Result<Arc<Snapshot>, ReconfigureError> {
        let config = decoder::decode(source).map_err(|e| {
            warn!(kind = e.kind(), "configuration decode failed: {}", e);
            e
        })?;
        self.apply(config).await
    }

    /// Like `reconfigure`, but keeps the current registry (and the fee overrides
    /// installed on its connections) when the decoded configuration is
    /// identical to the active one. Returns whether a swap happened.
    pub async fn reconfigure_if_changed(&self, source: &str) -> Result<bool, ReconfigureError> {
        let config = decoder::decode(source)?;
        Ok(self.swap(config, true).await?.is_some())
    }

    /// Builds a registry for an already validated configuration and swaps it in.
    pub async fn apply(&self, config: RuntimeConfig) -> Result<Arc<Snapshot>, ReconfigureError> {
        match self.swap(config, false).await? {
            Some(snapshot) => Ok(snapshot),
            None => Ok(self.snapshot()),
        }
    }

    // The comparison and the store both happen under the writer lock, so two
    // callers with the same new configuration build one registry between them.
    async fn swap(
        &self,
        config: RuntimeConfig,
        skip_if_unchanged: bool,
    ) -> Result<Option<Arc<Snapshot>>, ReconfigureError> {
        let _guard = self.reconfigure_lock.lock().await;
        if skip_if_unchanged && self.current.load().config.as_deref() == Some(&config) {
            return Ok(None);
        }

        let registry = NetworkRegistry::build(&config, &self.networks, self.connector.as_ref())?;
        let snapshot = Arc::new(Snapshot {
            config: Some(Arc::new(config)),
            registry,
        });
        self.current.store(snapshot.clone());

        info!(networks = ?snapshot.registry.network_ids(), "gateway reconfigured");
        Ok(Some(snapshot))
    }
}
