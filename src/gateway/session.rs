//! Per-invocation sessions: an exchange client bound to one network's
//! connection with legacy fee pricing forced and the wallet signer attached.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::state::GatewayState;
use crate::blockchain::{
    connection::{RpcConnection, RpcError},
    signer::WalletSigner,
};
use crate::exchange::{ExchangeClient, ExchangeClientFactory};

#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error(
        "gateway is not configured: no credential/RPC key available, \
         call configure_from_url first"
    )]
    NotConfigured,
    #[error("unknown network id {0}")]
    UnknownNetwork(u64),
    #[error("unauthorized: {cause}")]
    Unauthorized { cause: String },
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl SessionError {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::NotConfigured => "not_configured",
            SessionError::UnknownNetwork(_) => "unknown_network",
            SessionError::Unauthorized { .. } => "unauthorized",
            SessionError::Rpc(_) => "rpc",
        }
    }
}

/// Authenticated, network-bound context. Owned by a single invocation.
pub struct Session {
    pub network_id: u64,
    pub connection: Arc<dyn RpcConnection>,
    pub signer: WalletSigner,
    pub client: Box<dyn ExchangeClient>,
}

#[derive(Clone)]
pub struct SessionFactory {
    state: Arc<GatewayState>,
    clients: Arc<dyn ExchangeClientFactory>,
}

impl SessionFactory {
    pub fn new(state: Arc<GatewayState>, clients: Arc<dyn ExchangeClientFactory>) -> Self {
        Self { state, clients }
    }

    pub fn state(&self) -> &Arc<GatewayState> {
        &self.state
    }

    /// Builds a fresh session. Nothing is cached between calls except the
    /// connection-scoped fee override.
    pub async fn create_session(&self, network_id: u64) -> Result<Session, SessionError> {
        let snapshot = self.state.snapshot();
        let config = snapshot.config.clone().ok_or(SessionError::NotConfigured)?;
        let entry = snapshot
            .registry
            .get(network_id)
            .cloned()
            .ok_or(SessionError::UnknownNetwork(network_id))?;

        let connection: Arc<dyn RpcConnection> = entry.legacy_fee_connection().await?;

        let signer = WalletSigner::from_credential(config.wallet_credential(), network_id)
            .map_err(|e| {
                warn!(network_id, "signer derivation failed");
                SessionError::Unauthorized {
                    cause: e.to_string(),
                }
            })?;

        let mut client = self.clients.create(network_id, connection.clone());
        client.attach_signer(signer.clone());

        debug!(network_id, signer = ?signer.address(), "session created");
        Ok(Session {
            network_id,
            connection,
            signer,
            client,
        })
    }

    /// Points the session's client at the connection the registry holds now.
    /// A reconfiguration between `create_session` and use would otherwise
    /// leave the client on a discarded connection. The signer only carries
    /// the chain id, which a rebuild of the same network keeps.
    pub async fn rebind(&self, session: &mut Session) -> Result<(), SessionError> {
        let snapshot = self.state.snapshot();
        let entry = snapshot
            .registry
            .get(session.network_id)
            .cloned()
            .ok_or(SessionError::UnknownNetwork(session.network_id))?;
        let current: Arc<dyn RpcConnection> = entry.legacy_fee_connection().await?;
        if !Arc::ptr_eq(&current, &session.connection) {
            debug!(network_id = session.network_id, "rebinding session to rebuilt connection");
        }
        session.client.bind_connection(current.clone());
        session.connection = current;
        Ok(())
    }
}
