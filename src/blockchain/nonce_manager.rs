// src/blockchain/nonce_manager.rs

use std::sync::Arc;

use dashmap::DashMap;
use ethers::types::{Address, U256};
use tokio::sync::Mutex;

use super::connection::{RpcConnection, RpcError};

// Hands out sequential nonces per (network, sender) so concurrent tool calls
// from the same wallet do not collide.
#[derive(Debug, Clone, Default)]
pub struct NonceManager {
    // Each sender gets its own state, protected by a Mutex.
    // The DashMap allows concurrent access to different senders.
    nonces: Arc<DashMap<(u64, Address), Arc<Mutex<NonceState>>>>,
}

#[derive(Debug)]
struct NonceState {
    next_nonce: Option<U256>,
}

/// A nonce that has been handed out. Call `release` when the transaction was
/// not accepted so the next caller re-reads the chain.
pub struct NonceReservation {
    pub nonce: U256,
    key: (u64, Address),
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next nonce for `address`, reading the pending count from
    /// the connection the first time (or after a release).
    pub async fn reserve(
        &self,
        connection: &dyn RpcConnection,
        address: Address,
    ) -> Result<NonceReservation, RpcError> {
        let key = (connection.network_id(), address);
        let lock = self
            .nonces
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(NonceState { next_nonce: None })))
            .clone();

        let mut state = lock.lock().await;
        let nonce = match state.next_nonce {
            Some(nonce) => nonce,
            None => connection.transaction_count(address).await?,
        };
        state.next_nonce = Some(nonce + U256::one());

        Ok(NonceReservation { nonce, key })
    }

    /// Forgets the cached nonce so the next reservation refetches it.
    pub async fn release(&self, reservation: NonceReservation) {
        let lock = self.nonces.get(&reservation.key).map(|entry| entry.value().clone());
        if let Some(lock) = lock {
            lock.lock().await.next_nonce = None;
        }
    }
}
