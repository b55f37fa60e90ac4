// src/blockchain/fees.rs

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{transaction::eip2718::TypedTransaction, Address, Bytes, H256, U256};
use tracing::info;

use super::connection::{FeeData, RpcConnection, RpcError};

/// Decorator that forces legacy gas pricing on everything built on top of it.
///
/// The fee estimate is sampled once from the inner connection when the
/// decorator is installed; every later `fee_data` call returns that gas price
/// with all dynamic-fee fields cleared. All other calls pass through.
pub struct LegacyFeeConnection {
    inner: Arc<dyn RpcConnection>,
    pinned: FeeData,
}

impl LegacyFeeConnection {
    pub async fn install(inner: Arc<dyn RpcConnection>) -> Result<Self, RpcError> {
        let observed = inner.fee_data().await?;
        let pinned = observed.legacy();
        if pinned.gas_price.is_none() {
            return Err(RpcError::MissingField("gasPrice"));
        }
        info!(
            network_id = inner.network_id(),
            gas_price = %pinned.gas_price.unwrap_or_default(),
            "installed legacy fee override"
        );
        Ok(Self { inner, pinned })
    }

    pub fn pinned(&self) -> &FeeData {
        &self.pinned
    }
}

#[async_trait]
impl RpcConnection for LegacyFeeConnection {
    fn network_id(&self) -> u64 {
        self.inner.network_id()
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }

    async fn fee_data(&self) -> Result<FeeData, RpcError> {
        Ok(self.pinned.clone())
    }

    async fn transaction_count(&self, address: Address) -> Result<U256, RpcError> {
        self.inner.transaction_count(address).await
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, RpcError> {
        self.inner.estimate_gas(tx).await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, RpcError> {
        self.inner.send_raw_transaction(raw).await
    }
}
