//! RPC connections to EVM networks.
//!
//! `RpcConnection` is the narrow surface the gateway needs from a node: fee
//! data, nonces, gas estimation and raw transaction submission. The production
//! implementation wraps an ethers `Provider<Http>`.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider},
    types::{transaction::eip2718::TypedTransaction, Address, BlockNumber, Bytes, H256, U256},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::networks::NetworkDescriptor;

#[derive(Error, Debug, Clone)]
pub enum RpcError {
    #[error("rpc request failed: {0}")]
    Provider(String),
    #[error("rpc response missing field: {0}")]
    MissingField(&'static str),
}

impl From<ethers::providers::ProviderError> for RpcError {
    fn from(err: ethers::providers::ProviderError) -> Self {
        RpcError::Provider(err.to_string())
    }
}

/// Fee estimate as reported by a node. Dynamic-fee fields are absent on
/// networks (or connections) that only speak legacy gas pricing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeData {
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub last_base_fee_per_gas: Option<U256>,
}

impl FeeData {
    /// Keeps only the legacy gas price.
    pub fn legacy(&self) -> FeeData {
        FeeData {
            gas_price: self.gas_price,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            last_base_fee_per_gas: None,
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.max_fee_per_gas.is_none()
            && self.max_priority_fee_per_gas.is_none()
            && self.last_base_fee_per_gas.is_none()
    }
}

#[async_trait]
pub trait RpcConnection: Send + Sync {
    fn network_id(&self) -> u64;

    /// Endpoint URL. May embed an API key, so never log it.
    fn endpoint(&self) -> &str;

    async fn fee_data(&self) -> Result<FeeData, RpcError>;

    async fn transaction_count(&self, address: Address) -> Result<U256, RpcError>;

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, RpcError>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, RpcError>;
}

/// `RpcConnection` over JSON-RPC/HTTP using ethers.
#[derive(Debug, Clone)]
pub struct EthersConnection {
    network_id: u64,
    endpoint: String,
    provider: Arc<Provider<Http>>,
}

impl EthersConnection {
    pub fn new(network_id: u64, endpoint: &str) -> Result<Self, RpcError> {
        let provider = Provider::<Http>::try_from(endpoint)
            .map_err(|e| RpcError::Provider(format!("invalid endpoint: {}", e)))?;
        Ok(Self {
            network_id,
            endpoint: endpoint.to_string(),
            provider: Arc::new(provider),
        })
    }
}

#[async_trait]
impl RpcConnection for EthersConnection {
    fn network_id(&self) -> u64 {
        self.network_id
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fee_data(&self) -> Result<FeeData, RpcError> {
        let gas_price = self.provider.get_gas_price().await?;
        let last_base_fee_per_gas = self
            .provider
            .get_block(BlockNumber::Latest)
            .await?
            .and_then(|block| block.base_fee_per_gas);

        // Only London-style networks report dynamic fees.
        let (max_fee_per_gas, max_priority_fee_per_gas) = match last_base_fee_per_gas {
            Some(_) => match self.provider.estimate_eip1559_fees(None).await {
                Ok((max_fee, priority)) => (Some(max_fee), Some(priority)),
                Err(e) => {
                    debug!(network_id = self.network_id, "eip1559 fee estimate unavailable: {}", e);
                    (None, None)
                }
            },
            None => (None, None),
        };

        Ok(FeeData {
            gas_price: Some(gas_price),
            max_fee_per_gas,
            max_priority_fee_per_gas,
            last_base_fee_per_gas,
        })
    }

    async fn transaction_count(&self, address: Address) -> Result<U256, RpcError> {
        Ok(self
            .provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await?)
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, RpcError> {
        Ok(self.provider.estimate_gas(tx, None).await?)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, RpcError> {
        let pending = self.provider.send_raw_transaction(raw).await?;
        Ok(pending.tx_hash())
    }
}

/// Builds connections for the registry. Construction must not touch the network.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        network: &NetworkDescriptor,
        endpoint: &str,
    ) -> Result<Arc<dyn RpcConnection>, RpcError>;
}

/// Connector producing `EthersConnection`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(
        &self,
        network: &NetworkDescriptor,
        endpoint: &str,
    ) -> Result<Arc<dyn RpcConnection>, RpcError> {
        Ok(Arc::new(EthersConnection::new(network.network_id, endpoint)?))
    }
}
