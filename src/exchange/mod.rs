//! # Exchange Client
//!
//! The trading logic lives behind `ExchangeClient`. The gateway constructs one
//! client per tool invocation, binds it to a network connection, attaches the
//! wallet signer and calls exactly one delegate operation on it.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::blockchain::{
    connection::{RpcConnection, RpcError},
    models::{
        Direction, KlineResolution, LimitOrder, MarketData, TokenInfo, TradePairInfo, TxResult,
    },
    signer::WalletSigner,
    transactions::TransactionError,
};

pub mod http;
pub use http::{HttpExchangeClient, HttpExchangeClientFactory};

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("exchange request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("exchange service returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("operation requires a signer")]
    MissingSigner,
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error("{0}")]
    Other(String),
}

/// Token address -> balance as a decimal string.
pub type Balances = BTreeMap<String, String>;

#[async_trait]
pub trait ExchangeClient: Send + Sync {
    fn network_id(&self) -> u64;

    /// Replaces the connection used for subsequent calls.
    fn bind_connection(&mut self, connection: Arc<dyn RpcConnection>);

    fn attach_signer(&mut self, signer: WalletSigner);

    async fn get_balance(&self, token_address: &str) -> Result<Balances, ExchangeError>;

    async fn get_trade_pairs_info(
        &self,
        pair_ids: &[u64],
    ) -> Result<Vec<TradePairInfo>, ExchangeError>;

    async fn get_tokens_info(
        &self,
        token_addresses: &[String],
    ) -> Result<Vec<TokenInfo>, ExchangeError>;

    async fn get_trade_volumes(
        &self,
        pair_ids: &[u64],
        relative_time_in_sec: u64,
    ) -> Result<MarketData, ExchangeError>;

    async fn get_orderbook(
        &self,
        pair_id: u64,
        price_range_low: f64,
        price_range_high: f64,
    ) -> Result<MarketData, ExchangeError>;

    async fn get_my_open_orders(&self, pair_ids: &[u64]) -> Result<Vec<LimitOrder>, ExchangeError>;

    async fn place_limit_order(
        &self,
        pair_id: u64,
        direction: Direction,
        price: f64,
        volume: f64,
    ) -> Result<TxResult, ExchangeError>;

    async fn place_market_order(
        &self,
        pair_id: u64,
        direction: Direction,
        volume: f64,
        cur_price: f64,
        slippage: f64,
    ) -> Result<TxResult, ExchangeError>;

    async fn cancel_limit_order(
        &self,
        pair_id: u64,
        direction: Direction,
        point: i32,
    ) -> Result<TxResult, ExchangeError>;

    async fn cancel_all_limit_order(&self, pair_id: u64) -> Result<TxResult, ExchangeError>;

    async fn claim_earning(
        &self,
        pair_id: u64,
        direction: Direction,
        point: i32,
    ) -> Result<TxResult, ExchangeError>;

    async fn claim_all_earnings(&self, pair_id: u64) -> Result<TxResult, ExchangeError>;

    async fn get_finished_orders(
        &self,
        pair_ids: &[u64],
        relative_from_in_sec: u64,
        relative_to_in_sec: u64,
    ) -> Result<MarketData, ExchangeError>;

    async fn get_market_order_history(
        &self,
        pair_ids: &[u64],
        relative_from_in_sec: u64,
        relative_to_in_sec: u64,
    ) -> Result<MarketData, ExchangeError>;

    async fn get_prices(
        &self,
        pair_ids: &[u64],
        relative_time_in_sec: u64,
    ) -> Result<MarketData, ExchangeError>;

    async fn get_klines(
        &self,
        pair_ids: &[u64],
        resolution: KlineResolution,
        relative_from_in_sec: u64,
        relative_to_in_sec: u64,
    ) -> Result<MarketData, ExchangeError>;

    /// Asks the backend to recompute derived price/candle data for a pair.
    async fn refresh_pair_data(&self, pair_id: u64) -> Result<(), ExchangeError>;
}

/// Creates unsigned exchange clients bound to a network and connection.
pub trait ExchangeClientFactory: Send + Sync {
    fn create(
        &self,
        network_id: u64,
        connection: Arc<dyn RpcConnection>,
    ) -> Box<dyn ExchangeClient>;
}
