// src/blockchain/models.rs
//
// Wire models shared by the exchange client and the tool layer. Field names
// are part of the external contract and are serialized verbatim.

use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

/// Candle resolution accepted by `get_klines`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KlineResolution {
    #[serde(rename = "60")]
    OneHour,
    #[serde(rename = "240")]
    FourHours,
    #[serde(rename = "1D")]
    OneDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePairInfo {
    pub pair_id: u64,
    pub market_address: String,
    pub display_name: String,
    pub token_x: TokenInfo,
    pub token_y: TokenInfo,
}

/// An open or finished limit order owned by the configured wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrder {
    pub pair_id: u64,
    pub direction: Direction,
    pub point: i32,
    pub price: String,
    pub selling: String,
    pub sold: String,
    pub earned: String,
}

/// Result of a state-mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    pub hash: H256,
}

/// Transaction prepared by the exchange service, to be signed locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub to: Address,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub value: Option<U256>,
}

/// Analytics payloads (orderbook, volumes, prices, candles, histories) are
/// passed through as the exchange reports them.
pub type MarketData = Value;
