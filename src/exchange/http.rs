// src/exchange/http.rs

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use super::{Balances, ExchangeClient, ExchangeClientFactory, ExchangeError};
use crate::blockchain::{
    connection::RpcConnection,
    models::{
        Direction, KlineResolution, LimitOrder, MarketData, TokenInfo, TradePairInfo, TxResult,
        UnsignedTransaction,
    },
    nonce_manager::NonceManager,
    signer::WalletSigner,
    transactions::send_legacy_transaction,
};

/// Builds `HttpExchangeClient`s sharing one HTTP client and nonce manager.
#[derive(Clone)]
pub struct HttpExchangeClientFactory {
    base_url: String,
    http: Client,
    nonce_manager: NonceManager,
}

impl HttpExchangeClientFactory {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
            nonce_manager: NonceManager::new(),
        }
    }
}

impl ExchangeClientFactory for HttpExchangeClientFactory {
    fn create(
        &self,
        network_id: u64,
        connection: Arc<dyn RpcConnection>,
    ) -> Box<dyn ExchangeClient> {
        Box::new(HttpExchangeClient {
            base_url: self.base_url.clone(),
            http: self.http.clone(),
            nonce_manager: self.nonce_manager.clone(),
            network_id,
            connection,
            signer: None,
        })
    }
}

/// Exchange client backed by the exchange service's HTTP API.
///
/// Queries are `POST {base}/v1/{network_id}/{method}` with a JSON body.
/// State-mutating calls get an unsigned transaction back, which is signed with
/// the attached wallet and submitted through the bound connection.
pub struct HttpExchangeClient {
    base_url: String,
    http: Client,
    nonce_manager: NonceManager,
    network_id: u64,
    connection: Arc<dyn RpcConnection>,
    signer: Option<WalletSigner>,
}

impl HttpExchangeClient {
    fn url(&self, method: &str) -> String {
        format!("{}/v1/{}/{}", self.base_url, self.network_id, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
    ) -> Result<T, ExchangeError> {
        debug!(network_id = self.network_id, method, "exchange call");
        let mut request = self.http.post(self.url(method)).json(&body);
        if let Some(signer) = &self.signer {
            request = request.header("x-wallet-address", format!("{:?}", signer.address()));
        }
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExchangeError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }

    async fn submit(&self, method: &str, mut body: Value) -> Result<TxResult, ExchangeError> {
        let signer = self.signer.as_ref().ok_or(ExchangeError::MissingSigner)?;
        if let Value::Object(map) = &mut body {
            map.insert("owner".into(), json!(format!("{:?}", signer.address())));
        }
        let unsigned: UnsignedTransaction = self.call(method, body).await?;
        let hash = send_legacy_transaction(
            self.connection.as_ref(),
            signer,
            &self.nonce_manager,
            unsigned,
        )
        .await?;
        Ok(TxResult { hash })
    }
}

#[async_trait]
impl ExchangeClient for HttpExchangeClient {
    fn network_id(&self) -> u64 {
        self.network_id
    }

    fn bind_connection(&mut self, connection: Arc<dyn RpcConnection>) {
        self.connection = connection;
    }

    fn attach_signer(&mut self, signer: WalletSigner) {
        self.signer = Some(signer);
    }

    async fn get_balance(&self, token_address: &str) -> Result<Balances, ExchangeError> {
        let signer = self.signer.as_ref().ok_or(ExchangeError::MissingSigner)?;
        self.call(
            "get_balance",
            json!({ "owner": format!("{:?}", signer.address()), "tokenAddress": token_address }),
        )
        .await
    }

    async fn get_trade_pairs_info(
        &self,
        pair_ids: &[u64],
    ) -> Result<Vec<TradePairInfo>, ExchangeError> {
        self.call("get_trade_pairs_info", json!({ "pairIds": pair_ids })).await
    }

    async fn get_tokens_info(
        &self,
        token_addresses: &[String],
    ) -> Result<Vec<TokenInfo>, ExchangeError> {
        self.call("get_tokens_info", json!({ "tokensAddress": token_addresses }))
            .await
    }

    async fn get_trade_volumes(
        &self,
        pair_ids: &[u64],
        relative_time_in_sec: u64,
    ) -> Result<MarketData, ExchangeError> {
        self.call(
            "get_trade_volumes",
            json!({ "pairIds": pair_ids, "relativeTimeInSec": relative_time_in_sec }),
        )
        .await
    }

    async fn get_orderbook(
        &self,
        pair_id: u64,
        price_range_low: f64,
        price_range_high: f64,
    ) -> Result<MarketData, ExchangeError> {
        self.call(
            "get_orderbook",
            json!({
                "pairId": pair_id,
                "priceRangeLow": price_range_low,
                "priceRangeHigh": price_range_high,
            }),
        )
        .await
    }

    async fn get_my_open_orders(&self, pair_ids: &[u64]) -> Result<Vec<LimitOrder>, ExchangeError> {
        let signer = self.signer.as_ref().ok_or(ExchangeError::MissingSigner)?;
        self.call(
            "get_my_open_orders",
            json!({ "owner": format!("{:?}", signer.address()), "pairIds": pair_ids }),
        )
        .await
    }

    async fn place_limit_order(
        &self,
        pair_id: u64,
        direction: Direction,
        price: f64,
        volume: f64,
    ) -> Result<TxResult, ExchangeError> {
        self.submit(
            "place_limit_order",
            json!({ "pairId": pair_id, "direction": direction, "price": price, "volume": volume }),
        )
        .await
    }

    async fn place_market_order(
        &self,
        pair_id: u64,
        direction: Direction,
        volume: f64,
        cur_price: f64,
        slippage: f64,
    ) -> Result<TxResult, ExchangeError> {
        self.submit(
            "place_market_order",
            json!({
                "pairId": pair_id,
                "direction": direction,
                "volume": volume,
                "curPrice": cur_price,
                "slippage": slippage,
            }),
        )
        .await
    }

    async fn cancel_limit_order(
        &self,
        pair_id: u64,
        direction: Direction,
        point: i32,
    ) -> Result<TxResult, ExchangeError> {
        self.submit(
            "cancel_limit_order",
            json!({ "pairId": pair_id, "direction": direction, "point": point }),
        )
        .await
    }

    async fn cancel_all_limit_order(&self, pair_id: u64) -> Result<TxResult, ExchangeError> {
        self.submit("cancel_all_limit_order", json!({ "pairId": pair_id }))
            .await
    }

    async fn claim_earning(
        &self,
        pair_id: u64,
        direction: Direction,
        point: i32,
    ) -> Result<TxResult, ExchangeError> {
        self.submit(
            "claim_earning",
            json!({ "pairId": pair_id, "direction": direction, "point": point }),
        )
        .await
    }

    async fn claim_all_earnings(&self, pair_id: u64) -> Result<TxResult, ExchangeError> {
        self.submit("claim_all_earnings", json!({ "pairId": pair_id })).await
    }

    async fn get_finished_orders(
        &self,
        pair_ids: &[u64],
        relative_from_in_sec: u64,
        relative_to_in_sec: u64,
    ) -> Result<MarketData, ExchangeError> {
        let signer = self.signer.as_ref().ok_or(ExchangeError::MissingSigner)?;
        self.call(
            "get_finished_orders",
            json!({
                "owner": format!("{:?}", signer.address()),
                "pairIds": pair_ids,
                "relativeFromInSec": relative_from_in_sec,
                "relativeToInSec": relative_to_in_sec,
            }),
        )
        .await
    }

    async fn get_market_order_history(
        &self,
        pair_ids: &[u64],
        relative_from_in_sec: u64,
        relative_to_in_sec: u64,
    ) -> Result<MarketData, ExchangeError> {
        self.call(
            "get_market_order_history",
            json!({
                "pairIds": pair_ids,
                "relativeFromInSec": relative_from_in_sec,
                "relativeToInSec": relative_to_in_sec,
            }),
        )
        .await
    }

    async fn get_prices(
        &self,
        pair_ids: &[u64],
        relative_time_in_sec: u64,
    ) -> Result<MarketData, ExchangeError> {
        self.call(
            "get_prices",
            json!({ "pairIds": pair_ids, "relativeTimeInSec": relative_time_in_sec }),
        )
        .await
    }

    async fn get_klines(
        &self,
        pair_ids: &[u64],
        resolution: KlineResolution,
        relative_from_in_sec: u64,
        relative_to_in_sec: u64,
    ) -> Result<MarketData, ExchangeError> {
        self.call(
            "get_klines",
            json!({
                "pairIds": pair_ids,
                "resolution": resolution,
                "relativeFromInSec": relative_from_in_sec,
                "relativeToInSec": relative_to_in_sec,
            }),
        )
        .await
    }

    async fn refresh_pair_data(&self, pair_id: u64) -> Result<(), ExchangeError> {
        let _: Value = self.call("refresh", json!({ "pairId": pair_id })).await?;
        Ok(())
    }
}
