//! Shared test doubles: an in-memory RPC connection, a connector that records
//! what it built, and an exchange client whose open orders only appear after
//! a refresh.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use ethers::types::{transaction::eip2718::TypedTransaction, Address, Bytes, H256, U256};
use ethers::utils::keccak256;
use serde_json::{json, Value};

use dex_mcp_gateway::{
    blockchain::{
        connection::{Connector, FeeData, RpcConnection, RpcError},
        models::{
            Direction, KlineResolution, LimitOrder, MarketData, TokenInfo, TradePairInfo, TxResult,
        },
        networks::{known_networks, NetworkDescriptor},
        signer::WalletSigner,
    },
    config::Config,
    exchange::{Balances, ExchangeClient, ExchangeClientFactory, ExchangeError},
    gateway::GatewayState,
    mcp::{
        handler::handle_mcp_request,
        protocol::{Request, Response},
    },
    AppState,
};

/// Well-known development key (anvil account 0).
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

pub const INITIAL_GAS_PRICE: u64 = 1_000_000_000;

/// Builds a configuration source URL the way a client would.
pub fn config_url(wallet_credential: &str, rpc_api_key: &str) -> String {
    let doc = json!({ "walletCredential": wallet_credential, "rpcApiKey": rpc_api_key });
    encoded_url(&STANDARD.encode(doc.to_string()))
}

pub fn encoded_url(encoded: &str) -> String {
    url::Url::parse_with_params("https://gateway.example/mcp", &[("config", encoded)])
        .unwrap()
        .to_string()
}

// --- RPC connection ---

/// Reports a gas price that rises by one gwei after every fee query, so a
/// pinned value is easy to tell apart from a fresh one.
pub struct MockConnection {
    network_id: u64,
    endpoint: String,
    gas_price: AtomicU64,
    fee_queries: AtomicUsize,
    nonce: AtomicU64,
    sent: Mutex<Vec<Bytes>>,
}

impl MockConnection {
    pub fn new(network_id: u64, endpoint: &str) -> Self {
        Self {
            network_id,
            endpoint: endpoint.to_string(),
            gas_price: AtomicU64::new(INITIAL_GAS_PRICE),
            fee_queries: AtomicUsize::new(0),
            nonce: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn fee_queries(&self) -> usize {
        self.fee_queries.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl RpcConnection for MockConnection {
    fn network_id(&self) -> u64 {
        self.network_id
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fee_data(&self) -> Result<FeeData, RpcError> {
        self.fee_queries.fetch_add(1, Ordering::SeqCst);
        let gas_price = self.gas_price.fetch_add(1_000_000_000, Ordering::SeqCst);
        Ok(FeeData {
            gas_price: Some(U256::from(gas_price)),
            max_fee_per_gas: Some(U256::from(gas_price * 2)),
            max_priority_fee_per_gas: Some(U256::from(1_500_000_000u64)),
            last_base_fee_per_gas: Some(U256::from(gas_price / 2)),
        })
    }

    async fn transaction_count(&self, _address: Address) -> Result<U256, RpcError> {
        Ok(U256::from(self.nonce.load(Ordering::SeqCst)))
    }

    async fn estimate_gas(&self, _tx: &TypedTransaction) -> Result<U256, RpcError> {
        Ok(U256::from(210_000u64))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, RpcError> {
        let hash = H256::from(keccak256(&raw));
        self.sent.lock().unwrap().push(raw);
        self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(hash)
    }
}

/// Connector handing out `MockConnection`s and remembering every one built.
#[derive(Default)]
pub struct MockConnector {
    built: Mutex<Vec<Arc<MockConnection>>>,
    fail_network: Mutex<Option<u64>>,
}

impl MockConnector {
    pub fn fail_for(&self, network_id: u64) {
        *self.fail_network.lock().unwrap() = Some(network_id);
    }

    pub fn built(&self) -> Vec<Arc<MockConnection>> {
        self.built.lock().unwrap().clone()
    }

    /// Most recently built connection for a network.
    pub fn latest(&self, network_id: u64) -> Arc<MockConnection> {
        self.built
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.network_id == network_id)
            .cloned()
            .expect("no connection built for network")
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        network: &NetworkDescriptor,
        endpoint: &str,
    ) -> Result<Arc<dyn RpcConnection>, RpcError> {
        if *self.fail_network.lock().unwrap() == Some(network.network_id) {
            return Err(RpcError::Provider("connector refused".to_string()));
        }
        let conn = Arc::new(MockConnection::new(network.network_id, endpoint));
        self.built.lock().unwrap().push(conn.clone());
        Ok(conn)
    }
}

// --- Exchange client ---

#[derive(Default)]
pub struct MockBook {
    pub pending: Vec<LimitOrder>,
    pub open: Vec<LimitOrder>,
    pub refreshes: Vec<(u64, u64)>,
    pub fail_refresh: bool,
    pub calls: Vec<String>,
    pub signers: Vec<Address>,
    pub bound_endpoints: Vec<String>,
    next_hash: u64,
}

pub struct MockExchangeFactory {
    pub book: Arc<Mutex<MockBook>>,
}

impl ExchangeClientFactory for MockExchangeFactory {
    fn create(
        &self,
        network_id: u64,
        connection: Arc<dyn RpcConnection>,
    ) -> Box<dyn ExchangeClient> {
        Box::new(MockExchangeClient {
            network_id,
            connection,
            signer: None,
            book: self.book.clone(),
        })
    }
}

pub struct MockExchangeClient {
    network_id: u64,
    connection: Arc<dyn RpcConnection>,
    signer: Option<WalletSigner>,
    book: Arc<Mutex<MockBook>>,
}

impl MockExchangeClient {
    fn record(&self, call: &str) -> Result<(), ExchangeError> {
        if self.signer.is_none() {
            return Err(ExchangeError::MissingSigner);
        }
        self.book.lock().unwrap().calls.push(call.to_string());
        Ok(())
    }

    fn tx(&self) -> TxResult {
        let mut book = self.book.lock().unwrap();
        book.next_hash += 1;
        TxResult {
            hash: H256::from_low_u64_be(book.next_hash),
        }
    }
}

fn token(symbol: &str, address: &str) -> TokenInfo {
    TokenInfo {
        symbol: symbol.to_string(),
        name: format!("{symbol} Token"),
        decimals: 18,
        address: address.to_string(),
    }
}

#[async_trait]
impl ExchangeClient for MockExchangeClient {
    fn network_id(&self) -> u64 {
        self.network_id
    }

    fn bind_connection(&mut self, connection: Arc<dyn RpcConnection>) {
        self.book
            .lock()
            .unwrap()
            .bound_endpoints
            .push(connection.endpoint().to_string());
        self.connection = connection;
    }

    fn attach_signer(&mut self, signer: WalletSigner) {
        self.book.lock().unwrap().signers.push(signer.address());
        self.signer = Some(signer);
    }

    async fn get_balance(&self, token_address: &str) -> Result<Balances, ExchangeError> {
        self.record("get_balance")?;
        let mut balances = BTreeMap::new();
        balances.insert(token_address.to_string(), "1500000000000000000".to_string());
        Ok(balances)
    }

    async fn get_trade_pairs_info(
        &self,
        pair_ids: &[u64],
    ) -> Result<Vec<TradePairInfo>, ExchangeError> {
        self.record("get_trade_pairs_info")?;
        Ok(pair_ids
            .iter()
            .map(|id| TradePairInfo {
                pair_id: *id,
                market_address: format!("0x{:040x}", id),
                display_name: "WETH/USDC".to_string(),
                token_x: token("WETH", "0x01"),
                token_y: token("USDC", "0x02"),
            })
            .collect())
    }

    async fn get_tokens_info(
        &self,
        token_addresses: &[String],
    ) -> Result<Vec<TokenInfo>, ExchangeError> {
        self.record("get_tokens_info")?;
        Ok(token_addresses.iter().map(|a| token("TKN", a)).collect())
    }

    async fn get_trade_volumes(
        &self,
        pair_ids: &[u64],
        _relative: u64,
    ) -> Result<MarketData, ExchangeError> {
        self.record("get_trade_volumes")?;
        let rows: Vec<Value> = pair_ids
            .iter()
            .map(|id| json!({"pairId": id, "volume": "0"}))
            .collect();
        Ok(json!(rows))
    }

    async fn get_orderbook(
        &self,
        pair_id: u64,
        _low: f64,
        _high: f64,
    ) -> Result<MarketData, ExchangeError> {
        self.record("get_orderbook")?;
        Ok(json!({"pairId": pair_id, "bids": [], "asks": []}))
    }

    async fn get_my_open_orders(&self, pair_ids: &[u64]) -> Result<Vec<LimitOrder>, ExchangeError> {
        self.record("get_my_open_orders")?;
        let book = self.book.lock().unwrap();
        Ok(book
            .open
            .iter()
            .filter(|o| pair_ids.contains(&o.pair_id))
            .cloned()
            .collect())
    }

    async fn place_limit_order(
        &self,
        pair_id: u64,
        direction: Direction,
        price: f64,
        volume: f64,
    ) -> Result<TxResult, ExchangeError> {
        self.record("place_limit_order")?;
        self.book.lock().unwrap().pending.push(LimitOrder {
            pair_id,
            direction,
            point: 0,
            price: price.to_string(),
            selling: volume.to_string(),
            sold: "0".to_string(),
            earned: "0".to_string(),
        });
        Ok(self.tx())
    }

    async fn place_market_order(
        &self,
        _pair_id: u64,
        _direction: Direction,
        _volume: f64,
        _cur_price: f64,
        _slippage: f64,
    ) -> Result<TxResult, ExchangeError> {
        self.record("place_market_order")?;
        Ok(self.tx())
    }

    async fn cancel_limit_order(
        &self,
        _pair_id: u64,
        _d: Direction,
        _point: i32,
    ) -> Result<TxResult, ExchangeError> {
        self.record("cancel_limit_order")?;
        Ok(self.tx())
    }

    async fn cancel_all_limit_order(&self, pair_id: u64) -> Result<TxResult, ExchangeError> {
        self.record("cancel_all_limit_order")?;
        self.book.lock().unwrap().open.retain(|o| o.pair_id != pair_id);
        Ok(self.tx())
    }

    async fn claim_earning(
        &self,
        _pair_id: u64,
        _d: Direction,
        _point: i32,
    ) -> Result<TxResult, ExchangeError> {
        self.record("claim_earning")?;
        Ok(self.tx())
    }

    async fn claim_all_earnings(&self, _pair_id: u64) -> Result<TxResult, ExchangeError> {
        self.record("claim_all_earnings")?;
        Ok(self.tx())
    }

    async fn get_finished_orders(
        &self,
        _p: &[u64],
        _from: u64,
        _to: u64,
    ) -> Result<MarketData, ExchangeError> {
        self.record("get_finished_orders")?;
        Ok(json!([]))
    }

    async fn get_market_order_history(
        &self,
        _p: &[u64],
        _from: u64,
        _to: u64,
    ) -> Result<MarketData, ExchangeError> {
        self.record("get_market_order_history")?;
        Ok(json!([]))
    }

    async fn get_prices(
        &self,
        pair_ids: &[u64],
        _relative: u64,
    ) -> Result<MarketData, ExchangeError> {
        self.record("get_prices")?;
        let rows: Vec<Value> = pair_ids
            .iter()
            .map(|id| json!({"pairId": id, "price": "1.0"}))
            .collect();
        Ok(json!(rows))
    }

    async fn get_klines(
        &self,
        _p: &[u64],
        resolution: KlineResolution,
        _from: u64,
        _to: u64,
    ) -> Result<MarketData, ExchangeError> {
        self.record("get_klines")?;
        Ok(json!({"resolution": resolution, "candles": []}))
    }

    async fn refresh_pair_data(&self, pair_id: u64) -> Result<(), ExchangeError> {
        let mut book = self.book.lock().unwrap();
        book.refreshes.push((self.network_id, pair_id));
        if book.fail_refresh {
            return Err(ExchangeError::Other("refresh unavailable".to_string()));
        }
        let (ready, still_pending): (Vec<_>, Vec<_>) =
            book.pending.drain(..).partition(|o| o.pair_id == pair_id);
        book.pending = still_pending;
        book.open.extend(ready);
        Ok(())
    }
}

// --- Harness ---

pub struct Harness {
    pub state: AppState,
    pub connector: Arc<MockConnector>,
    pub book: Arc<Mutex<MockBook>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_networks(known_networks())
    }

    pub fn with_networks(networks: Vec<NetworkDescriptor>) -> Self {
        let connector = Arc::new(MockConnector::default());
        let book = Arc::new(Mutex::new(MockBook::default()));
        let gateway = Arc::new(GatewayState::new(networks, connector.clone()));
        let clients = Arc::new(MockExchangeFactory { book: book.clone() });
        let state = AppState::new(Config::default(), gateway, clients);
        Self {
            state,
            connector,
            book,
        }
    }

    /// Harness already configured with the test key.
    pub async fn configured() -> Self {
        let harness = Self::new();
        harness
            .state
            .gateway()
            .reconfigure(&config_url(TEST_KEY, "key1"))
            .await
            .expect("test configuration must apply");
        harness
    }

    pub async fn call(&self, name: &str, arguments: Value) -> Response {
        call_tool(&self.state, name, arguments).await
    }
}

pub async fn call_tool(state: &AppState, name: &str, arguments: Value) -> Response {
    let req = Request::new(
        json!(1),
        "tools/call",
        json!({ "name": name, "arguments": arguments }),
    );
    handle_mcp_request(req, state.clone())
        .await
        .expect("requests with an id always get a response")
}

/// Parses the JSON text payload of a successful tool result.
pub fn result_json(resp: &Response) -> Value {
    assert!(resp.error.is_none(), "unexpected error: {:?}", resp.error);
    let text = resp.result.as_ref().unwrap()["content"][0]["text"]
        .as_str()
        .expect("text content");
    serde_json::from_str(text).expect("text content is JSON")
}
