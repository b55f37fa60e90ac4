//! # MCP Handler Module
//!
//! Implements the Model Context Protocol surface of the gateway: `initialize`,
//! `tools/list` and `tools/call`, plus direct calls by tool name.
//!
//! ## Supported Tools
//!
//! ### Queries
//! - `get_balance`, `get_trade_pairs_info`, `get_tokens_info`, `get_trade_volumes`
//! - `get_orderbook`, `get_my_open_orders`, `get_finished_orders`
//! - `get_market_order_history`, `get_prices`, `get_klines`
//!
//! ### Transactions
//! - `place_limit_order`, `place_market_order`
//! - `cancel_limit_order`, `cancel_all_limit_order`
//! - `claim_earning`, `claim_all_earnings`
//!
//! ### Configuration
//! - `configure_from_url`
//!
//! Every trading tool opens a fresh session for its `networkId`, calls one
//! exchange operation and returns the result as JSON text. Transaction tools
//! then wait for the network's block time plus the settlement margin and ask
//! the exchange to refresh derived data for the pair; a failed refresh is
//! logged and does not change the tool's result.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    exchange::ExchangeError,
    gateway::{ReconfigureError, Session, SessionError},
    mcp::{
        protocol::{error_codes, text_content, Request, Response},
        tools::{self, ToolCall},
    },
    AppState,
};

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0}")]
    InvalidParams(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    #[error(transparent)]
    Reconfigure(#[from] ReconfigureError),
    #[error("failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Maps the error to a JSON-RPC error with a stable `data.kind`.
    pub fn into_response(self, id: Value) -> Response {
        match self {
            ToolError::InvalidParams(msg) => {
                Response::error_kind(id, error_codes::INVALID_PARAMS, "invalid_params", msg)
            }
            ToolError::Session(SessionError::Unauthorized { cause }) => Response::error_with_data(
                id,
                error_codes::UNAUTHORIZED,
                format!("Unauthorized: {}", cause),
                json!({ "kind": "unauthorized", "cause": cause }),
            ),
            ToolError::Session(e @ SessionError::NotConfigured) => {
                Response::error_kind(id, error_codes::NOT_CONFIGURED, e.kind(), e.to_string())
            }
            ToolError::Session(e @ SessionError::UnknownNetwork(_)) => {
                Response::error_kind(id, error_codes::INVALID_PARAMS, e.kind(), e.to_string())
            }
            ToolError::Session(e @ SessionError::Rpc(_)) => {
                Response::error_kind(id, error_codes::INTERNAL_ERROR, e.kind(), e.to_string())
            }
            ToolError::Exchange(e) => {
                Response::error_kind(id, error_codes::INTERNAL_ERROR, "exchange", e.to_string())
            }
            ToolError::Reconfigure(e) => {
                let code = match e {
                    ReconfigureError::Config(_) => error_codes::INVALID_PARAMS,
                    ReconfigureError::Registry(_) => error_codes::INTERNAL_ERROR,
                };
                Response::error_kind(id, code, e.kind(), e.to_string())
            }
            ToolError::Serialization(e) => Response::error_kind(
                id,
                error_codes::INTERNAL_ERROR,
                "serialization",
                e.to_string(),
            ),
        }
    }
}

/// This is the main dispatcher for all incoming MCP requests.
pub async fn handle_mcp_request(req: Request, state: AppState) -> Option<Response> {
    info!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "tools/list" => handle_tools_list(&req),
        "tools/call" => handle_tool_call(req, &state).await,
        // Direct calls by tool name are rewritten into tools/call
        name if tools::find(name).is_some() => {
            let wrapped = Request {
                jsonrpc: req.jsonrpc.clone(),
                id: req.id.clone(),
                method: "tools/call".to_string(),
                params: Some(json!({
                    "name": name,
                    "arguments": req.params.clone().unwrap_or_else(|| json!({}))
                })),
            };
            handle_tool_call(wrapped, &state).await
        }
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Some(response)
}

/// Handles a 'tools/call' request by dispatching it to the correct tool logic.
async fn handle_tool_call(req: Request, state: &AppState) -> Response {
    let params = match req.params.as_ref() {
        Some(p) => p,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'params' object".into(),
            )
        }
    };

    let tool_name = match params.get("name").and_then(|n| n.as_str()) {
        Some(name) => name,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'name' field in params".into(),
            )
        }
    };

    if tools::find(tool_name).is_none() {
        return Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Unknown tool: {}", tool_name),
        );
    }

    let call = json!({
        "name": tool_name,
        "arguments": params.get("arguments").cloned().unwrap_or_else(|| json!({})),
    });
    let call = match ToolCall::parse(&call) {
        Ok(call) => call,
        Err(msg) => return ToolError::InvalidParams(msg).into_response(req.id),
    };

    match dispatch(call, state).await {
        Ok(result) => Response::success(req.id, result),
        Err(e) => {
            warn!(tool = tool_name, "tool call failed: {}", e);
            e.into_response(req.id)
        }
    }
}

/// Runs one parsed tool call and returns its MCP result.
pub async fn dispatch(call: ToolCall, state: &AppState) -> Result<Value, ToolError> {
    let name = call.name();
    debug!(tool = name, "dispatching tool call");

    match call {
        ToolCall::ConfigureFromUrl(args) => {
            let snapshot = state.sessions.state().reconfigure(&args.url).await?;
            to_text(&json!({
                "configured": true,
                "networks": snapshot.registry.network_ids(),
            }))
        }
        ToolCall::GetBalance(args) => {
            let session = open_session(state, args.network_id).await?;
            to_text(&session.client.get_balance(&args.token_address).await?)
        }
        ToolCall::GetTradePairsInfo(args) => {
            let session = open_session(state, args.network_id).await?;
            to_text(&session.client.get_trade_pairs_info(&args.pair_ids).await?)
        }
        ToolCall::GetTokensInfo(args) => {
            let session = open_session(state, args.network_id).await?;
            to_text(&session.client.get_tokens_info(&args.tokens_address).await?)
        }
        ToolCall::GetTradeVolumes(args) => {
            let session = open_session(state, args.network_id).await?;
            to_text(
                &session
                    .client
                    .get_trade_volumes(&args.pair_ids, args.relative_time_in_sec)
                    .await?,
            )
        }
        ToolCall::GetOrderbook(args) => {
            let session = open_session(state, args.network_id).await?;
            to_text(
                &session
                    .client
                    .get_orderbook(args.pair_id, args.price_range_low, args.price_range_high)
                    .await?,
            )
        }
        ToolCall::GetMyOpenOrders(args) => {
            let session = open_session(state, args.network_id).await?;
            to_text(&session.client.get_my_open_orders(&args.pair_ids).await?)
        }
        ToolCall::PlaceLimitOrder(args) => {
            let session = open_session(state, args.network_id).await?;
            let tx = session
                .client
                .place_limit_order(args.pair_id, args.direction, args.price, args.volume)
                .await?;
            settle_and_refresh(state, &session, args.pair_id).await;
            to_text(&tx)
        }
        ToolCall::PlaceMarketOrder(args) => {
            let session = open_session(state, args.network_id).await?;
            let tx = session
                .client
                .place_market_order(
                    args.pair_id,
                    args.direction,
                    args.volume,
                    args.cur_price,
                    args.slippage,
                )
                .await?;
            settle_and_refresh(state, &session, args.pair_id).await;
            to_text(&tx)
        }
        ToolCall::CancelLimitOrder(args) => {
            let session = open_session(state, args.network_id).await?;
            let tx = session
                .client
                .cancel_limit_order(args.pair_id, args.direction, args.point)
                .await?;
            settle_and_refresh(state, &session, args.pair_id).await;
            to_text(&tx)
        }
        ToolCall::CancelAllLimitOrder(args) => {
            let session = open_session(state, args.network_id).await?;
            let tx = session.client.cancel_all_limit_order(args.pair_id).await?;
            settle_and_refresh(state, &session, args.pair_id).await;
            to_text(&tx)
        }
        ToolCall::ClaimEarning(args) => {
            let session = open_session(state, args.network_id).await?;
            let tx = session
                .client
                .claim_earning(args.pair_id, args.direction, args.point)
                .await?;
            settle_and_refresh(state, &session, args.pair_id).await;
            to_text(&tx)
        }
        ToolCall::ClaimAllEarnings(args) => {
            let session = open_session(state, args.network_id).await?;
            let tx = session.client.claim_all_earnings(args.pair_id).await?;
            settle_and_refresh(state, &session, args.pair_id).await;
            to_text(&tx)
        }
        ToolCall::GetFinishedOrders(args) => {
            let session = open_session(state, args.network_id).await?;
            to_text(
                &session
                    .client
                    .get_finished_orders(
                        &args.pair_ids,
                        args.relative_from_in_sec,
                        args.relative_to_in_sec,
                    )
                    .await?,
            )
        }
        ToolCall::GetMarketOrderHistory(args) => {
            let session = open_session(state, args.network_id).await?;
            to_text(
                &session
                    .client
                    .get_market_order_history(
                        &args.pair_ids,
                        args.relative_from_in_sec,
                        args.relative_to_in_sec,
                    )
                    .await?,
            )
        }
        ToolCall::GetPrices(args) => {
            let session = open_session(state, args.network_id).await?;
            to_text(
                &session
                    .client
                    .get_prices(&args.pair_ids, args.relative_time_in_sec)
                    .await?,
            )
        }
        ToolCall::GetKlines(args) => {
            let session = open_session(state, args.network_id).await?;
            to_text(
                &session
                    .client
                    .get_klines(
                        &args.pair_ids,
                        args.resolution,
                        args.relative_from_in_sec,
                        args.relative_to_in_sec,
                    )
                    .await?,
            )
        }
    }
}

async fn open_session(state: &AppState, network_id: u64) -> Result<Session, ToolError> {
    let mut session = state.sessions.create_session(network_id).await?;
    state.sessions.rebind(&mut session).await?;
    Ok(session)
}

/// Waits out block time plus the settlement margin, then asks the exchange to
/// refresh derived data for the pair. Refresh failures are only logged.
async fn settle_and_refresh(state: &AppState, session: &Session, pair_id: u64) {
    let block_interval = state
        .sessions
        .state()
        .network(session.network_id)
        .map(|n| n.block_interval())
        .unwrap_or_default();
    let wait = block_interval + state.config.settlement_margin();

    debug!(
        network_id = session.network_id,
        pair_id,
        wait_ms = wait.as_millis() as u64,
        "waiting for settlement"
    );
    tokio::time::sleep(wait).await;

    if let Err(e) = session.client.refresh_pair_data(pair_id).await {
        warn!(network_id = session.network_id, pair_id, "post-trade refresh failed: {}", e);
    }
}

fn to_text<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    Ok(text_content(serde_json::to_string(value)?))
}

fn handle_initialize(req: &Request) -> Response {
    let server_info = json!({
        "name": "dex_mcp_gateway",
        "version": env!("CARGO_PKG_VERSION")
    });
    let capabilities = json!({ "tools": { "listChanged": false } });
    let instructions = "Multi-chain DEX gateway: balances, limit and market orders, order \
        history, prices and candles. Call configure_from_url first if the server was started \
        without a configuration.";

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": server_info,
            "protocolVersion": "2025-06-18",
            "capabilities": capabilities,
            "instructions": instructions
        }),
    )
}

fn handle_tools_list(req: &Request) -> Response {
    let tools: Vec<Value> = tools::catalogue().iter().map(|t| t.to_json()).collect();
    Response::success(req.id.clone(), json!({ "tools": tools }))
}
