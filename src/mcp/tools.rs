//! Tool catalogue: names, descriptions, JSON schemas and the typed argument
//! variants each call is parsed into before any handler runs.

use std::sync::OnceLock;

use serde::Deserialize;
use serde_json::{json, Value};
use validator::{Validate, ValidationError};

use crate::blockchain::models::{Direction, KlineResolution};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetBalanceArgs {
    pub network_id: u64,
    #[validate(length(min = 1))]
    pub token_address: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PairsArgs {
    pub network_id: u64,
    #[validate(length(min = 1))]
    pub pair_ids: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TokensInfoArgs {
    pub network_id: u64,
    #[validate(length(min = 1))]
    pub tokens_address: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PairsWindowArgs {
    pub network_id: u64,
    #[validate(length(min = 1))]
    pub pair_ids: Vec<u64>,
    pub relative_time_in_sec: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_price_range"))]
pub struct OrderbookArgs {
    pub network_id: u64,
    pub pair_id: u64,
    pub price_range_low: f64,
    pub price_range_high: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_limit_order"))]
pub struct PlaceLimitOrderArgs {
    pub network_id: u64,
    pub pair_id: u64,
    pub direction: Direction,
    pub price: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_market_order"))]
pub struct PlaceMarketOrderArgs {
    pub network_id: u64,
    pub pair_id: u64,
    pub direction: Direction,
    pub volume: f64,
    pub cur_price: f64,
    pub slippage: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PointArgs {
    pub network_id: u64,
    pub pair_id: u64,
    pub direction: Direction,
    pub point: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PairArgs {
    pub network_id: u64,
    pub pair_id: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_history_window"))]
pub struct HistoryArgs {
    pub network_id: u64,
    #[validate(length(min = 1))]
    pub pair_ids: Vec<u64>,
    pub relative_from_in_sec: u64,
    pub relative_to_in_sec: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_klines_window"))]
pub struct KlinesArgs {
    pub network_id: u64,
    #[validate(length(min = 1))]
    pub pair_ids: Vec<u64>,
    pub resolution: KlineResolution,
    pub relative_from_in_sec: u64,
    pub relative_to_in_sec: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ConfigureArgs {
    #[validate(length(min = 1))]
    pub url: String,
}

/// A parsed `tools/call`: `{ "name": ..., "arguments": { ... } }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    GetBalance(GetBalanceArgs),
    GetTradePairsInfo(PairsArgs),
    GetTokensInfo(TokensInfoArgs),
    GetTradeVolumes(PairsWindowArgs),
    GetOrderbook(OrderbookArgs),
    GetMyOpenOrders(PairsArgs),
    PlaceLimitOrder(PlaceLimitOrderArgs),
    PlaceMarketOrder(PlaceMarketOrderArgs),
    CancelLimitOrder(PointArgs),
    CancelAllLimitOrder(PairArgs),
    ClaimEarning(PointArgs),
    ClaimAllEarnings(PairArgs),
    GetFinishedOrders(HistoryArgs),
    GetMarketOrderHistory(HistoryArgs),
    GetPrices(PairsWindowArgs),
    GetKlines(KlinesArgs),
    ConfigureFromUrl(ConfigureArgs),
}

impl ToolCall {
    /// Parses and validates `tools/call` params. The error string is meant
    /// for the caller.
    pub fn parse(params: &Value) -> Result<Self, String> {
        let call: ToolCall = serde_json::from_value(params.clone())
            .map_err(|e| format!("Invalid arguments: {}", e))?;
        call.validate()
            .map_err(|e| format!("Invalid arguments: {}", e))?;
        Ok(call)
    }

    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            ToolCall::GetBalance(a) => a.validate(),
            ToolCall::GetTradePairsInfo(a) | ToolCall::GetMyOpenOrders(a) => a.validate(),
            ToolCall::GetTokensInfo(a) => a.validate(),
            ToolCall::GetTradeVolumes(a) | ToolCall::GetPrices(a) => a.validate(),
            ToolCall::GetOrderbook(a) => a.validate(),
            ToolCall::PlaceLimitOrder(a) => a.validate(),
            ToolCall::PlaceMarketOrder(a) => a.validate(),
            ToolCall::CancelLimitOrder(a) | ToolCall::ClaimEarning(a) => a.validate(),
            ToolCall::CancelAllLimitOrder(a) | ToolCall::ClaimAllEarnings(a) => a.validate(),
            ToolCall::GetFinishedOrders(a) | ToolCall::GetMarketOrderHistory(a) => a.validate(),
            ToolCall::GetKlines(a) => a.validate(),
            ToolCall::ConfigureFromUrl(a) => a.validate(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::GetBalance(_) => "get_balance",
            ToolCall::GetTradePairsInfo(_) => "get_trade_pairs_info",
            ToolCall::GetTokensInfo(_) => "get_tokens_info",
            ToolCall::GetTradeVolumes(_) => "get_trade_volumes",
            ToolCall::GetOrderbook(_) => "get_orderbook",
            ToolCall::GetMyOpenOrders(_) => "get_my_open_orders",
            ToolCall::PlaceLimitOrder(_) => "place_limit_order",
            ToolCall::PlaceMarketOrder(_) => "place_market_order",
            ToolCall::CancelLimitOrder(_) => "cancel_limit_order",
            ToolCall::CancelAllLimitOrder(_) => "cancel_all_limit_order",
            ToolCall::ClaimEarning(_) => "claim_earning",
            ToolCall::ClaimAllEarnings(_) => "claim_all_earnings",
            ToolCall::GetFinishedOrders(_) => "get_finished_orders",
            ToolCall::GetMarketOrderHistory(_) => "get_market_order_history",
            ToolCall::GetPrices(_) => "get_prices",
            ToolCall::GetKlines(_) => "get_klines",
            ToolCall::ConfigureFromUrl(_) => "configure_from_url",
        }
    }
}

fn finite_positive(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("positive");
        err.add_param(field.into(), &value);
        Err(err)
    }
}

fn validate_price_range(args: &OrderbookArgs) -> Result<(), ValidationError> {
    if !args.price_range_low.is_finite() || !args.price_range_high.is_finite() {
        return Err(ValidationError::new("price_range_not_finite"));
    }
    if args.price_range_low < 0.0 || args.price_range_low > args.price_range_high {
        return Err(ValidationError::new("price_range_low_above_high"));
    }
    Ok(())
}

fn validate_limit_order(args: &PlaceLimitOrderArgs) -> Result<(), ValidationError> {
    finite_positive(args.price, "price")?;
    finite_positive(args.volume, "volume")
}

fn validate_market_order(args: &PlaceMarketOrderArgs) -> Result<(), ValidationError> {
    finite_positive(args.volume, "volume")?;
    finite_positive(args.cur_price, "curPrice")?;
    if !args.slippage.is_finite() || args.slippage < 0.0 {
        return Err(ValidationError::new("slippage_negative"));
    }
    Ok(())
}

fn validate_history_window(args: &HistoryArgs) -> Result<(), ValidationError> {
    relative_window(args.relative_from_in_sec, args.relative_to_in_sec)
}

fn validate_klines_window(args: &KlinesArgs) -> Result<(), ValidationError> {
    relative_window(args.relative_from_in_sec, args.relative_to_in_sec)
}

// Both bounds count seconds back from now, so "from" lies further back.
fn relative_window(from: u64, to: u64) -> Result<(), ValidationError> {
    if from < to {
        return Err(ValidationError::new("relative_from_after_relative_to"));
    }
    Ok(())
}

/// Static description of a tool, as listed by `tools/list`.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    /// Submits a transaction; followed by the settlement wait and refresh.
    pub mutating: bool,
}

impl ToolDescriptor {
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
            "annotations": { "readOnlyHint": !self.mutating },
        })
    }
}

pub fn catalogue() -> &'static [ToolDescriptor] {
    static CATALOGUE: OnceLock<Vec<ToolDescriptor>> = OnceLock::new();
    CATALOGUE.get_or_init(build_catalogue)
}

pub fn find(name: &str) -> Option<&'static ToolDescriptor> {
    catalogue().iter().find(|t| t.name == name)
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn network_id() -> Value {
    json!({"type": "integer", "description": "Target network id (e.g. 84532 for Base Sepolia)."})
}

fn pair_ids() -> Value {
    json!({
        "type": "array",
        "items": {"type": "integer"},
        "minItems": 1,
        "description": "Trade pair ids."
    })
}

fn pair_id() -> Value {
    json!({"type": "integer", "description": "Trade pair id."})
}

fn direction() -> Value {
    json!({"type": "string", "enum": ["BUY", "SELL"]})
}

fn relative_window_props() -> (Value, Value) {
    (
        json!({
            "type": "integer",
            "minimum": 0,
            "description": "Window start, seconds before now."
        }),
        json!({
            "type": "integer",
            "minimum": 0,
            "description": "Window end, seconds before now."
        }),
    )
}

fn build_catalogue() -> Vec<ToolDescriptor> {
    let (rel_from, rel_to) = relative_window_props();
    vec![
        ToolDescriptor {
            name: "get_balance",
            description: "Get the configured wallet's balance of a token.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "tokenAddress": {
                        "type": "string",
                        "description": "0x... token contract address."
                    }
                }),
                &["networkId", "tokenAddress"],
            ),
            mutating: false,
        },
        ToolDescriptor {
            name: "get_trade_pairs_info",
            description: "Get market address, display name and tokens of trade pairs.",
            input_schema: object(
                json!({"networkId": network_id(), "pairIds": pair_ids()}),
                &["networkId", "pairIds"],
            ),
            mutating: false,
        },
        ToolDescriptor {
            name: "get_tokens_info",
            description: "Get symbol, name and decimals of tokens.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "tokensAddress": {"type": "array", "items": {"type": "string"}, "minItems": 1}
                }),
                &["networkId", "tokensAddress"],
            ),
            mutating: false,
        },
        ToolDescriptor {
            name: "get_trade_volumes",
            description: "Get traded volume of pairs over the recent window.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "pairIds": pair_ids(),
                    "relativeTimeInSec": {"type": "integer", "minimum": 0}
                }),
                &["networkId", "pairIds", "relativeTimeInSec"],
            ),
            mutating: false,
        },
        ToolDescriptor {
            name: "get_orderbook",
            description: "Get the limit order book of a pair within a price range.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "pairId": pair_id(),
                    "priceRangeLow": {"type": "number", "minimum": 0},
                    "priceRangeHigh": {"type": "number", "minimum": 0}
                }),
                &["networkId", "pairId", "priceRangeLow", "priceRangeHigh"],
            ),
            mutating: false,
        },
        ToolDescriptor {
            name: "get_my_open_orders",
            description: "List the configured wallet's open limit orders.",
            input_schema: object(
                json!({"networkId": network_id(), "pairIds": pair_ids()}),
                &["networkId", "pairIds"],
            ),
            mutating: false,
        },
        ToolDescriptor {
            name: "place_limit_order",
            description: "Place a limit order. Returns the transaction hash.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "pairId": pair_id(),
                    "direction": direction(),
                    "price": {"type": "number", "exclusiveMinimum": 0},
                    "volume": {"type": "number", "exclusiveMinimum": 0}
                }),
                &["networkId", "pairId", "direction", "price", "volume"],
            ),
            mutating: true,
        },
        ToolDescriptor {
            name: "place_market_order",
            description: "Swap at market price with a slippage bound. \
                Returns the transaction hash.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "pairId": pair_id(),
                    "direction": direction(),
                    "volume": {"type": "number", "exclusiveMinimum": 0},
                    "curPrice": {"type": "number", "exclusiveMinimum": 0},
                    "slippage": {"type": "number", "minimum": 0}
                }),
                &["networkId", "pairId", "direction", "volume", "curPrice", "slippage"],
            ),
            mutating: true,
        },
        ToolDescriptor {
            name: "cancel_limit_order",
            description: "Cancel the limit order at a price point.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "pairId": pair_id(),
                    "direction": direction(),
                    "point": {"type": "integer"}
                }),
                &["networkId", "pairId", "direction", "point"],
            ),
            mutating: true,
        },
        ToolDescriptor {
            name: "cancel_all_limit_order",
            description: "Cancel every open limit order on a pair.",
            input_schema: object(
                json!({"networkId": network_id(), "pairId": pair_id()}),
                &["networkId", "pairId"],
            ),
            mutating: true,
        },
        ToolDescriptor {
            name: "claim_earning",
            description: "Claim the earnings of the limit order at a price point.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "pairId": pair_id(),
                    "direction": direction(),
                    "point": {"type": "integer"}
                }),
                &["networkId", "pairId", "direction", "point"],
            ),
            mutating: true,
        },
        ToolDescriptor {
            name: "claim_all_earnings",
            description: "Claim all earnings on a pair.",
            input_schema: object(
                json!({"networkId": network_id(), "pairId": pair_id()}),
                &["networkId", "pairId"],
            ),
            mutating: true,
        },
        ToolDescriptor {
            name: "get_finished_orders",
            description: "List the configured wallet's finished limit orders in a time window.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "pairIds": pair_ids(),
                    "relativeFromInSec": rel_from.clone(),
                    "relativeToInSec": rel_to.clone()
                }),
                &["networkId", "pairIds", "relativeFromInSec", "relativeToInSec"],
            ),
            mutating: false,
        },
        ToolDescriptor {
            name: "get_market_order_history",
            description: "List market orders executed on pairs in a time window.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "pairIds": pair_ids(),
                    "relativeFromInSec": rel_from.clone(),
                    "relativeToInSec": rel_to.clone()
                }),
                &["networkId", "pairIds", "relativeFromInSec", "relativeToInSec"],
            ),
            mutating: false,
        },
        ToolDescriptor {
            name: "get_prices",
            description: "Get current and past prices of pairs.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "pairIds": pair_ids(),
                    "relativeTimeInSec": {"type": "integer", "minimum": 0}
                }),
                &["networkId", "pairIds", "relativeTimeInSec"],
            ),
            mutating: false,
        },
        ToolDescriptor {
            name: "get_klines",
            description: "Get candles of pairs for a resolution and time window.",
            input_schema: object(
                json!({
                    "networkId": network_id(),
                    "pairIds": pair_ids(),
                    "resolution": {"type": "string", "enum": ["60", "240", "1D"]},
                    "relativeFromInSec": rel_from,
                    "relativeToInSec": rel_to
                }),
                &["networkId", "pairIds", "resolution", "relativeFromInSec", "relativeToInSec"],
            ),
            mutating: false,
        },
        ToolDescriptor {
            name: "configure_from_url",
            description: "Replace the wallet credential and RPC key from a URL whose \
                'config' query parameter holds base64-encoded JSON.",
            input_schema: object(
                json!({
                    "url": {"type": "string", "description": "URL carrying ?config=<base64 JSON>."}
                }),
                &["url"],
            ),
            mutating: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalogue_entry_parses_as_a_call_name() {
        for tool in catalogue() {
            // An empty argument object must fail on fields, not on the name.
            let err = ToolCall::parse(&json!({"name": tool.name, "arguments": {}})).unwrap_err();
            assert!(!err.contains("unknown variant"), "{}: {}", tool.name, err);
        }
    }

    #[test]
    fn mutating_flags_cover_the_transaction_tools() {
        let mutating: Vec<&str> = catalogue()
            .iter()
            .filter(|t| t.mutating)
            .map(|t| t.name)
            .collect();
        assert_eq!(
            mutating,
            [
                "place_limit_order",
                "place_market_order",
                "cancel_limit_order",
                "cancel_all_limit_order",
                "claim_earning",
                "claim_all_earnings"
            ]
        );
    }

    #[test]
    fn parses_klines_resolution_and_direction() {
        let call = ToolCall::parse(&json!({
            "name": "get_klines",
            "arguments": {
                "networkId": 84532, "pairIds": [1], "resolution": "1D",
                "relativeFromInSec": 86400, "relativeToInSec": 0
            }
        }))
        .unwrap();
        match call {
            ToolCall::GetKlines(args) => assert_eq!(args.resolution, KlineResolution::OneDay),
            other => panic!("unexpected {:?}", other),
        }

        let call = ToolCall::parse(&json!({
            "name": "cancel_limit_order",
            "arguments": {"networkId": 84532, "pairId": 1, "direction": "SELL", "point": -2000}
        }))
        .unwrap();
        assert_eq!(call.name(), "cancel_limit_order");
    }

    #[test]
    fn rejects_invalid_arguments_before_dispatch() {
        let cases = [
            ("get_trade_pairs_info", json!({"networkId": 1, "pairIds": []})),
            (
                "place_limit_order",
                json!({
                    "networkId": 1, "pairId": 1, "direction": "BUY",
                    "price": 0.0, "volume": 1.0
                }),
            ),
            (
                "place_limit_order",
                json!({
                    "networkId": 1, "pairId": 1, "direction": "HOLD",
                    "price": 1.0, "volume": 1.0
                }),
            ),
            (
                "place_market_order",
                json!({
                    "networkId": 1, "pairId": 1, "direction": "BUY",
                    "volume": 1.0, "curPrice": 1.0, "slippage": -0.1
                }),
            ),
            (
                "get_orderbook",
                json!({"networkId": 1, "pairId": 1, "priceRangeLow": 2.0, "priceRangeHigh": 1.0}),
            ),
            (
                "get_finished_orders",
                json!({
                    "networkId": 1, "pairIds": [1],
                    "relativeFromInSec": 10, "relativeToInSec": 20
                }),
            ),
            (
                "get_klines",
                json!({
                    "networkId": 1, "pairIds": [1], "resolution": "15",
                    "relativeFromInSec": 20, "relativeToInSec": 0
                }),
            ),
            ("get_balance", json!({"networkId": 1, "tokenAddress": "0x1", "extra": true})),
        ];
        for (name, arguments) in cases {
            let case = json!({"name": name, "arguments": arguments});
            assert!(ToolCall::parse(&case).is_err(), "accepted {}", case);
        }
    }
}
