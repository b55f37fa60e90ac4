//! # API Module
//!
//! HTTP surface of the gateway.
//!
//! ## Available Endpoints
//!
//! - `GET /health` - Liveness plus configuration status
//! - `POST /mcp` - JSON-RPC endpoint for MCP requests; accepts `?config=<base64>`

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub mod health;
pub mod mcp;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/mcp", post(mcp::mcp_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
