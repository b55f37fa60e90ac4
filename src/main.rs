// src/main.rs

use dex_mcp_gateway::{
    api,
    blockchain::{networks::known_networks, HttpConnector},
    config::Config,
    exchange::HttpExchangeClientFactory,
    gateway::GatewayState,
    mcp::{
        handler::handle_mcp_request,
        protocol::{error_codes, Request, Response},
    },
    AppState,
};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// --- HTTP Server Logic ---
async fn run_http_server(state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], state.config.port));
    let app = api::router(state);

    info!("🚀 HTTP Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// --- stdio transport ---

// One JSON-RPC message per line in, one response per line out.
async fn respond_to_line(line: &str, state: &AppState) -> Option<Response> {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle_mcp_request(request, state.clone()).await,
        Err(e) => {
            warn!("unparseable stdio message: {}", e);
            Some(Response::error(
                serde_json::Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", e),
            ))
        }
    }
}

async fn run_stdio_server(state: AppState) -> anyhow::Result<()> {
    info!("serving MCP over stdin/stdout");

    let mut lines = io::BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(response) = respond_to_line(line, &state).await else {
            continue;
        };
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
    }

    info!("stdin closed, stdio transport stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing; stdout is reserved for the stdio transport
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dex_mcp_gateway=debug,dex_mcp=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            return;
        }
    };

    let gateway = Arc::new(GatewayState::new(known_networks(), Arc::new(HttpConnector)));

    // Startup configuration is optional; without it every trading tool
    // reports that configuration is required.
    match config.startup_config_url.as_deref() {
        Some(source) => match gateway.reconfigure(source).await {
            Ok(snapshot) => info!(
                networks = ?snapshot.registry.network_ids(),
                "configured from GATEWAY_CONFIG_URL"
            ),
            Err(e) => warn!(
                kind = e.kind(),
                "GATEWAY_CONFIG_URL rejected, starting unconfigured: {}",
                e
            ),
        },
        None => info!("no GATEWAY_CONFIG_URL set, waiting for configure_from_url"),
    }

    let clients = Arc::new(HttpExchangeClientFactory::new(&config.exchange_api_url));
    let app_state = AppState::new(config, gateway, clients);

    // Check if running in MCP mode (stdin/stdout) or HTTP server mode
    let args: Vec<String> = env::args().collect();
    let result = if args.iter().any(|a| a == "--mcp") || env::var("MCP_MODE").is_ok() {
        run_stdio_server(app_state).await
    } else {
        run_http_server(app_state).await
    };
    if let Err(e) = result {
        error!("❌ server stopped: {:#}", e);
    }
}
