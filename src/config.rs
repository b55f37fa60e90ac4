// src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Default margin added on top of a network's block time before refreshing
/// derived data after a state-mutating tool.
pub const DEFAULT_SETTLEMENT_MARGIN_MS: u64 = 2_000;

// Server settings, loaded once at startup from the environment (.env supported).
// Wallet credentials are NOT part of this struct; they arrive through the
// encoded runtime configuration handled by `gateway::decoder`.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,

    /// Base URL of the exchange service that backs the trading tools.
    pub exchange_api_url: String,

    /// Configuration source consumed once at startup, if present.
    pub startup_config_url: Option<String>,

    /// Fixed margin added to the block interval for the settlement wait.
    pub settlement_margin_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            exchange_api_url: "http://127.0.0.1:8787".to_string(),
            startup_config_url: None,
            settlement_margin_ms: DEFAULT_SETTLEMENT_MARGIN_MS,
        }
    }
}

impl Config {
    pub fn settlement_margin(&self) -> Duration {
        Duration::from_millis(self.settlement_margin_ms)
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();

        let exchange_api_url = env::var("EXCHANGE_API_URL")
            .context("EXCHANGE_API_URL must be set to the exchange service base URL")?;
        url::Url::parse(&exchange_api_url).context("EXCHANGE_API_URL must be a valid URL")?;

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            exchange_api_url,
            startup_config_url: env::var("GATEWAY_CONFIG_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            settlement_margin_ms: env::var("SETTLEMENT_MARGIN_MS")
                .unwrap_or_else(|_| DEFAULT_SETTLEMENT_MARGIN_MS.to_string())
                .parse()
                .context("SETTLEMENT_MARGIN_MS must be a valid number")?,
        })
    }
}
