// src/blockchain/networks.rs

use std::time::Duration;

/// Placeholder substituted with the configured RPC API key.
pub const API_KEY_PLACEHOLDER: &str = "{api_key}";

/// Static description of a supported network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDescriptor {
    pub network_id: u64,
    pub name: &'static str,
    /// RPC endpoint; may contain `{api_key}`.
    pub endpoint_template: &'static str,
    pub block_interval_ms: u64,
}

impl NetworkDescriptor {
    /// Whether the endpoint needs the configured API key.
    pub fn requires_api_key(&self) -> bool {
        self.endpoint_template.contains(API_KEY_PLACEHOLDER)
    }

    pub fn endpoint(&self, api_key: &str) -> String {
        self.endpoint_template.replace(API_KEY_PLACEHOLDER, api_key)
    }

    pub fn block_interval(&self) -> Duration {
        Duration::from_millis(self.block_interval_ms)
    }
}

/// Networks served by default. Adding a network only needs a new entry here.
pub const KNOWN_NETWORKS: &[NetworkDescriptor] = &[
    NetworkDescriptor {
        network_id: 8453,
        name: "base",
        endpoint_template: "https://base-mainnet.g.alchemy.com/v2/{api_key}",
        block_interval_ms: 2_000,
    },
    NetworkDescriptor {
        network_id: 84532,
        name: "base-sepolia",
        endpoint_template: "https://base-sepolia.g.alchemy.com/v2/{api_key}",
        block_interval_ms: 2_000,
    },
    NetworkDescriptor {
        network_id: 42161,
        name: "arbitrum",
        endpoint_template: "https://arb-mainnet.g.alchemy.com/v2/{api_key}",
        block_interval_ms: 250,
    },
    NetworkDescriptor {
        network_id: 5000,
        name: "mantle",
        endpoint_template: "https://rpc.mantle.xyz",
        block_interval_ms: 2_000,
    },
];

pub fn known_networks() -> Vec<NetworkDescriptor> {
    KNOWN_NETWORKS.to_vec()
}
