// src/blockchain/mod.rs

pub mod connection;
pub use connection::{Connector, FeeData, HttpConnector, RpcConnection, RpcError};

pub mod fees;
pub mod models;
pub mod networks;
pub mod nonce_manager;
pub mod registry;
pub mod signer;
pub mod transactions;

// Re-export commonly used types
pub use ethers::types::{Address, H256, U256};
