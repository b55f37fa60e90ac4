// src/blockchain/signer.rs

use std::str::FromStr;

use ethers::{
    signers::{LocalWallet, Signer, WalletError},
    types::{transaction::eip2718::TypedTransaction, Address, Signature},
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("invalid wallet credential: {0}")]
    InvalidCredential(String),
    #[error("signing failed: {0}")]
    Signing(#[from] WalletError),
}

/// Signing identity derived from the wallet credential, bound to one chain id.
/// It holds no connection, so rebinding a session never leaves it stale.
#[derive(Clone)]
pub struct WalletSigner {
    wallet: LocalWallet,
}

impl std::fmt::Debug for WalletSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSigner")
            .field("address", &self.wallet.address())
            .field("chain_id", &self.wallet.chain_id())
            .finish()
    }
}

impl WalletSigner {
    /// Accepts a 32-byte hex private key with or without the `0x` prefix.
    pub fn from_credential(
        credential: &SecretString,
        chain_id: u64,
    ) -> Result<Self, SignerError> {
        let key = credential.expose_secret().trim();
        let wallet = LocalWallet::from_str(key)
            .map_err(|e| SignerError::InvalidCredential(e.to_string()))?
            .with_chain_id(chain_id);
        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.wallet.chain_id()
    }

    pub async fn sign_transaction(&self, tx: &TypedTransaction) -> Result<Signature, SignerError> {
        Ok(self.wallet.sign_transaction(tx).await?)
    }
}
