// src/blockchain/transactions.rs

use ethers::types::{transaction::eip2718::TypedTransaction, TransactionRequest, H256};
use thiserror::Error;
use tracing::{info, warn};

use super::{
    connection::{RpcConnection, RpcError},
    models::UnsignedTransaction,
    nonce_manager::NonceManager,
    signer::{SignerError, WalletSigner},
};

#[derive(Error, Debug)]
pub enum TransactionError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error("connection reports no gas price")]
    MissingGasPrice,
}

/// Fills, signs and submits a transaction using legacy gas pricing taken from
/// the connection's fee data. Returns the transaction hash.
pub async fn send_legacy_transaction(
    connection: &dyn RpcConnection,
    signer: &WalletSigner,
    nonce_manager: &NonceManager,
    unsigned: UnsignedTransaction,
) -> Result<H256, TransactionError> {
    let from = signer.address();

    let gas_price = connection
        .fee_data()
        .await?
        .gas_price
        .ok_or(TransactionError::MissingGasPrice)?;

    let mut tx = TransactionRequest::new()
        .from(from)
        .to(unsigned.to)
        .data(unsigned.data)
        .value(unsigned.value.unwrap_or_default())
        .chain_id(connection.network_id())
        .gas_price(gas_price);

    let gas = connection
        .estimate_gas(&TypedTransaction::Legacy(tx.clone()))
        .await?;
    tx = tx.gas(gas);

    let reservation = nonce_manager.reserve(connection, from).await?;
    tx = tx.nonce(reservation.nonce);

    let signature = match signer.sign_transaction(&TypedTransaction::Legacy(tx.clone())).await {
        Ok(signature) => signature,
        Err(e) => {
            nonce_manager.release(reservation).await;
            return Err(e.into());
        }
    };
    let raw = tx.rlp_signed(&signature);

    match connection.send_raw_transaction(raw).await {
        Ok(hash) => {
            info!(
                network_id = connection.network_id(),
                nonce = %reservation.nonce,
                "submitted transaction {:?}",
                hash
            );
            Ok(hash)
        }
        Err(e) => {
            warn!(network_id = connection.network_id(), "transaction rejected: {}", e);
            nonce_manager.release(reservation).await;
            Err(e.into())
        }
    }
}
