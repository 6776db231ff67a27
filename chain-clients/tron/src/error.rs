//! Error types for Tron client operations

use thiserror::Error;

/// Failures surfaced by identity, signing and broadcast operations.
///
/// Only `ExecutionFailed` carries an on-chain outcome; `ConfirmationTimeout` means the
/// outcome is unknown, not that the transaction failed.
#[derive(Debug, Error)]
pub enum TronError {
    #[error("invalid private key: {0}")]
    InvalidKeyFormat(String),

    #[error("invalid Tron address: {0}")]
    InvalidAddress(String),

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("Tron broadcast rejected: {message}")]
    BroadcastRejected { message: String },

    #[error("Tron transaction failed: {message} (txid={txid})")]
    ExecutionFailed { txid: String, message: String },

    #[error("Tron transaction {txid} not confirmed after {attempts} polls")]
    ConfirmationTimeout { txid: String, attempts: u32 },

    #[error("Tron RPC error: {0:#}")]
    Rpc(#[from] anyhow::Error),
}
