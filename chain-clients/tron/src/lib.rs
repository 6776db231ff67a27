//! Tron chain client
//!
//! Identity, signing, transaction model and full-node access for the bridge relayer:
//! - `address` / `signing`: key normalization, address encodings, recoverable signatures
//! - `protocol`: protobuf transaction model and in-place payload edits
//! - `abi`: Solidity ABI word helpers used for controller calldata
//! - `revert`: execution-failure diagnostics
//! - `rpc` / `client`: the remote-procedure surface and its HTTP implementation
//! - `broadcast`: sign, submit and poll until a terminal outcome

pub mod abi;
pub mod address;
pub mod broadcast;
pub mod client;
pub mod error;
pub mod protocol;
pub mod revert;
pub mod rpc;
pub mod signing;

pub use address::TronAddress;
pub use broadcast::{broadcast_and_confirm, ConfirmSettings};
pub use client::TronHttpClient;
pub use error::TronError;
pub use rpc::{BroadcastReturn, InternalTransaction, TransactionInfo, TronRpc};
pub use signing::TronSigner;
