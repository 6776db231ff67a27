//! Remote-procedure surface of a Tron full node
//!
//! `TronRpc` is the seam between the relayer and the node: every network interaction the
//! relayer performs goes through one of these unary calls, so tests can swap in a fake node.

use crate::address::TronAddress;
use crate::protocol::{Transaction, TriggerSmartContract};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Node answer to a broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReturn {
    pub result: bool,
    /// Node-level rejection reason, empty when accepted.
    pub message: String,
}

/// Execution info of a transaction that made it into a block.
///
/// Mirrors `/wallet/gettransactioninfobyid`: byte fields stay hex-encoded as the node
/// returns them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "blockNumber")]
    pub block_number: u64,
    #[serde(default, rename = "blockTimeStamp")]
    pub block_timestamp: u64,
    #[serde(default, rename = "contractResult")]
    pub contract_result: Vec<String>,
    /// `"FAILED"` when execution failed; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, rename = "resMessage", skip_serializing_if = "Option::is_none")]
    pub res_message: Option<String>,
    #[serde(default)]
    pub internal_transactions: Vec<InternalTransaction>,
}

impl TransactionInfo {
    pub fn is_failed(&self) -> bool {
        self.result.as_deref() == Some("FAILED")
    }

    /// First contract result, i.e. the return or revert data of the top-level call.
    pub fn revert_data(&self) -> Vec<u8> {
        self.contract_result
            .first()
            .and_then(|data| hex::decode(data).ok())
            .unwrap_or_default()
    }

    /// The node's result message, hex-decoded.
    pub fn result_message(&self) -> Option<String> {
        let message = self.res_message.as_deref().filter(|m| !m.is_empty())?;
        Some(decode_hex_text(message))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InternalTransaction {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub caller_address: String,
    #[serde(default, rename = "transferTo_address")]
    pub transfer_to_address: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub rejected: bool,
    #[serde(default)]
    pub extra: String,
}

impl InternalTransaction {
    pub fn note_text(&self) -> String {
        decode_hex_text(&self.note)
    }
}

/// Decodes a hex-encoded UTF-8 message, keeping the input when it is not hex.
pub fn decode_hex_text(value: &str) -> String {
    match hex::decode(value) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => value.to_string(),
    }
}

/// Unary calls the relayer issues against a Tron full node.
#[async_trait]
pub trait TronRpc: Send + Sync {
    /// Asks the node to build an unsigned transaction for a smart-contract call.
    ///
    /// The returned transaction carries the reference block and timestamp it will execute
    /// against and a `fee_limit` that the caller overwrites before signing.
    async fn trigger_contract(
        &self,
        call: &TriggerSmartContract,
        fee_limit: i64,
    ) -> Result<Transaction>;

    /// Executes a read-only call and returns its raw return data.
    async fn trigger_constant_contract(&self, call: &TriggerSmartContract) -> Result<Vec<u8>>;

    async fn broadcast_transaction(&self, tx: &Transaction) -> Result<BroadcastReturn>;

    /// Fetches execution info; `None` while the node does not know the transaction yet.
    async fn get_transaction_info_by_id(&self, txid: &str) -> Result<Option<TransactionInfo>>;

    async fn is_contract_deployed(&self, address: &TronAddress) -> Result<bool>;
}
