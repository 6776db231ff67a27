//! Tron protocol messages
//!
//! Hand-written `prost` definitions for the subset of `core/Tron.proto` and
//! `core/contract/smart_contract.proto` the relayer touches. Field tags follow the node's
//! schema so the encoding of `TransactionRaw` is byte-identical to the one the node hashes.

use crate::error::TronError;
use prost::Message;

/// `Transaction.Contract.ContractType.TriggerSmartContract`
pub const TRIGGER_SMART_CONTRACT_TYPE: i32 = 31;

pub const TRIGGER_SMART_CONTRACT_TYPE_URL: &str =
    "type.googleapis.com/protocol.TriggerSmartContract";

#[derive(Clone, PartialEq, Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Contract {
    #[prost(int32, tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub parameter: Option<Any>,
    #[prost(bytes = "vec", tag = "3")]
    pub provider: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub contract_name: Vec<u8>,
    #[prost(int32, tag = "5")]
    pub permission_id: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct TransactionResult {
    #[prost(int64, tag = "1")]
    pub fee: i64,
    #[prost(int32, tag = "2")]
    pub ret: i32,
    #[prost(int32, tag = "3")]
    pub contract_ret: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct TransactionRaw {
    #[prost(bytes = "vec", tag = "1")]
    pub ref_block_bytes: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub ref_block_num: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub ref_block_hash: Vec<u8>,
    #[prost(int64, tag = "8")]
    pub expiration: i64,
    #[prost(bytes = "vec", tag = "10")]
    pub data: Vec<u8>,
    #[prost(message, repeated, tag = "11")]
    pub contract: Vec<Contract>,
    #[prost(bytes = "vec", tag = "12")]
    pub scripts: Vec<u8>,
    #[prost(int64, tag = "14")]
    pub timestamp: i64,
    #[prost(int64, tag = "18")]
    pub fee_limit: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct Transaction {
    #[prost(message, optional, tag = "1")]
    pub raw_data: Option<TransactionRaw>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub signature: Vec<Vec<u8>>,
    #[prost(message, repeated, tag = "5")]
    pub ret: Vec<TransactionResult>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TriggerSmartContract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub contract_address: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub call_value: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub data: Vec<u8>,
    #[prost(int64, tag = "5")]
    pub call_token_value: i64,
    #[prost(int64, tag = "6")]
    pub token_id: i64,
}

impl TriggerSmartContract {
    /// Wraps the call as the single contract of a transaction.
    pub fn into_contract(self) -> Contract {
        Contract {
            r#type: TRIGGER_SMART_CONTRACT_TYPE,
            parameter: Some(Any {
                type_url: TRIGGER_SMART_CONTRACT_TYPE_URL.to_string(),
                value: self.encode_to_vec(),
            }),
            ..Default::default()
        }
    }
}

impl Transaction {
    pub fn raw(&self) -> Result<&TransactionRaw, TronError> {
        self.raw_data
            .as_ref()
            .ok_or_else(|| TronError::MalformedTransaction("missing raw_data".to_string()))
    }

    pub fn raw_mut(&mut self) -> Result<&mut TransactionRaw, TronError> {
        self.raw_data
            .as_mut()
            .ok_or_else(|| TronError::MalformedTransaction("missing raw_data".to_string()))
    }

    /// Builds an unsigned transaction from the node's `raw_data_hex`.
    pub fn from_raw_data_hex(raw_data_hex: &str) -> Result<Self, TronError> {
        let bytes = hex::decode(raw_data_hex)
            .map_err(|e| TronError::MalformedTransaction(format!("raw_data_hex: {}", e)))?;
        let raw = TransactionRaw::decode(bytes.as_slice())
            .map_err(|e| TronError::MalformedTransaction(format!("raw_data: {}", e)))?;
        Ok(Self {
            raw_data: Some(raw),
            ..Default::default()
        })
    }
}

fn trigger_parameter(raw: &TransactionRaw) -> Result<&Any, TronError> {
    let contract = raw
        .contract
        .first()
        .ok_or_else(|| TronError::MalformedTransaction("transaction has no contract".to_string()))?;
    if contract.r#type != TRIGGER_SMART_CONTRACT_TYPE {
        return Err(TronError::MalformedTransaction(format!(
            "expected TriggerSmartContract, got contract type {}",
            contract.r#type
        )));
    }
    contract
        .parameter
        .as_ref()
        .ok_or_else(|| TronError::MalformedTransaction("contract has no parameter".to_string()))
}

/// Reads the embedded smart-contract call of a transaction.
pub fn trigger_call(tx: &Transaction) -> Result<TriggerSmartContract, TronError> {
    let parameter = trigger_parameter(tx.raw()?)?;
    TriggerSmartContract::decode(parameter.value.as_slice())
        .map_err(|e| TronError::MalformedTransaction(format!("TriggerSmartContract: {}", e)))
}

/// Replaces the call payload of the embedded smart-contract call in place.
pub fn set_trigger_data(tx: &mut Transaction, data: Vec<u8>) -> Result<(), TronError> {
    let mut call = trigger_call(tx)?;
    call.data = data;
    let encoded = call.encode_to_vec();

    let raw = tx.raw_mut()?;
    if let Some(parameter) = raw
        .contract
        .first_mut()
        .and_then(|contract| contract.parameter.as_mut())
    {
        parameter.value = encoded;
    }
    Ok(())
}

/// Block coordinates a transaction executes against, as the event-chain fold consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    pub number: u64,
    pub timestamp: u64,
}

impl BlockRef {
    /// Reads the reference block number and timestamp the node stamped into the raw data.
    pub fn from_raw(raw: &TransactionRaw) -> Result<Self, TronError> {
        let number = u64::try_from(raw.ref_block_num).map_err(|_| {
            TronError::MalformedTransaction(format!("negative ref_block_num {}", raw.ref_block_num))
        })?;
        let timestamp = u64::try_from(raw.timestamp).map_err(|_| {
            TronError::MalformedTransaction(format!("negative timestamp {}", raw.timestamp))
        })?;
        Ok(Self { number, timestamp })
    }
}
