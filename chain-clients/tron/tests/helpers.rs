//! Shared test helpers for Tron client tests
//!
//! The module is organized into several categories:
//! - **Constants**: Keys and addresses with their known encodings
//! - **Builders**: Unsigned transactions and ABI revert payloads

#![allow(dead_code)]

use chain_clients_tron::abi;
use chain_clients_tron::protocol::{Transaction, TransactionRaw, TriggerSmartContract};
use chain_clients_tron::{ConfirmSettings, TronAddress};
use std::time::Duration;

// ============================================================================
// CONSTANTS
// ============================================================================

// --------------------------------- KEYS ---------------------------------

/// Private key `1`
pub const DUMMY_PRIVATE_KEY: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000001";

/// Address of `DUMMY_PRIVATE_KEY` (base58)
pub const DUMMY_ADDR_BASE58: &str = "TMVQGm1qAQYVdetCeGRRkTWYYrLXuHK2HC";

/// Address of `DUMMY_PRIVATE_KEY` (EVM form)
pub const DUMMY_ADDR_EVM: &str = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";

/// Private key `0x11` repeated
pub const DUMMY_PRIVATE_KEY_2: &str =
    "1111111111111111111111111111111111111111111111111111111111111111";

pub const DUMMY_ADDR_2_BASE58: &str = "TCLBgkbfVkJroVBJVqBEsxtPNQEQMTQCLQ";

pub const DUMMY_ADDR_2_EVM: &str = "0x19e7e376e7c213b7e7e7e46cc70a5dd086daff2a";

/// Private key `0x0123456789abcdef` repeated
pub const DUMMY_PRIVATE_KEY_3: &str =
    "0x0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

pub const DUMMY_ADDR_3_BASE58: &str = "TZ1EafTG8FRtE6ef3H2dhaucDdjv36fzPY";

pub const DUMMY_ADDR_3_EVM: &str = "0xfcad0b19bb29d4674531d6f115237e16afce377c";

// ------------------------------ ADDRESSES -------------------------------

/// `0x41` followed by twenty `0x11` bytes
pub const DUMMY_CONTRACT_ADDR_HEX: &str = "411111111111111111111111111111111111111111";

pub const DUMMY_CONTRACT_ADDR_BASE58: &str = "TBXSw8fM4jpQkGc6zZjsVABFpVN7UvXPdV";

/// The all-zero account
pub const ZERO_ADDR_BASE58: &str = "T9yD14Nj9j7xAB4dbGeiX9h8unkKHxuWwb";

/// Valid base58check of `0x42` followed by twenty `0x22` bytes (wrong prefix)
pub const WRONG_PREFIX_BASE58: &str = "TcRHrKFFgvyk9oHfRHALwHwAMhErMNY3AG";

/// Valid base58check of `0x41` followed by nineteen `0x22` bytes (too short)
pub const SHORT_PAYLOAD_BASE58: &str = "6wPp6V5kViaW5PTsAFv2EddLRWgALPpkG";

// -------------------------------- BLOCKS --------------------------------

pub const DUMMY_BLOCK_NUMBER: i64 = 1234;

pub const DUMMY_TIMESTAMP_MS: i64 = 1_700_000_000_000;

// ============================================================================
// BUILDERS
// ============================================================================

pub fn dummy_contract() -> TronAddress {
    TronAddress::from_hex(DUMMY_CONTRACT_ADDR_HEX).unwrap()
}

pub fn dummy_owner() -> TronAddress {
    DUMMY_ADDR_BASE58.parse().unwrap()
}

/// Unsigned transaction calling `contract` with `data`, as a node would build it.
pub fn dummy_unsigned_tx(data: Vec<u8>) -> Transaction {
    let call = TriggerSmartContract {
        owner_address: dummy_owner().as_bytes().to_vec(),
        contract_address: dummy_contract().as_bytes().to_vec(),
        data,
        ..Default::default()
    };
    Transaction {
        raw_data: Some(TransactionRaw {
            ref_block_bytes: vec![0x04, 0xd2],
            ref_block_num: DUMMY_BLOCK_NUMBER,
            ref_block_hash: vec![0xaa; 8],
            expiration: DUMMY_TIMESTAMP_MS + 60_000,
            contract: vec![call.into_contract()],
            timestamp: DUMMY_TIMESTAMP_MS,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Hex of the protobuf-encoded raw data, as `raw_data_hex` in node responses.
pub fn raw_data_hex(tx: &Transaction) -> String {
    use prost::Message;
    hex::encode(tx.raw_data.as_ref().unwrap().encode_to_vec())
}

/// `Error(string)` revert payload.
pub fn error_string_revert(reason: &str) -> Vec<u8> {
    let mut tail = abi::encode_usize(reason.len()).to_vec();
    tail.extend_from_slice(reason.as_bytes());
    tail.resize(32 + reason.len().div_ceil(32) * 32, 0);
    abi::encode_call_with_dynamic([0x08, 0xc3, 0x79, 0xa0], &[], &tail)
}

/// Fast polling budget for tests.
pub fn test_settings(poll_times: u32) -> ConfirmSettings {
    ConfirmSettings {
        fee_limit: 150_000_000,
        poll_times,
        poll_interval: Duration::from_millis(10),
    }
}
