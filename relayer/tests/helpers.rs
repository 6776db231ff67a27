//! Shared test helpers for relayer tests
//!
//! The module is organized into several categories:
//! - **Constants**: Keys, addresses and block metadata
//! - **Fake node**: In-memory Tron node that executes the controller's checkpoint check
//! - **Fake planner / reader**: Scripted event prediction and chain state

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chain_clients_tron::abi;
use chain_clients_tron::protocol::{
    trigger_call, BlockRef, Transaction, TransactionRaw, TriggerSmartContract,
};
use chain_clients_tron::signing::transaction_id;
use chain_clients_tron::{BroadcastReturn, TransactionInfo, TronAddress, TronRpc, TronSigner};
use ethereum_types::U256;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tron_relayer::calls::{self, decode_multicall};
use tron_relayer::{
    fold_events, ContractReader, ControllerCall, ControllerClient, EventPlanner, PlannedEvent,
    SendSettings, Tip,
};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Relayer key `1`
pub const DUMMY_PRIVATE_KEY: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000001";

/// Controller: `0x41` followed by twenty `0x11` bytes
pub const DUMMY_CONTROLLER_ADDR: &str = "TBXSw8fM4jpQkGc6zZjsVABFpVN7UvXPdV";

pub const DUMMY_USDT_ADDR_HEX: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";

pub const DUMMY_TOKEN_ADDR_HEX: &str = "414444444444444444444444444444444444444444";

pub const DUMMY_REBALANCER_ADDR_HEX: &str = "415555555555555555555555555555555555555555";

pub const DUMMY_OFT_ADDR_HEX: &str = "416666666666666666666666666666666666666666";

pub const DUMMY_BLOCK_NUMBER: u64 = 1234;

pub const DUMMY_TIMESTAMP_MS: u64 = 1_700_000_000_000;

pub const DUMMY_INITIAL_TIP: Tip = [0x11; 32];

pub fn addr(hex: &str) -> TronAddress {
    TronAddress::from_hex(hex).unwrap()
}

pub fn controller() -> TronAddress {
    DUMMY_CONTROLLER_ADDR.parse().unwrap()
}

pub fn usdt() -> TronAddress {
    addr(DUMMY_USDT_ADDR_HEX)
}

pub fn token() -> TronAddress {
    addr(DUMMY_TOKEN_ADDR_HEX)
}

pub fn rebalancer() -> TronAddress {
    addr(DUMMY_REBALANCER_ADDR_HEX)
}

pub fn oft() -> TronAddress {
    addr(DUMMY_OFT_ADDR_HEX)
}

pub fn salt(byte: u8) -> [u8; 32] {
    [byte; 32]
}

/// Receiver address the fake controller predicts for a salt.
pub fn receiver_for(salt: &[u8; 32]) -> TronAddress {
    let mut evm = [0u8; 20];
    evm.copy_from_slice(&salt[..20]);
    evm[0] = 0xee;
    TronAddress::from_evm_bytes(&evm).unwrap()
}

pub fn block() -> BlockRef {
    BlockRef {
        number: DUMMY_BLOCK_NUMBER,
        timestamp: DUMMY_TIMESTAMP_MS,
    }
}

pub fn dummy_events() -> Vec<PlannedEvent> {
    vec![
        PlannedEvent {
            signature: [0xaa; 32],
            data: vec![0xde, 0xad, 0xbe, 0xef],
        },
        PlannedEvent {
            signature: [0xbb; 32],
            data: vec![0xca, 0xfe, 0xba, 0xbe],
        },
    ]
}

/// Tip after a competing writer lands one event on top of `tip`.
pub fn contended(tip: &Tip) -> Tip {
    Sha256::digest([tip.as_slice(), b"contender".as_slice()].concat()).into()
}

pub fn fast_settings() -> SendSettings {
    SendSettings {
        fee_limit: 150_000_000,
        call_value: 0,
        poll_times: 3,
        poll_interval: Duration::from_millis(5),
    }
}

/// `Error(string)` revert payload.
pub fn error_string_revert(reason: &str) -> Vec<u8> {
    let mut tail = abi::encode_usize(reason.len()).to_vec();
    tail.extend_from_slice(reason.as_bytes());
    tail.resize(32 + reason.len().div_ceil(32) * 32, 0);
    abi::encode_call_with_dynamic([0x08, 0xc3, 0x79, 0xa0], &[], &tail)
}

/// ABI return data of a single dynamic `bytes` or `bytes[]` value.
pub fn dynamic_return(tail: &[u8]) -> Vec<u8> {
    [abi::encode_usize(32).as_slice(), tail].concat()
}

pub fn bytes_return(payload: &[u8]) -> Vec<u8> {
    let mut tail = abi::encode_usize(payload.len()).to_vec();
    tail.extend_from_slice(payload);
    tail.resize(32 + payload.len().div_ceil(32) * 32, 0);
    dynamic_return(&tail)
}

// ============================================================================
// FAKE NODE
// ============================================================================

/// Observable state of the fake node.
pub struct FakeState {
    /// Controller event-chain tip
    pub tip: Tip,
    /// Block metadata stamped into every built transaction
    pub block: BlockRef,
    /// Events the controller actually emits for each executed batch
    pub emitted: Vec<PlannedEvent>,
    /// Tip reads after which a competing writer advances the tip
    pub contending_writes: u32,
    /// Revert every execution with this payload instead of running the checkpoint check
    pub forced_revert: Option<Vec<u8>>,
    /// Reject every broadcast with this message
    pub reject_broadcast: Option<String>,
    /// Never report execution info
    pub never_confirm: bool,
    /// Answers to constant calls by selector
    pub constant_answers: HashMap<[u8; 4], Vec<u8>>,

    pub tip_reads: u32,
    pub constant_reads: u32,
    pub built_calls: Vec<TriggerSmartContract>,
    pub built_fee_limits: Vec<i64>,
    pub broadcasts: Vec<Transaction>,
    pub infos: HashMap<String, TransactionInfo>,
}

/// In-memory Tron node hosting the controller's event chain.
///
/// Executing a broadcast multicall folds `emitted` into the tip with the transaction's
/// block metadata and compares the result with the trailing `isEventChainTip` argument;
/// a mismatch reverts with `Error("no")` and leaves the tip untouched.
pub struct FakeTronNode {
    pub state: Mutex<FakeState>,
}

impl FakeTronNode {
    pub fn new(emitted: Vec<PlannedEvent>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                tip: DUMMY_INITIAL_TIP,
                block: block(),
                emitted,
                contending_writes: 0,
                forced_revert: None,
                reject_broadcast: None,
                never_confirm: false,
                constant_answers: HashMap::new(),
                tip_reads: 0,
                constant_reads: 0,
                built_calls: Vec::new(),
                built_fee_limits: Vec::new(),
                broadcasts: Vec::new(),
                infos: HashMap::new(),
            }),
        })
    }

    pub fn with_state(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn tip(&self) -> Tip {
        self.state.lock().unwrap().tip
    }

    pub fn broadcast_count(&self) -> usize {
        self.state.lock().unwrap().broadcasts.len()
    }

    /// Calls inside the multicall of the `index`-th broadcast transaction.
    pub fn broadcast_calls(&self, index: usize) -> Vec<Vec<u8>> {
        let state = self.state.lock().unwrap();
        let call = trigger_call(&state.broadcasts[index]).unwrap();
        decode_multicall(&call.data).unwrap()
    }

    fn execute(state: &mut FakeState, tx: &Transaction) -> TransactionInfo {
        let txid = transaction_id(tx.raw_data.as_ref().unwrap());
        let failed = |revert: Vec<u8>| TransactionInfo {
            id: txid.clone(),
            block_number: state.block.number + 1,
            result: Some("FAILED".to_string()),
            res_message: Some(hex::encode("REVERT opcode executed")),
            contract_result: vec![hex::encode(revert)],
            ..Default::default()
        };

        if let Some(revert) = state.forced_revert.clone() {
            return failed(revert);
        }

        let call = trigger_call(tx).unwrap();
        let batch = decode_multicall(&call.data).unwrap();
        let checkpoint = batch.last().unwrap();
        assert_eq!(
            checkpoint[..4],
            abi::selector(calls::IS_EVENT_CHAIN_TIP),
            "multicall must end with isEventChainTip"
        );
        let asserted = &checkpoint[4..36];

        let executed_block = BlockRef::from_raw(tx.raw_data.as_ref().unwrap()).unwrap();
        let actual = fold_events(state.tip, &executed_block, &state.emitted);
        if asserted != actual {
            return failed(error_string_revert("no"));
        }

        state.tip = actual;
        TransactionInfo {
            id: txid,
            block_number: state.block.number + 1,
            ..Default::default()
        }
    }
}

#[async_trait]
impl TronRpc for FakeTronNode {
    async fn trigger_contract(
        &self,
        call: &TriggerSmartContract,
        fee_limit: i64,
    ) -> Result<Transaction> {
        let mut state = self.state.lock().unwrap();
        state.built_calls.push(call.clone());
        state.built_fee_limits.push(fee_limit);
        let nonce = state.built_calls.len() as i64;

        Ok(Transaction {
            raw_data: Some(TransactionRaw {
                ref_block_bytes: vec![0x04, 0xd2],
                ref_block_num: state.block.number as i64,
                ref_block_hash: nonce.to_be_bytes().to_vec(),
                expiration: state.block.timestamp as i64 + 60_000,
                contract: vec![call.clone().into_contract()],
                timestamp: state.block.timestamp as i64,
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    async fn trigger_constant_contract(&self, call: &TriggerSmartContract) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.constant_reads += 1;
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&call.data[..4]);

        if selector == abi::selector(calls::EVENT_CHAIN_TIP) {
            state.tip_reads += 1;
            let tip = state.tip;
            if state.contending_writes > 0 {
                state.contending_writes -= 1;
                state.tip = contended(&tip);
            }
            return Ok(tip.to_vec());
        }

        state
            .constant_answers
            .get(&selector)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unexpected constant call 0x{}", hex::encode(selector)))
    }

    async fn broadcast_transaction(&self, tx: &Transaction) -> Result<BroadcastReturn> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.reject_broadcast.clone() {
            return Ok(BroadcastReturn {
                result: false,
                message,
            });
        }
        assert_eq!(tx.signature.len(), 1, "broadcast transaction must be signed");

        state.broadcasts.push(tx.clone());
        let info = Self::execute(&mut state, tx);
        state.infos.insert(info.id.clone(), info);
        Ok(BroadcastReturn {
            result: true,
            message: String::new(),
        })
    }

    async fn get_transaction_info_by_id(&self, txid: &str) -> Result<Option<TransactionInfo>> {
        let state = self.state.lock().unwrap();
        if state.never_confirm {
            return Ok(None);
        }
        Ok(state.infos.get(txid).cloned())
    }

    async fn is_contract_deployed(&self, _address: &TronAddress) -> Result<bool> {
        Ok(true)
    }
}

// ============================================================================
// FAKE PLANNER
// ============================================================================

/// Planner returning a fixed event list and recording what it was asked.
pub struct ScriptedPlanner {
    pub events: Vec<PlannedEvent>,
    pub plans: Mutex<Vec<Vec<ControllerCall>>>,
}

impl ScriptedPlanner {
    pub fn new(events: Vec<PlannedEvent>) -> Arc<Self> {
        Arc::new(Self {
            events,
            plans: Mutex::new(Vec::new()),
        })
    }

    pub fn plan_count(&self) -> usize {
        self.plans.lock().unwrap().len()
    }
}

#[async_trait]
impl EventPlanner for ScriptedPlanner {
    async fn plan(
        &self,
        _controller: &TronAddress,
        calls: &[ControllerCall],
        _reader: &dyn ContractReader,
    ) -> Result<Vec<PlannedEvent>> {
        self.plans.lock().unwrap().push(calls.to_vec());
        Ok(self.events.clone())
    }
}

pub fn create_client(
    node: Arc<FakeTronNode>,
    planner: Arc<ScriptedPlanner>,
    settings: SendSettings,
) -> ControllerClient {
    ControllerClient::new(
        node,
        planner,
        TronSigner::from_hex(DUMMY_PRIVATE_KEY).unwrap(),
        controller(),
        settings,
    )
}

// ============================================================================
// FAKE READER
// ============================================================================

/// Chain state served to the controller planner.
pub struct FakeReader {
    pub usdt: TronAddress,
    pub balances: HashMap<(TronAddress, TronAddress), U256>,
    pub rates: HashMap<TronAddress, U256>,
    pub deployed: HashSet<TronAddress>,
    pub payloads: HashMap<TronAddress, Vec<u8>>,
    pub fee_bps: U256,
    pub bps_denominator: U256,
    pub reads: Mutex<Vec<(TronAddress, [u8; 4])>>,
}

impl FakeReader {
    pub fn new() -> Self {
        Self {
            usdt: usdt(),
            balances: HashMap::new(),
            rates: HashMap::new(),
            deployed: HashSet::new(),
            payloads: HashMap::new(),
            fee_bps: U256::zero(),
            bps_denominator: U256::from(10_000),
            reads: Mutex::new(Vec::new()),
        }
    }

    pub fn read_count(&self, selector: [u8; 4]) -> usize {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| *s == selector)
            .count()
    }

    fn answer(&self, contract: &TronAddress, calldata: &[u8]) -> Result<Vec<u8>> {
        let selector = &calldata[..4];
        let args = &calldata[4..];
        let is = |signature: &str| selector == abi::selector(signature);

        if is(calls::USDT) {
            Ok(abi::encode_address(&self.usdt).to_vec())
        } else if is(calls::MULTICALL) {
            let results: Vec<Vec<u8>> = decode_multicall(calldata)?
                .iter()
                .map(|inner| self.answer(contract, inner))
                .collect::<Result<_>>()?;
            Ok(dynamic_return(&abi::encode_bytes_array(&results)))
        } else if is(calls::PREDICT_RECEIVER_ADDRESS) {
            let salt = abi::decode_word(args, 0)?;
            Ok(abi::encode_address(&receiver_for(&salt)).to_vec())
        } else if is(calls::LP_EXCHANGE_RATE_FOR) {
            let token = abi::decode_address(args, 0)?;
            let rate = self.rates.get(&token).copied().unwrap_or_default();
            Ok(abi::encode_u256(rate).to_vec())
        } else if is("balanceOf(address)") {
            let account = abi::decode_address(args, 0)?;
            let balance = self
                .balances
                .get(&(*contract, account))
                .copied()
                .unwrap_or_default();
            Ok(abi::encode_u256(balance).to_vec())
        } else if is(calls::PAYLOAD_FOR) {
            let rebalancer = abi::decode_address(args, 0)?;
            let payload = self.payloads.get(&rebalancer).cloned().unwrap_or_default();
            Ok(bytes_return(&payload))
        } else if is("feeBps()") {
            Ok(abi::encode_u256(self.fee_bps).to_vec())
        } else if is("BPS_DENOMINATOR()") {
            Ok(abi::encode_u256(self.bps_denominator).to_vec())
        } else {
            anyhow::bail!("unexpected read 0x{}", hex::encode(selector))
        }
    }
}

#[async_trait]
impl ContractReader for FakeReader {
    async fn read_contract(&self, contract: &TronAddress, calldata: Vec<u8>) -> Result<Vec<u8>> {
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&calldata[..4]);
        self.reads.lock().unwrap().push((*contract, selector));
        self.answer(contract, &calldata)
    }

    async fn is_contract_deployed(&self, address: &TronAddress) -> Result<bool> {
        Ok(self.deployed.contains(address))
    }
}
