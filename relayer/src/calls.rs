//! Controller calls
//!
//! Typed form of the controller functions the relayer sends, so planning works on values
//! instead of decoding calldata back.

use crate::event_chain::Tip;
use chain_clients_tron::abi;
use chain_clients_tron::TronAddress;
use ethereum_types::U256;

pub const MULTICALL: &str = "multicall(bytes[])";
pub const IS_EVENT_CHAIN_TIP: &str = "isEventChainTip(bytes32)";
pub const PULL_FROM_RECEIVERS: &str = "pullFromReceivers(address,bytes32[])";
pub const REBALANCE_USDT: &str = "rebalanceUsdt(address,uint256)";

pub const EVENT_CHAIN_TIP: &str = "eventChainTip()";
pub const USDT: &str = "usdt()";
pub const PULLED_USDT: &str = "pulledUsdt()";
pub const LP_EXCHANGE_RATE_FOR: &str = "lpExchangeRateFor(address)";
pub const PREDICT_RECEIVER_ADDRESS: &str = "predictReceiverAddress(bytes32)";
pub const PAYLOAD_FOR: &str = "payloadFor(address)";

/// A state-changing call on the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerCall {
    /// Sweep `token` from the receivers derived from `salts`.
    PullFromReceivers {
        token: TronAddress,
        salts: Vec<[u8; 32]>,
    },
    /// Bridge `in_amount` USDT through `rebalancer`'s configured route.
    RebalanceUsdt {
        rebalancer: TronAddress,
        in_amount: U256,
    },
    /// Revert unless the event-chain tip equals `tip`.
    IsEventChainTip { tip: Tip },
}

impl ControllerCall {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ControllerCall::PullFromReceivers { token, salts } => abi::encode_call_with_dynamic(
                abi::selector(PULL_FROM_RECEIVERS),
                &[abi::encode_address(token)],
                &abi::encode_bytes32_array(salts),
            ),
            ControllerCall::RebalanceUsdt {
                rebalancer,
                in_amount,
            } => abi::encode_call(
                abi::selector(REBALANCE_USDT),
                &[abi::encode_address(rebalancer), abi::encode_u256(*in_amount)],
            ),
            ControllerCall::IsEventChainTip { tip } => {
                abi::encode_call(abi::selector(IS_EVENT_CHAIN_TIP), &[*tip])
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControllerCall::PullFromReceivers { .. } => "pullFromReceivers",
            ControllerCall::RebalanceUsdt { .. } => "rebalanceUsdt",
            ControllerCall::IsEventChainTip { .. } => "isEventChainTip",
        }
    }
}

/// `multicall(bytes[])` calldata over already-encoded calls.
pub fn encode_multicall(calls: &[Vec<u8>]) -> Vec<u8> {
    abi::encode_call_with_dynamic(abi::selector(MULTICALL), &[], &abi::encode_bytes_array(calls))
}

/// Splits `multicall(bytes[])` calldata back into its calls.
pub fn decode_multicall(calldata: &[u8]) -> anyhow::Result<Vec<Vec<u8>>> {
    if calldata.len() < 4 || calldata[..4] != abi::selector(MULTICALL) {
        anyhow::bail!("not a multicall(bytes[]) call");
    }
    abi::decode_bytes_array(&calldata[4..], 0)
}

/// Calldata of a read without arguments.
pub fn encode_read(signature: &str) -> Vec<u8> {
    abi::selector(signature).to_vec()
}

/// Calldata of a read taking one address.
pub fn encode_address_read(signature: &str, address: &TronAddress) -> Vec<u8> {
    abi::encode_call(abi::selector(signature), &[abi::encode_address(address)])
}
