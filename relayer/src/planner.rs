//! Event planning
//!
//! Predicts, in emission order, the events a batch of controller calls will append to the
//! event chain when executed against current on-chain state. A prediction is only valid
//! until that state changes; the checkpoint assertion catches the cases where it did.

use crate::calls::{self, ControllerCall};
use crate::event_chain::PlannedEvent;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chain_clients_tron::abi;
use chain_clients_tron::protocol::TriggerSmartContract;
use chain_clients_tron::{TronAddress, TronRpc};
use ethereum_types::U256;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const RECEIVER_DEPLOYED: &str = "ReceiverDeployed(address,bytes32)";
pub const PULLED_FROM_RECEIVER: &str = "PulledFromReceiver(bytes32,address,uint256,uint256,uint256)";
pub const USDT_REBALANCED: &str = "UsdtRebalanced(uint256,uint256,address)";

const BALANCE_OF: &str = "balanceOf(address)";
const FEE_BPS: &str = "feeBps()";
const BPS_DENOMINATOR: &str = "BPS_DENOMINATOR()";

/// Fixed-point scale of LP exchange rates (1e18).
pub fn rate_scale() -> U256 {
    U256::exp10(18)
}

/// Read access to chain state used while planning.
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Executes a read-only call and returns the raw return data.
    async fn read_contract(&self, contract: &TronAddress, calldata: Vec<u8>) -> Result<Vec<u8>>;

    async fn is_contract_deployed(&self, address: &TronAddress) -> Result<bool>;
}

/// Predicts the events a batch of controller calls emits.
#[async_trait]
pub trait EventPlanner: Send + Sync {
    async fn plan(
        &self,
        controller: &TronAddress,
        calls: &[ControllerCall],
        reader: &dyn ContractReader,
    ) -> Result<Vec<PlannedEvent>>;
}

/// [`ContractReader`] backed by constant calls on a Tron node.
pub struct RpcContractReader {
    rpc: Arc<dyn TronRpc>,
    caller: TronAddress,
}

impl RpcContractReader {
    pub fn new(rpc: Arc<dyn TronRpc>, caller: TronAddress) -> Self {
        Self { rpc, caller }
    }
}

#[async_trait]
impl ContractReader for RpcContractReader {
    async fn read_contract(&self, contract: &TronAddress, calldata: Vec<u8>) -> Result<Vec<u8>> {
        let call = TriggerSmartContract {
            owner_address: self.caller.as_bytes().to_vec(),
            contract_address: contract.as_bytes().to_vec(),
            data: calldata,
            ..Default::default()
        };
        self.rpc.trigger_constant_contract(&call).await
    }

    async fn is_contract_deployed(&self, address: &TronAddress) -> Result<bool> {
        self.rpc.is_contract_deployed(address).await
    }
}

/// Planner that mirrors the controller's own bookkeeping for each supported call.
#[derive(Debug, Default, Clone)]
pub struct ControllerEventPlanner;

impl ControllerEventPlanner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPlanner for ControllerEventPlanner {
    async fn plan(
        &self,
        controller: &TronAddress,
        calls: &[ControllerCall],
        reader: &dyn ContractReader,
    ) -> Result<Vec<PlannedEvent>> {
        let usdt_raw = reader
            .read_contract(controller, calls::encode_read(calls::USDT))
            .await
            .context("Failed to read usdt()")?;
        let usdt = abi::decode_address(&usdt_raw, 0).context("Failed to decode usdt()")?;

        let mut state = PlanningState::new(controller, reader);
        let mut events = Vec::new();

        for call in calls {
            match call {
                ControllerCall::PullFromReceivers { token, salts } => {
                    state
                        .plan_pull(&usdt, token, salts, &mut events)
                        .await
                        .context("pullFromReceivers")?;
                }
                ControllerCall::RebalanceUsdt {
                    rebalancer,
                    in_amount,
                } => {
                    let out_amount = state
                        .rebalance_out_amount(rebalancer, *in_amount)
                        .await
                        .context("rebalanceUsdt")?;
                    events.push(PlannedEvent {
                        signature: abi::event_topic(USDT_REBALANCED),
                        data: [
                            abi::encode_u256(*in_amount),
                            abi::encode_u256(out_amount),
                            abi::encode_address(rebalancer),
                        ]
                        .concat(),
                    });
                }
                ControllerCall::IsEventChainTip { .. } => {}
            }
        }

        debug!("Planned {} events for {} calls", events.len(), calls.len());
        Ok(events)
    }
}

/// Simulated state for one planning run: chain reads are cached and the effects of earlier
/// calls in the batch (deployments, swept balances) are applied to the cache.
struct PlanningState<'a> {
    controller: &'a TronAddress,
    reader: &'a dyn ContractReader,
    receivers: HashMap<[u8; 32], TronAddress>,
    deployed: HashMap<TronAddress, bool>,
    rates: HashMap<TronAddress, U256>,
    balances: HashMap<(TronAddress, TronAddress), U256>,
}

impl<'a> PlanningState<'a> {
    fn new(controller: &'a TronAddress, reader: &'a dyn ContractReader) -> Self {
        Self {
            controller,
            reader,
            receivers: HashMap::new(),
            deployed: HashMap::new(),
            rates: HashMap::new(),
            balances: HashMap::new(),
        }
    }

    async fn plan_pull(
        &mut self,
        usdt: &TronAddress,
        token: &TronAddress,
        salts: &[[u8; 32]],
        events: &mut Vec<PlannedEvent>,
    ) -> Result<()> {
        if salts.is_empty() {
            bail!("missing receiver salts");
        }

        let is_usdt = token == usdt;
        let rate = if is_usdt {
            rate_scale()
        } else {
            self.lp_exchange_rate(token).await?
        };
        if rate.is_zero() {
            bail!("LP exchange rate not set for {} (lpExchangeRateFor == 0)", token);
        }

        self.predict_receivers(salts).await?;

        for salt in salts {
            let receiver = self.receivers[salt];
            let balance = self.balance_of(token, &receiver).await?;
            let sweep = balance.saturating_sub(U256::one());
            if sweep.is_zero() {
                continue;
            }

            if !self.is_deployed(&receiver).await? {
                events.push(PlannedEvent {
                    signature: abi::event_topic(RECEIVER_DEPLOYED),
                    data: [abi::encode_address(&receiver), *salt].concat(),
                });
                self.deployed.insert(receiver, true);
            }

            let usdt_amount = if is_usdt {
                sweep
            } else {
                sweep
                    .checked_mul(rate)
                    .context("usdt amount overflows uint256")?
                    / rate_scale()
            };
            events.push(PlannedEvent {
                signature: abi::event_topic(PULLED_FROM_RECEIVER),
                data: [
                    *salt,
                    abi::encode_address(token),
                    abi::encode_u256(sweep),
                    abi::encode_u256(rate),
                    abi::encode_u256(usdt_amount),
                ]
                .concat(),
            });

            self.balances.insert((*token, receiver), U256::one());
        }
        Ok(())
    }

    /// Resolves receiver addresses for salts not seen yet with one batched controller read.
    async fn predict_receivers(&mut self, salts: &[[u8; 32]]) -> Result<()> {
        let mut pending: Vec<[u8; 32]> = Vec::new();
        for salt in salts {
            if !self.receivers.contains_key(salt) && !pending.contains(salt) {
                pending.push(*salt);
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let reads: Vec<Vec<u8>> = pending
            .iter()
            .map(|salt| abi::encode_call(abi::selector(calls::PREDICT_RECEIVER_ADDRESS), &[*salt]))
            .collect();
        let raw = self
            .reader
            .read_contract(self.controller, calls::encode_multicall(&reads))
            .await
            .context("Failed to predict receiver addresses")?;
        let results = abi::decode_bytes_array(&raw, 0)?;
        if results.len() != pending.len() {
            bail!(
                "controller multicall returned {} results for {} receiver salts",
                results.len(),
                pending.len()
            );
        }

        for (salt, result) in pending.into_iter().zip(results) {
            let receiver = abi::decode_address(&result, 0)?;
            self.receivers.insert(salt, receiver);
        }
        Ok(())
    }

    async fn lp_exchange_rate(&mut self, token: &TronAddress) -> Result<U256> {
        if let Some(rate) = self.rates.get(token) {
            return Ok(*rate);
        }
        let raw = self
            .reader
            .read_contract(
                self.controller,
                calls::encode_address_read(calls::LP_EXCHANGE_RATE_FOR, token),
            )
            .await?;
        let rate = abi::decode_u256(&raw, 0)?;
        self.rates.insert(*token, rate);
        Ok(rate)
    }

    async fn balance_of(&mut self, token: &TronAddress, account: &TronAddress) -> Result<U256> {
        if let Some(balance) = self.balances.get(&(*token, *account)) {
            return Ok(*balance);
        }
        let raw = self
            .reader
            .read_contract(token, calls::encode_address_read(BALANCE_OF, account))
            .await?;
        let balance = abi::decode_u256(&raw, 0)?;
        self.balances.insert((*token, *account), balance);
        Ok(balance)
    }

    async fn is_deployed(&mut self, address: &TronAddress) -> Result<bool> {
        if let Some(deployed) = self.deployed.get(address) {
            return Ok(*deployed);
        }
        let deployed = self.reader.is_contract_deployed(address).await?;
        self.deployed.insert(*address, deployed);
        Ok(deployed)
    }

    /// Output of the route configured for `rebalancer`: `in - in * feeBps / BPS_DENOMINATOR`
    /// of the OFT named in its payload.
    async fn rebalance_out_amount(
        &mut self,
        rebalancer: &TronAddress,
        in_amount: U256,
    ) -> Result<U256> {
        let raw = self
            .reader
            .read_contract(
                self.controller,
                calls::encode_address_read(calls::PAYLOAD_FOR, rebalancer),
            )
            .await?;
        let payload = abi::decode_bytes(&raw, 0)?;
        if payload.is_empty() {
            bail!("rebalance route not set for {} (payloadFor empty)", rebalancer);
        }
        abi::decode_word(&payload, 2)
            .context("unsupported rebalance payload (expected (address oft, uint32, bytes32))")?;
        let oft = abi::decode_address(&payload, 0)
            .context("unsupported rebalance payload (expected (address oft, uint32, bytes32))")?;

        let fee_bps = abi::decode_u256(
            &self
                .reader
                .read_contract(&oft, calls::encode_read(FEE_BPS))
                .await?,
            0,
        )?;
        let denominator = abi::decode_u256(
            &self
                .reader
                .read_contract(&oft, calls::encode_read(BPS_DENOMINATOR))
                .await?,
            0,
        )?;
        if denominator.is_zero() {
            bail!("OFT {} BPS_DENOMINATOR returned 0", oft);
        }

        let fee = in_amount
            .checked_mul(fee_bps)
            .context("rebalance fee overflows uint256")?
            / denominator;
        in_amount.checked_sub(fee).with_context(|| {
            format!(
                "OFT {} fee {} exceeds rebalance amount {} (feeBps {} > BPS_DENOMINATOR {})",
                oft, fee, in_amount, fee_bps, denominator
            )
        })
    }
}
