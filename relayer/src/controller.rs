//! Checkpointed multicall protocol
//!
//! Writes to the controller are sent as one `multicall` whose last call is
//! `isEventChainTip(expectedTip)`. `expectedTip` is the current tip folded with the events the
//! batch is predicted to emit, using the block metadata of the transaction actually built.
//! If another writer advances the tip first, the assertion reverts the whole transaction
//! and the attempt is retried from a fresh tip read.

use crate::calls::{self, ControllerCall};
use crate::config::Config;
use crate::error::RelayerError;
use crate::event_chain::{fold_events, Tip};
use crate::planner::{ControllerEventPlanner, EventPlanner, RpcContractReader};
use chain_clients_tron::abi;
use chain_clients_tron::protocol::{set_trigger_data, BlockRef, TriggerSmartContract};
use chain_clients_tron::{
    broadcast_and_confirm, ConfirmSettings, TronAddress, TronError, TronHttpClient, TronRpc,
    TronSigner,
};
use ethereum_types::U256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts per checkpointed write before giving up.
pub const CHECKPOINT_ATTEMPTS: u32 = 3;

/// Revert the controller raises when `isEventChainTip` does not match.
const TIP_MISMATCH_REVERT: &str = "Error(\"no\")";

/// Returns true when `err` is the controller's checkpoint revert.
///
/// This is the only failure the checkpoint loop retries.
pub fn is_tip_mismatch(err: &TronError) -> bool {
    matches!(err, TronError::ExecutionFailed { message, .. } if message.contains(TIP_MISMATCH_REVERT))
}

/// Submission parameters for controller writes.
#[derive(Debug, Clone, Copy)]
pub struct SendSettings {
    /// Fee ceiling in sun stamped into every transaction.
    pub fee_limit: i64,
    /// TRX attached to multicall transactions; the controller's multicall rejects any value.
    pub call_value: i64,
    pub poll_times: u32,
    pub poll_interval: Duration,
}

impl SendSettings {
    fn confirm_settings(&self) -> ConfirmSettings {
        ConfirmSettings {
            fee_limit: self.fee_limit,
            poll_times: self.poll_times,
            poll_interval: self.poll_interval,
        }
    }
}

/// Relayer-side handle on the controller.
///
/// All collaborators are injected so the retry loop can run against fakes.
pub struct ControllerClient {
    rpc: Arc<dyn TronRpc>,
    planner: Arc<dyn EventPlanner>,
    signer: TronSigner,
    controller: TronAddress,
    settings: SendSettings,
}

impl ControllerClient {
    pub fn new(
        rpc: Arc<dyn TronRpc>,
        planner: Arc<dyn EventPlanner>,
        signer: TronSigner,
        controller: TronAddress,
        settings: SendSettings,
    ) -> Self {
        Self {
            rpc,
            planner,
            signer,
            controller,
            settings,
        }
    }

    /// Wires the HTTP node client, the controller planner and the relayer key from config.
    ///
    /// # Returns
    ///
    /// * `Ok(ControllerClient)` - Ready client
    /// * `Err(anyhow::Error)` - Missing key/API key variable, bad key, or bad endpoint
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let private_key = config.relayer.get_private_key()?;
        let signer = TronSigner::from_hex(&private_key)?;
        let rpc = TronHttpClient::new(
            &config.tron.rpc_url,
            Duration::from_millis(config.tron.request_timeout_ms),
            config.tron.get_api_key()?,
        )?;

        info!(
            "Relayer {} targeting controller {} via {}",
            signer.address(),
            config.tron.controller_address,
            config.tron.rpc_url
        );

        Ok(Self::new(
            Arc::new(rpc),
            Arc::new(ControllerEventPlanner::new()),
            signer,
            config.tron.controller()?,
            config.send_settings()?,
        ))
    }

    pub fn relayer_address(&self) -> TronAddress {
        self.signer.address()
    }

    pub fn controller_address(&self) -> TronAddress {
        self.controller
    }

    // ========================================================================
    // READS
    // ========================================================================

    async fn read(&self, calldata: Vec<u8>) -> Result<Vec<u8>, RelayerError> {
        let call = TriggerSmartContract {
            owner_address: self.relayer_address().as_bytes().to_vec(),
            contract_address: self.controller.as_bytes().to_vec(),
            data: calldata,
            ..Default::default()
        };
        self.rpc
            .trigger_constant_contract(&call)
            .await
            .map_err(TronError::Rpc)
            .map_err(RelayerError::from)
    }

    /// The USDT token the controller accounts in.
    pub async fn usdt(&self) -> Result<TronAddress, RelayerError> {
        let raw = self.read(calls::encode_read(calls::USDT)).await?;
        abi::decode_address(&raw, 0).map_err(RelayerError::Read)
    }

    /// Current head of the event chain.
    pub async fn event_chain_tip(&self) -> Result<Tip, RelayerError> {
        let raw = self.read(calls::encode_read(calls::EVENT_CHAIN_TIP)).await?;
        abi::decode_word(&raw, 0).map_err(RelayerError::Read)
    }

    /// Total USDT pulled from receivers so far.
    pub async fn pulled_usdt(&self) -> Result<U256, RelayerError> {
        let raw = self.read(calls::encode_read(calls::PULLED_USDT)).await?;
        abi::decode_u256(&raw, 0).map_err(RelayerError::Read)
    }

    /// LP exchange rate of `token` (1e18 fixed point); zero when unset.
    pub async fn lp_exchange_rate_for(&self, token: &TronAddress) -> Result<U256, RelayerError> {
        let raw = self
            .read(calls::encode_address_read(calls::LP_EXCHANGE_RATE_FOR, token))
            .await?;
        abi::decode_u256(&raw, 0).map_err(RelayerError::Read)
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Sweeps `token` from the receivers behind `salts`.
    pub async fn pull_from_receivers(
        &self,
        token: TronAddress,
        salts: Vec<[u8; 32]>,
    ) -> Result<String, RelayerError> {
        if salts.is_empty() {
            return Err(RelayerError::Configuration(
                "pullFromReceivers needs at least one receiver salt".to_string(),
            ));
        }
        self.send_multicall(vec![ControllerCall::PullFromReceivers { token, salts }])
            .await
    }

    /// Rebalances `in_amount` USDT through `rebalancer`.
    pub async fn rebalance_usdt(
        &self,
        rebalancer: TronAddress,
        in_amount: U256,
    ) -> Result<String, RelayerError> {
        self.send_multicall(vec![ControllerCall::RebalanceUsdt {
            rebalancer,
            in_amount,
        }])
        .await
    }

    /// Liveness probe: a batch holding only the checkpoint assertion of the current tip.
    pub async fn assert_event_chain_tip(&self) -> Result<String, RelayerError> {
        self.send_checkpointed(&[]).await
    }

    /// Sends `calls` as one checkpointed multicall.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - txid of the committed transaction
    /// * `Err(RelayerError::Configuration)` - Empty batch or nonzero call value
    /// * `Err(RelayerError::EventChainCheckpointExhausted)` - Every attempt lost the tip race
    /// * `Err(RelayerError::Tron)` - Any other submission failure
    pub async fn send_multicall(&self, calls: Vec<ControllerCall>) -> Result<String, RelayerError> {
        if calls.is_empty() {
            return Err(RelayerError::Configuration(
                "multicall needs at least one call".to_string(),
            ));
        }
        self.send_checkpointed(&calls).await
    }

    async fn send_checkpointed(&self, calls: &[ControllerCall]) -> Result<String, RelayerError> {
        if self.settings.call_value != 0 {
            return Err(RelayerError::Configuration(format!(
                "call value must be 0 for controller multicall (got {} sun); multicall rejects msg.value",
                self.settings.call_value
            )));
        }

        let encoded: Vec<Vec<u8>> = calls.iter().map(ControllerCall::encode).collect();
        let names: Vec<&str> = calls.iter().map(ControllerCall::name).collect();
        debug!("Sending controller multicall [{}]", names.join(", "));

        let reader = RpcContractReader::new(self.rpc.clone(), self.controller);

        for attempt in 1..=CHECKPOINT_ATTEMPTS {
            let pre_tip = self.event_chain_tip().await?;
            let events = self
                .planner
                .plan(&self.controller, calls, &reader)
                .await
                .map_err(RelayerError::Planning)?;

            let mut tx = self
                .rpc
                .trigger_contract(
                    &TriggerSmartContract {
                        owner_address: self.relayer_address().as_bytes().to_vec(),
                        contract_address: self.controller.as_bytes().to_vec(),
                        call_value: self.settings.call_value,
                        data: calls::encode_multicall(&encoded),
                        ..Default::default()
                    },
                    self.settings.fee_limit,
                )
                .await
                .map_err(TronError::Rpc)?;

            let block = BlockRef::from_raw(tx.raw()?)?;
            let expected_tip = fold_events(pre_tip, &block, &events);
            debug!(
                "Attempt {}: tip 0x{} + {} events at block {} -> 0x{}",
                attempt,
                hex::encode(pre_tip),
                events.len(),
                block.number,
                hex::encode(expected_tip)
            );

            let mut batch = encoded.clone();
            batch.push(ControllerCall::IsEventChainTip { tip: expected_tip }.encode());
            set_trigger_data(&mut tx, calls::encode_multicall(&batch))?;

            match broadcast_and_confirm(
                self.rpc.as_ref(),
                tx,
                &self.signer,
                &self.settings.confirm_settings(),
            )
            .await
            {
                Ok(txid) => {
                    info!(
                        "Controller multicall confirmed: txid={} attempt={}",
                        txid, attempt
                    );
                    return Ok(txid);
                }
                Err(err) if is_tip_mismatch(&err) => {
                    warn!(
                        "Event chain tip moved during attempt {}/{}: {}",
                        attempt, CHECKPOINT_ATTEMPTS, err
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(RelayerError::EventChainCheckpointExhausted {
            attempts: CHECKPOINT_ATTEMPTS,
        })
    }
}
