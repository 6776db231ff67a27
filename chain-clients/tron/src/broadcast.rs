//! Broadcast and confirmation
//!
//! Stamps the fee ceiling, signs, submits once and then only re-polls: a transaction is
//! never re-submitted, so a timeout leaves its true outcome unknown.

use crate::error::TronError;
use crate::protocol::Transaction;
use crate::revert::describe_failure;
use crate::rpc::TronRpc;
use crate::signing::TronSigner;
use std::time::Duration;
use tracing::{debug, info};

/// Fee ceiling and polling budget of one submission.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmSettings {
    /// Maximum energy fee in sun stamped into the transaction.
    pub fee_limit: i64,
    /// Number of execution-info lookups before giving up.
    pub poll_times: u32,
    /// Sleep between lookups.
    pub poll_interval: Duration,
}

/// Signs and broadcasts a transaction, then waits for a terminal outcome.
///
/// # Arguments
///
/// * `rpc` - Node to submit to and poll
/// * `tx` - Unsigned transaction; its fee limit and signature are overwritten
/// * `signer` - Relayer key
/// * `settings` - Fee ceiling and polling budget
///
/// # Returns
///
/// * `Ok(String)` - Hex txid of the successfully executed transaction
/// * `Err(TronError::BroadcastRejected)` - The node refused the transaction
/// * `Err(TronError::ExecutionFailed)` - The transaction executed and failed
/// * `Err(TronError::ConfirmationTimeout)` - No terminal outcome within the polling budget
pub async fn broadcast_and_confirm(
    rpc: &dyn TronRpc,
    mut tx: Transaction,
    signer: &TronSigner,
    settings: &ConfirmSettings,
) -> Result<String, TronError> {
    if settings.fee_limit < 0 {
        return Err(TronError::MalformedTransaction(format!(
            "negative fee limit {}",
            settings.fee_limit
        )));
    }
    tx.raw_mut()?.fee_limit = settings.fee_limit;
    let txid = signer.sign_transaction(&mut tx)?;

    let broadcast = rpc.broadcast_transaction(&tx).await?;
    if !broadcast.result {
        let message = if broadcast.message.is_empty() {
            "unknown".to_string()
        } else {
            broadcast.message
        };
        return Err(TronError::BroadcastRejected { message });
    }
    info!("Broadcast Tron transaction {}", txid);

    wait_for_transaction(rpc, &txid, settings).await?;
    Ok(txid)
}

/// Polls execution info for `txid` until it is terminal or the budget runs out.
pub async fn wait_for_transaction(
    rpc: &dyn TronRpc,
    txid: &str,
    settings: &ConfirmSettings,
) -> Result<(), TronError> {
    for attempt in 1..=settings.poll_times {
        match rpc.get_transaction_info_by_id(txid).await? {
            Some(info) if info.is_failed() => {
                return Err(TronError::ExecutionFailed {
                    txid: txid.to_string(),
                    message: describe_failure(&info),
                });
            }
            Some(info) => {
                info!(
                    "Tron transaction {} confirmed in block {}",
                    txid, info.block_number
                );
                return Ok(());
            }
            None => {
                debug!(
                    "Tron transaction {} pending (poll {}/{})",
                    txid, attempt, settings.poll_times
                );
            }
        }
        if attempt < settings.poll_times {
            tokio::time::sleep(settings.poll_interval).await;
        }
    }

    Err(TronError::ConfirmationTimeout {
        txid: txid.to_string(),
        attempts: settings.poll_times,
    })
}
