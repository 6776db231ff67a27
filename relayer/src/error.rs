//! Relayer error types

use chain_clients_tron::TronError;
use thiserror::Error;

/// Errors returned by controller operations.
///
/// Everything except a tip-mismatch `Tron(ExecutionFailed)` is terminal for the current
/// operation; the checkpoint loop handles that one case internally.
#[derive(Debug, Error)]
pub enum RelayerError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("event chain checkpoint failed after {attempts} attempts (tip kept changing)")]
    EventChainCheckpointExhausted { attempts: u32 },

    #[error("event planning failed: {0:#}")]
    Planning(anyhow::Error),

    #[error("controller read failed: {0:#}")]
    Read(anyhow::Error),

    #[error(transparent)]
    Tron(#[from] TronError),
}
