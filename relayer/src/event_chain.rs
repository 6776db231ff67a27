//! Event chain fold
//!
//! The controller keeps a hash chain over every event it emits. For each event:
//!
//! ```text
//! tip' = sha256(tip || uint256(blockNumber) || uint256(blockTimestamp) || eventSignature || data)
//! ```
//!
//! with the integers as 32-byte big-endian words and `data` the ABI-encoded event arguments.
//! The relayer must reproduce this bit for bit; any divergence shows up only as checkpoint
//! mismatches on every attempt.

use chain_clients_tron::protocol::BlockRef;
use sha2::{Digest, Sha256};

/// Head of the event chain.
pub type Tip = [u8; 32];

/// An event predicted for a batch: topic-0 signature hash and ABI-encoded arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEvent {
    pub signature: [u8; 32],
    pub data: Vec<u8>,
}

fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Folds one event into the tip.
pub fn fold_tip(previous: &Tip, block: &BlockRef, event_signature: &[u8; 32], data: &[u8]) -> Tip {
    let mut hasher = Sha256::new();
    hasher.update(previous);
    hasher.update(u64_word(block.number));
    hasher.update(u64_word(block.timestamp));
    hasher.update(event_signature);
    hasher.update(data);
    hasher.finalize().into()
}

/// Folds events in emission order. No events leaves the tip unchanged.
pub fn fold_events(tip: Tip, block: &BlockRef, events: &[PlannedEvent]) -> Tip {
    events.iter().fold(tip, |tip, event| {
        fold_tip(&tip, block, &event.signature, &event.data)
    })
}
