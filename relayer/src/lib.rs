//! Tron Relayer
//!
//! Submits batches of calls to the Tron-side bridge controller while keeping the hub's copy
//! of the controller's event chain in lock-step. Every write is a single `multicall` whose
//! last call asserts the event-chain tip the batch is predicted to produce:
//!
//! - `event_chain`: the tip fold the controller applies per emitted event
//! - `calls`: typed controller calls and their ABI encoding
//! - `planner`: prediction of the events a batch emits against current state
//! - `controller`: the checkpointed multicall protocol and read accessors
//! - `config`: TOML configuration

pub mod calls;
pub mod config;
pub mod controller;
pub mod error;
pub mod event_chain;
pub mod planner;

pub use calls::ControllerCall;
pub use controller::{is_tip_mismatch, ControllerClient, SendSettings, CHECKPOINT_ATTEMPTS};
pub use error::RelayerError;
pub use event_chain::{fold_events, fold_tip, PlannedEvent, Tip};
pub use planner::{ContractReader, ControllerEventPlanner, EventPlanner, RpcContractReader};
