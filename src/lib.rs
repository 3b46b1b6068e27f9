//! # chessfleet
//!
//! Runs many chess games on independently executing nodes and keeps a
//! central, read-only view of all of them consistent.
//!
//! ## Components
//!
//! - [`store`] - one versioned, atomically replaced record per game
//! - [`agent`] / [`policy`] - the per-node process that plays and autosaves
//! - [`compute`] - the node host contract and an in-process host
//! - [`fleet`] - provisioning and lifecycle of game nodes
//! - [`sync`] - per-game poll tasks reconciling records by version
//! - [`registry`] - concurrently readable snapshots, single writer
//! - [`status`] - text rendering for the read side
//!
//! The rules themselves live in the `chess_engine` crate.

pub mod agent;
pub mod compute;
pub mod core;
pub mod fleet;
pub mod policy;
pub mod registry;
pub mod retry;
pub mod status;
pub mod store;
pub mod sync;

pub use crate::core::{FleetConfig, FleetError, FleetResult};
pub use compute::{ComputeProvider, LocalCompute, NodeHandle};
pub use fleet::{FleetEntry, FleetManager, NodeState, RetireHook};
pub use registry::{RegistryReader, Snapshot, SnapshotRegistry};
pub use store::GameStore;
pub use sync::Synchronizer;
