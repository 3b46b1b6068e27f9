//! Error types for the fleet layer
//!
//! One enum per layer, mirroring how failures are handled:
//! - [`StoreError`] - local persistence integrity (not found, corrupt, I/O)
//! - [`ComputeError`] - remote calls, split into retryable and permanent
//! - [`AgentError`] - a game agent stopped on a store or rules failure
//! - [`FleetError`] - provisioning, lifecycle and health-check failures
//! - [`SyncError`] - poll task bookkeeping
//!
//! Rules errors ([`ChessEngineError`]) are never retried. Compute errors are
//! retried at the layer that issued the call and only surface once the retry
//! budget is spent.

use chess_engine::ChessEngineError;
use std::time::Duration;
use thiserror::Error;

use crate::fleet::NodeState;

/// Errors from the local game store
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record exists for this game id
    #[error("No record for game {game_id}")]
    NotFound { game_id: String },

    /// Stored payload does not decode or fails its replay check
    #[error("Corrupt record for game {game_id}: {reason}")]
    Corrupt { game_id: String, reason: String },

    /// Game id cannot be used as a file name
    #[error("Invalid game id {0:?}")]
    InvalidGameId(String),

    /// Store file I/O error
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record encoding error
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from a compute provider call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComputeError {
    /// Network blip, node busy or paused; worth retrying
    #[error("Transient compute error: {0}")]
    Transient(String),

    /// Will fail the same way again
    #[error("Permanent compute error: {0}")]
    Permanent(String),

    /// Handle or remote file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Call did not finish within its deadline
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Caller cancelled while the call or its backoff was pending
    #[error("Cancelled")]
    Cancelled,
}

impl ComputeError {
    /// Transient failures and timeouts are retried; everything else is final
    pub fn is_retryable(&self) -> bool {
        matches!(self, ComputeError::Transient(_) | ComputeError::Timeout(_))
    }
}

/// Why a game agent stopped early
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent store error: {0}")]
    Store(#[from] StoreError),

    #[error("Agent rules error: {0}")]
    Rules(#[from] ChessEngineError),

    /// A store call on the blocking pool panicked or was cancelled
    #[error("Agent store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors from the fleet manager
#[derive(Error, Debug)]
pub enum FleetError {
    /// Start, deploy or readiness failed after the retry budget
    #[error("Provisioning game {game_id} failed after {attempts} attempt(s): {source}")]
    Provision {
        game_id: String,
        attempts: u32,
        #[source]
        source: ComputeError,
    },

    /// Health check failed after the retry budget
    #[error("Health check for game {game_id} failed: {source}")]
    HealthCheck {
        game_id: String,
        #[source]
        source: ComputeError,
    },

    #[error("Game {0} is not tracked")]
    UnknownGame(String),

    #[error("Game {0} is already tracked")]
    AlreadyTracked(String),

    #[error("Game {game_id} cannot go from {from} to {to}")]
    InvalidTransition {
        game_id: String,
        from: NodeState,
        to: NodeState,
    },

    /// Lifecycle call (pause/resume/stop) failed after retries
    #[error("Compute call for game {game_id} failed: {source}")]
    Compute {
        game_id: String,
        #[source]
        source: ComputeError,
    },

    #[error("Fleet I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the synchronizer
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Game {0} already has a poll task")]
    AlreadyTracked(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type ComputeResult<T> = Result<T, ComputeError>;

/// Result type alias for fleet operations
pub type FleetResult<T> = Result<T, FleetError>;
