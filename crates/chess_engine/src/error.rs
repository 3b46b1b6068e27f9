//! Error types for chess engine
//!
//! Provides custom error types for rule violations, notation parsing and
//! persisted-record integrity. None of these are retryable: every variant is
//! a deterministic consequence of the input.

use crate::types::GameResult;
use thiserror::Error;

/// Errors that can occur in the chess engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessEngineError {
    /// Move is not in the legal move list of the position, or the game is over
    #[error("Illegal move {uci}: {reason}")]
    IllegalMove { uci: String, reason: &'static str },

    /// Text is not well-formed coordinate notation
    #[error("Invalid move notation: {text:?}")]
    InvalidNotation { text: String },

    /// Square name outside a1..h8
    #[error("Invalid square: {text:?}")]
    InvalidSquare { text: String },

    /// FEN string could not be parsed into a valid board
    #[error("Invalid FEN {fen:?}: {reason}")]
    InvalidFen { fen: String, reason: String },

    /// Operation requires an in-progress game
    #[error("Game is already over ({result})")]
    GameOver { result: GameResult },

    /// A persisted record failed to decode or replay
    #[error("Corrupt game record: {reason}")]
    CorruptRecord { reason: String },
}

impl ChessEngineError {
    pub(crate) fn illegal(uci: impl Into<String>, reason: &'static str) -> Self {
        ChessEngineError::IllegalMove {
            uci: uci.into(),
            reason,
        }
    }

    pub(crate) fn invalid_fen(fen: &str, reason: impl Into<String>) -> Self {
        ChessEngineError::InvalidFen {
            fen: fen.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        ChessEngineError::CorruptRecord {
            reason: reason.into(),
        }
    }
}

/// Result type alias for chess engine operations
pub type ChessEngineResult<T> = Result<T, ChessEngineError>;
