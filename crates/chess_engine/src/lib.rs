//! # Chess Engine - Rules and Game State
//!
//! ## Overview
//!
//! A pure, synchronous implementation of the rules of chess: board model,
//! legal move generation, check and termination detection, and a per-game
//! state machine with a persisted record form. Nothing in this crate does
//! I/O or blocks; every operation is a plain function of its inputs.
//!
//! ## Module Organization
//!
//! ### Core Data
//! - **[`types`]** - Colours, pieces, squares, moves, results
//! - **[`constants`]** - Piece values, direction tables, rule limits
//! - **[`board`]** - Position representation, FEN and ASCII rendering
//!
//! ### Rules
//! - **[`move_gen`]** - Pseudo-legal generation per piece kind plus the
//!   legality filter, attack detection
//! - **[`hash`]** - Repetition keys
//! - **[`evaluation`]** - Integer material/position score for display
//!
//! ### Game
//! - **[`api`]** - `apply`, `terminal_status`, [`GameState`], [`GameRecord`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chess_engine::{GameState, GameResult};
//!
//! let mut game = GameState::new("demo");
//! for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
//!     game.submit_uci(mv)?;
//! }
//! assert_eq!(game.result(), GameResult::BlackWins);
//! ```
//!
//! Numeric semantics: every counter is an unsigned integer and scores are
//! `i32` centipawns. There is no floating point anywhere in the crate.

pub mod api;
pub mod board;
pub mod constants;
pub mod error;
pub mod evaluation;
pub mod hash;
pub mod move_gen;
pub mod types;

pub use api::{
    apply, deserialize, is_insufficient_material, parse_uci, serialize, terminal_status,
    GameRecord, GameState,
};
pub use board::Board;
pub use error::{ChessEngineError, ChessEngineResult};
pub use evaluation::{evaluate_material, evaluate_position};
pub use hash::{position_key, PositionKey};
pub use move_gen::{is_in_check, legal_moves};
pub use types::*;
