//! Public API for the chess engine
//!
//! ## Module Organization
//!
//! - `game` - Game lifecycle ([`GameState`], submit/resign)
//! - `moves` - Move execution and validation (apply, parse_uci)
//! - `state` - Terminal condition queries
//! - `record` - Persisted form of a game and its replay check

mod game;
mod moves;
mod record;
mod state;

pub use game::GameState;
pub use moves::{apply, parse_uci, resolve};
pub use record::{deserialize, serialize, GameRecord};
pub use state::{is_insufficient_material, terminal_status};
