//! # Chess Engine Constants - Piece Values & Movement Vectors
//!
//! Centralizes the fixed numbers the rules engine needs: material values in
//! centipawns, the movement deltas used by move generation, and the standard
//! starting position.
//!
//! ## Centipawn Valuation
//!
//! Material is counted in **centipawns** (1/100th of a pawn) so that every
//! evaluation stays in integer arithmetic:
//!
//! - **Pawn**: 100
//! - **Knight**: 300
//! - **Bishop**: 300
//! - **Rook**: 500
//! - **Queen**: 900
//! - **King**: 0 (never traded, so never counted)
//!
//! ## Direction Vectors
//!
//! Movement is expressed as `(file_delta, rank_delta)` pairs rather than flat
//! index offsets. A flat offset of `+1` from the h-file silently wraps onto the
//! a-file of the next rank; a `(1, 0)` delta simply falls off the board and is
//! rejected by [`crate::types::Square::offset`].

use crate::types::PieceKind;

/// Centipawn value of a pawn
pub const PAWN_VALUE: i32 = 100;
/// Centipawn value of a knight
pub const KNIGHT_VALUE: i32 = 300;
/// Centipawn value of a bishop
pub const BISHOP_VALUE: i32 = 300;
/// Centipawn value of a rook
pub const ROOK_VALUE: i32 = 500;
/// Centipawn value of a queen
pub const QUEEN_VALUE: i32 = 900;

/// Material value of a piece kind in centipawns
pub const fn figure_value(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Pawn => PAWN_VALUE,
        PieceKind::Knight => KNIGHT_VALUE,
        PieceKind::Bishop => BISHOP_VALUE,
        PieceKind::Rook => ROOK_VALUE,
        PieceKind::Queen => QUEEN_VALUE,
        PieceKind::King => 0,
    }
}

/// Orthogonal rays: north, south, east, west
pub const ROOK_DIRS: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Diagonal rays: north-east, south-east, south-west, north-west
pub const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// The eight single-step king moves
pub const KING_DIRS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// The eight L-shaped knight jumps (2+1 and 1+2)
pub const KNIGHT_DIRS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// Standard initial position in Forsyth-Edwards Notation
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Halfmove clock value at which the fifty-move rule draws the game
pub const FIFTY_MOVE_PLIES: u32 = 100;

/// Number of occurrences of one position that draws by repetition
pub const REPETITION_LIMIT: usize = 3;
