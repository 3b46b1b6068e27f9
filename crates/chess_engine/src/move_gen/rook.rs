//! Rook move generation
//!
//! Rooks are sliding pieces that move horizontally and vertically until
//! blocked by another piece or the board edge.

use super::sliding;
use crate::board::Board;
use crate::constants::ROOK_DIRS;
use crate::types::*;

/// Generate rook moves from a given square
pub fn generate_rook_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    sliding::generate_sliding_moves(board, from, color, &ROOK_DIRS, moves);
}
