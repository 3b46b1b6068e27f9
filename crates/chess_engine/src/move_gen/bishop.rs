//! Bishop move generation
//!
//! Bishops are sliding pieces that move diagonally until blocked by another
//! piece or the board edge. A bishop never leaves its starting square colour.

use super::sliding;
use crate::board::Board;
use crate::constants::BISHOP_DIRS;
use crate::types::*;

/// Generate bishop moves from a given square
pub fn generate_bishop_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    sliding::generate_sliding_moves(board, from, color, &BISHOP_DIRS, moves);
}
