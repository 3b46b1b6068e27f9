//! Material evaluation
//!
//! Evaluates the material balance of a position by counting piece values.

use crate::board::Board;
use crate::constants::figure_value;
use crate::types::*;

/// Material balance in centipawns, positive when White is ahead
pub fn evaluate_material(board: &Board) -> i32 {
    board
        .pieces()
        .map(|(_, piece)| {
            let value = figure_value(piece.kind);
            match piece.color {
                Color::White => value,
                Color::Black => -value,
            }
        })
        .sum()
}
