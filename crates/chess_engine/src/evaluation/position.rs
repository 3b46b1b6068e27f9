//! Display evaluation
//!
//! A coarse integer score for status lines: material, a small bonus for
//! occupying the centre, and a mobility term. It is not used to pick moves.

use super::material::evaluate_material;
use crate::board::Board;
use crate::move_gen::legal_moves;
use crate::types::*;

/// Bonus for a piece on d4/e4/d5/e5
const CENTER_BONUS: i32 = 30;
/// Bonus for a piece on the ring around the centre
const EXTENDED_CENTER_BONUS: i32 = 10;
/// Centipawns per legal move of mobility advantage
const MOBILITY_WEIGHT: i32 = 5;

fn square_bonus(square: Square) -> i32 {
    let (file, rank) = (square.file(), square.rank());
    if (3..=4).contains(&file) && (3..=4).contains(&rank) {
        CENTER_BONUS
    } else if (2..=5).contains(&file) && (2..=5).contains(&rank) {
        EXTENDED_CENTER_BONUS
    } else {
        0
    }
}

/// Score in centipawns from White's point of view
pub fn evaluate_position(board: &Board) -> i32 {
    let placement: i32 = board
        .pieces()
        .filter(|(_, p)| p.kind != PieceKind::King)
        .map(|(sq, p)| match p.color {
            Color::White => square_bonus(sq),
            Color::Black => -square_bonus(sq),
        })
        .sum();

    let own = legal_moves(board).len() as i32;
    let mobility = match board.side_to_move() {
        Color::White => own * MOBILITY_WEIGHT,
        Color::Black => -own * MOBILITY_WEIGHT,
    };

    evaluate_material(board) + placement + mobility
}
