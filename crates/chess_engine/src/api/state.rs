//! Game state queries
//!
//! Functions for deciding whether a position ends the game.
//!
//! ## Termination Order
//!
//! When several conditions hold at once the first match wins:
//! 1. Checkmate (side to move has no legal move and is in check)
//! 2. Stalemate (no legal move, not in check)
//! 3. Insufficient material
//! 4. Fifty-move rule (halfmove clock at 100 or more)
//! 5. Threefold repetition

use crate::board::Board;
use crate::constants::{FIFTY_MOVE_PLIES, REPETITION_LIMIT};
use crate::hash::{position_key, PositionKey};
use crate::move_gen::{has_legal_move, is_in_check};
use crate::types::*;

/// Result of the game at `board`
///
/// `positions` is the repetition history: the [`PositionKey`] of every
/// position reached in the game so far, oldest first, *including* the
/// current one. Pass an empty slice to skip repetition detection.
///
/// # Examples
///
/// ```rust,ignore
/// let board = Board::start_position();
/// assert_eq!(terminal_status(&board, &[position_key(&board)]), GameResult::InProgress);
/// ```
pub fn terminal_status(board: &Board, positions: &[PositionKey]) -> GameResult {
    let color = board.side_to_move();
    if !has_legal_move(board) {
        return if is_in_check(board, color) {
            GameResult::win_for(color.opponent())
        } else {
            GameResult::DrawStalemate
        };
    }
    if is_insufficient_material(board) {
        return GameResult::DrawInsufficientMaterial;
    }
    if board.halfmove_clock() >= FIFTY_MOVE_PLIES {
        return GameResult::DrawFiftyMove;
    }
    if !positions.is_empty() {
        let current = position_key(board);
        let seen = positions.iter().filter(|key| **key == current).count();
        if seen >= REPETITION_LIMIT {
            return GameResult::DrawThreefold;
        }
    }
    GameResult::InProgress
}

/// Neither side can possibly deliver mate
///
/// Dead positions recognised:
/// - king versus king
/// - king and a single knight or bishop versus king
/// - kings and bishops only, with every bishop on the same square colour
///   (covers king and bishop versus king and bishop on like squares)
///
/// Any pawn, rook or queen on the board means material is sufficient.
pub fn is_insufficient_material(board: &Board) -> bool {
    let mut minors = Vec::new();
    for (square, piece) in board.pieces() {
        match piece.kind {
            PieceKind::King => {}
            PieceKind::Pawn | PieceKind::Rook | PieceKind::Queen => return false,
            PieceKind::Knight | PieceKind::Bishop => minors.push((square, piece.kind)),
        }
    }

    if minors.len() <= 1 {
        return true;
    }
    let all_bishops = minors.iter().all(|(_, kind)| *kind == PieceKind::Bishop);
    if !all_bishops {
        return false;
    }
    let first_light = minors[0].0.is_light();
    minors.iter().all(|(sq, _)| sq.is_light() == first_light)
}
