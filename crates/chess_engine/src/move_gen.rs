//! Move generation
//!
//! Legal moves are produced in two phases:
//!
//! 1. **Pseudo-legal generation** per piece kind (see the submodules). These
//!    moves obey piece-movement rules but may leave the mover's own king
//!    attacked, for example by moving a pinned piece.
//! 2. **Legality filter**: each candidate is played on a copy of the board and
//!    discarded if the mover's king is attacked afterward.
//!
//! Castling is the one move whose extra conditions (no castling out of or
//! through check) are enforced during generation in [`king`].

pub mod attack;
pub mod bishop;
pub mod king;
pub mod knight;
pub mod pawn;
pub mod queen;
pub mod rook;
pub mod sliding;

pub use attack::{is_in_check, is_square_attacked};

use crate::board::Board;
use crate::types::*;

/// Every pseudo-legal move for the side to move
pub fn generate_pseudo_legal_moves(board: &Board) -> Vec<Move> {
    let color = board.side_to_move();
    let mut moves = Vec::with_capacity(48);

    for (from, piece) in board.pieces() {
        if piece.color != color {
            continue;
        }
        match piece.kind {
            PieceKind::Pawn => pawn::generate_pawn_moves(board, from, color, &mut moves),
            PieceKind::Knight => knight::generate_knight_moves(board, from, color, &mut moves),
            PieceKind::Bishop => bishop::generate_bishop_moves(board, from, color, &mut moves),
            PieceKind::Rook => rook::generate_rook_moves(board, from, color, &mut moves),
            PieceKind::Queen => queen::generate_queen_moves(board, from, color, &mut moves),
            PieceKind::King => king::generate_king_moves(board, from, color, &mut moves),
        }
    }

    moves
}

/// Every legal move for the side to move
///
/// No returned move leaves the mover's own king in check.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let color = board.side_to_move();
    generate_pseudo_legal_moves(board)
        .into_iter()
        .filter(|mv| !is_in_check(&board.play_unchecked(mv), color))
        .collect()
}

/// Whether the side to move has at least one legal move
///
/// Stops at the first legal move, so terminal checks stay cheap in the
/// common case.
pub fn has_legal_move(board: &Board) -> bool {
    let color = board.side_to_move();
    generate_pseudo_legal_moves(board)
        .iter()
        .any(|mv| !is_in_check(&board.play_unchecked(mv), color))
}
