//! Pawn move generation
//!
//! Handles pawn-specific move generation including:
//! - Single and double forward pushes
//! - Diagonal captures
//! - En passant
//! - Promotion (one move per promotion piece)
//!
//! ## Pawn Movement Rules
//!
//! - **Forward push**: Pawns move one square forward (toward opponent)
//! - **Double push**: From the starting rank (rank 2 for white, rank 7 for
//!   black) pawns can move two squares forward if both squares are empty
//! - **Captures**: Pawns capture diagonally forward (one square)
//! - **En passant**: Right after an opponent pawn double-pushes past, it can be
//!   captured as if it had moved one square; the board's en-passant target
//!   marks the square it skipped
//! - **Promotion**: On reaching the last rank, pawns promote to
//!   queen/rook/bishop/knight

use crate::board::Board;
use crate::types::*;

/// Generate pawn moves from a given square
///
/// # Examples
///
/// ```rust,ignore
/// let mut moves = Vec::new();
/// generate_pawn_moves(&board, Square::parse("e2")?, Color::White, &mut moves);
/// // Moves now contains e2-e3, e2-e4, and any diagonal captures
/// ```
pub fn generate_pawn_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    let dir = color.pawn_direction();

    if let Some(one) = from.offset(0, dir) {
        if board.is_empty(one) {
            push_pawn_move(moves, from, one, color, MoveFlags::QUIET);

            if from.rank() == color.pawn_start_rank() {
                if let Some(two) = from.offset(0, 2 * dir) {
                    if board.is_empty(two) {
                        moves.push(Move::new(from, two));
                    }
                }
            }
        }
    }

    for df in [-1i8, 1] {
        let Some(to) = from.offset(df, dir) else {
            continue;
        };
        match board.piece_at(to) {
            Some(p) if p.color != color => {
                push_pawn_move(moves, from, to, color, MoveFlags::CAPTURE);
            }
            None if board.en_passant() == Some(to) => {
                moves.push(Move::new(from, to).with_flags(MoveFlags::EN_PASSANT));
            }
            _ => {}
        }
    }
}

/// Push a pawn move, expanding to all four promotions on the last rank
fn push_pawn_move(moves: &mut Vec<Move>, from: Square, to: Square, color: Color, flags: MoveFlags) {
    if to.rank() == color.promotion_rank() {
        for kind in PieceKind::PROMOTIONS {
            moves.push(Move::new(from, to).with_promotion(kind).with_flags(flags));
        }
    } else {
        moves.push(Move::new(from, to).with_flags(flags));
    }
}
