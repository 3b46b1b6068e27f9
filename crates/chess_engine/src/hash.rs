//! Position identity for repetition detection
//!
//! Two positions are "the same" for the threefold rule when they have the
//! same piece placement, the same side to move, the same castling rights and
//! the same en-passant *possibility*. A board whose en-passant target cannot
//! actually be used by any legal capture is keyed as if it had none, so a
//! double pawn push alone never makes a position look new.

use crate::board::Board;
use crate::move_gen::legal_moves;
use crate::types::*;

/// Everything that makes two positions identical under FIDE repetition rules
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    placement: [Option<Piece>; 64],
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
}

/// Compute the repetition key of a board
pub fn position_key(board: &Board) -> PositionKey {
    let en_passant = board.en_passant().filter(|_| {
        legal_moves(board).iter().any(|mv| mv.flags.en_passant)
    });
    PositionKey {
        placement: *board.placement(),
        side_to_move: board.side_to_move(),
        castling: board.castling_rights(),
        en_passant,
    }
}
