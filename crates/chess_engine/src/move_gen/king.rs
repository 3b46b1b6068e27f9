//! King move generation
//!
//! Handles king-specific move generation: one step in any direction, plus
//! castling.
//!
//! ## Castling
//!
//! Castling is generated here rather than left to the legality filter because
//! its conditions go beyond "does the king end up in check":
//! - The matching castling right is still set
//! - The rook is on its corner square
//! - Every square between king and rook is empty
//! - The king's start square, the square it passes through and its
//!   destination are all unattacked

use super::attack::is_square_attacked;
use crate::board::Board;
use crate::constants::KING_DIRS;
use crate::types::*;

/// Generate king moves from a given square, castling included
pub fn generate_king_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    for &(df, dr) in &KING_DIRS {
        let Some(to) = from.offset(df, dr) else {
            continue;
        };
        match board.piece_at(to) {
            None => moves.push(Move::new(from, to)),
            Some(p) if p.color != color => {
                moves.push(Move::new(from, to).with_flags(MoveFlags::CAPTURE))
            }
            Some(_) => {}
        }
    }

    generate_castling_moves(board, from, color, moves);
}

fn generate_castling_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    let rank = color.back_rank();
    if Square::new(4, rank) != Some(from) {
        return;
    }
    let enemy = color.opponent();
    let rights = board.castling_rights();

    for side in [CastleSide::Kingside, CastleSide::Queenside] {
        if !rights.has(color, side) {
            continue;
        }
        // (rook file, files that must be empty, files the king crosses, king destination)
        let (rook_file, empty_files, king_path, dest_file): (u8, &[u8], [u8; 3], u8) = match side {
            CastleSide::Kingside => (7, &[5, 6], [4, 5, 6], 6),
            CastleSide::Queenside => (0, &[1, 2, 3], [4, 3, 2], 2),
        };

        let rook_home = Square::new(rook_file, rank).and_then(|sq| board.piece_at(sq));
        if rook_home != Some(Piece::new(PieceKind::Rook, color)) {
            continue;
        }
        let path_clear = empty_files
            .iter()
            .filter_map(|&f| Square::new(f, rank))
            .all(|sq| board.is_empty(sq));
        if !path_clear {
            continue;
        }
        let path_safe = king_path
            .iter()
            .filter_map(|&f| Square::new(f, rank))
            .all(|sq| !is_square_attacked(board, sq, enemy));
        if !path_safe {
            continue;
        }
        if let Some(to) = Square::new(dest_file, rank) {
            moves.push(Move::new(from, to).with_flags(MoveFlags::castle(side)));
        }
    }
}
