//! Knight move generation
//!
//! Knights move in an L-shape pattern: 2 squares in one direction, then 1
//! square perpendicular (or vice versa).
//!
//! ## Knight Movement Rules
//!
//! - Knights can jump over pieces (unlike sliding pieces)
//! - 8 possible destinations from most squares (fewer near edges)
//! - Cannot move to squares occupied by own pieces
//! - Can capture opponent pieces on destination squares

use crate::board::Board;
use crate::constants::KNIGHT_DIRS;
use crate::types::*;

/// Generate knight moves from a given square
///
/// # Examples
///
/// ```rust,ignore
/// let mut moves = Vec::new();
/// generate_knight_moves(&board, Square::B1, Color::White, &mut moves);
/// // Moves now contains Na3 and Nc3
/// ```
pub fn generate_knight_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    for &(df, dr) in &KNIGHT_DIRS {
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
}
