//! Sliding piece move generation
//!
//! Common functionality for sliding pieces (bishops, rooks, queens).
//! These pieces can move multiple squares in a direction until blocked.
//!
//! ## Algorithm
//!
//! For each direction we ray-cast from the origin:
//! 1. Empty square: valid move, keep going
//! 2. Opponent piece: valid capture, stop this ray
//! 3. Own piece or board edge: stop this ray
//!
//! ## Performance
//!
//! - **Time complexity**: O(n) in the number of reachable squares
//! - **Typical moves per square**: 14 for rooks, 7-13 for bishops, up to 27 for queens

use crate::board::Board;
use crate::types::*;

/// Generate moves for a sliding piece along the given rays
///
/// # Arguments
///
/// * `board` - The current position
/// * `from` - Origin square
/// * `color` - Colour of the moving piece
/// * `dirs` - Ray directions as `(file_delta, rank_delta)`
/// * `moves` - Output vector to append valid moves to
///
/// # Examples
///
/// ```rust,ignore
/// // Generate rook moves from a1
/// let mut moves = Vec::new();
/// generate_sliding_moves(&board, Square::A1, Color::White, &ROOK_DIRS, &mut moves);
/// ```
pub fn generate_sliding_moves(
    board: &Board,
    from: Square,
    color: Color,
    dirs: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in dirs {
        let mut current = from;
        while let Some(to) = current.offset(df, dr) {
            match board.piece_at(to) {
                None => moves.push(Move::new(from, to)),
                Some(p) if p.color != color => {
                    moves.push(Move::new(from, to).with_flags(MoveFlags::CAPTURE));
                    break;
                }
                Some(_) => break,
            }
            current = to;
        }
    }
}
