//! Attack detection and square checking
//!
//! Provides functions to check if squares are under attack and if kings are in check.
//! This module is critical for move legality validation and check detection.
//!
//! ## Algorithm
//!
//! Instead of generating every opponent move, we look outward from the target
//! square: a square is attacked by a knight if a knight of the attacking colour
//! sits a knight's jump away, by a rook or queen if the first piece met along
//! an orthogonal ray is one, and so on. This is at most 8 rays plus 18 fixed
//! square lookups per query.

use crate::board::Board;
use crate::constants::*;
use crate::types::*;

/// Check if a square is under attack by pieces of the specified color
///
/// Used for:
/// - Check detection (is the king attacked?)
/// - Move legality (does this move leave the king in check?)
/// - Castling (may the king pass through this square?)
///
/// # Examples
///
/// ```rust,ignore
/// // Is e4 attacked by Black?
/// let attacked = is_square_attacked(&board, Square::parse("e4")?, Color::Black);
/// ```
pub fn is_square_attacked(board: &Board, square: Square, by_color: Color) -> bool {
    attacked_by_pawn(board, square, by_color)
        || attacked_by_leaper(board, square, by_color, &KNIGHT_DIRS, PieceKind::Knight)
        || attacked_by_leaper(board, square, by_color, &KING_DIRS, PieceKind::King)
        || attacked_along_rays(board, square, by_color, &ROOK_DIRS, PieceKind::Rook)
        || attacked_along_rays(board, square, by_color, &BISHOP_DIRS, PieceKind::Bishop)
}

/// Pawns attack diagonally forward, so an attacking pawn sits diagonally
/// *behind* the target from its own point of view
fn attacked_by_pawn(board: &Board, square: Square, by_color: Color) -> bool {
    let back = -by_color.pawn_direction();
    [-1i8, 1].iter().any(|&df| {
        square
            .offset(df, back)
            .and_then(|from| board.piece_at(from))
            .map(|p| p.color == by_color && p.kind == PieceKind::Pawn)
            .unwrap_or(false)
    })
}

fn attacked_by_leaper(
    board: &Board,
    square: Square,
    by_color: Color,
    dirs: &[(i8, i8)],
    kind: PieceKind,
) -> bool {
    dirs.iter().any(|&(df, dr)| {
        square
            .offset(df, dr)
            .and_then(|from| board.piece_at(from))
            .map(|p| p.color == by_color && p.kind == kind)
            .unwrap_or(false)
    })
}

/// Walk each ray until the first piece; queens count for both ray sets
fn attacked_along_rays(
    board: &Board,
    square: Square,
    by_color: Color,
    dirs: &[(i8, i8)],
    kind: PieceKind,
) -> bool {
    for &(df, dr) in dirs {
        let mut current = square;
        while let Some(next) = current.offset(df, dr) {
            if let Some(p) = board.piece_at(next) {
                if p.color == by_color && (p.kind == kind || p.kind == PieceKind::Queen) {
                    return true;
                }
                break;
            }
            current = next;
        }
    }
    false
}

/// Check if the king of a given color is in check
///
/// A position with no king of that colour is never "in check"; such boards
/// only arise after a game has ended.
pub fn is_in_check(board: &Board, color: Color) -> bool {
    match board.king_square(color) {
        Some(king) => is_square_attacked(board, king, color.opponent()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::parse(name).unwrap()
    }

    #[test]
    fn test_start_position_attacks() {
        let board = Board::start_position();
        // Third rank is covered by White pawns and pieces, sixth by Black
        assert!(is_square_attacked(&board, sq("e3"), Color::White));
        assert!(is_square_attacked(&board, sq("f6"), Color::Black));
        assert!(!is_square_attacked(&board, sq("e4"), Color::White));
        assert!(!is_in_check(&board, Color::White));
    }

    #[test]
    fn test_rook_attack_blocked() {
        let board = Board::from_fen("4k3/8/8/8/4p3/8/8/4RK2 w - - 0 1").unwrap();
        assert!(is_square_attacked(&board, sq("e4"), Color::White));
        assert!(!is_square_attacked(&board, sq("e8"), Color::White));
    }

    #[test]
    fn test_pawn_attack_direction() {
        let board = Board::from_fen("4k3/8/8/3p4/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(is_square_attacked(&board, sq("e4"), Color::Black));
        assert!(is_square_attacked(&board, sq("c4"), Color::Black));
        assert!(!is_square_attacked(&board, sq("e6"), Color::Black));
    }

    #[test]
    fn test_queen_gives_check_on_diagonal() {
        let board = Board::from_fen("4k3/8/8/8/Q7/8/8/4K3 b - - 0 1").unwrap();
        assert!(is_in_check(&board, Color::Black));
    }
}
