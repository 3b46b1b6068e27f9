//! Move execution and validation
//!
//! Functions for applying moves and resolving coordinate notation against a
//! position.

use crate::board::Board;
use crate::error::{ChessEngineError, ChessEngineResult};
use crate::move_gen::legal_moves;
use crate::types::*;

/// Apply a move, returning the resulting board
///
/// The move is matched against [`legal_moves`] by origin, destination and
/// promotion, and the generated move (with its capture/en-passant/castling
/// flags) is what gets played. The input board is not modified.
///
/// # Errors
///
/// [`ChessEngineError::IllegalMove`] if no legal move has those coordinates.
///
/// # Examples
///
/// ```rust,ignore
/// let board = Board::start_position();
/// let e4 = Move::new(Square::parse("e2")?, Square::parse("e4")?);
/// let next = apply(&board, &e4)?;
/// assert_eq!(next.side_to_move(), Color::Black);
/// ```
pub fn apply(board: &Board, mv: &Move) -> ChessEngineResult<Board> {
    let legal = resolve(board, mv)?;
    Ok(board.play_unchecked(&legal))
}

/// Find the legal move with the same coordinates as `mv`
pub fn resolve(board: &Board, mv: &Move) -> ChessEngineResult<Move> {
    legal_moves(board)
        .into_iter()
        .find(|candidate| candidate.same_coordinates(mv))
        .ok_or_else(|| ChessEngineError::illegal(mv.to_uci(), "not a legal move in this position"))
}

/// Parse coordinate notation (`e2e4`, `e7e8q`) into a legal move
///
/// # Errors
///
/// - [`ChessEngineError::InvalidNotation`] if the text is malformed
/// - [`ChessEngineError::IllegalMove`] if it is well-formed but not legal here
pub fn parse_uci(board: &Board, text: &str) -> ChessEngineResult<Move> {
    let text = text.trim();
    let invalid = || ChessEngineError::InvalidNotation {
        text: text.to_string(),
    };
    if !(4..=5).contains(&text.len()) || !text.is_ascii() {
        return Err(invalid());
    }
    let from = Square::parse(&text[0..2]).map_err(|_| invalid())?;
    let to = Square::parse(&text[2..4]).map_err(|_| invalid())?;
    let mut mv = Move::new(from, to);
    if let Some(c) = text.chars().nth(4) {
        match PieceKind::from_char(c) {
            Some(kind) if PieceKind::PROMOTIONS.contains(&kind) => mv = mv.with_promotion(kind),
            _ => return Err(invalid()),
        }
    }
    resolve(board, &mv)
}
