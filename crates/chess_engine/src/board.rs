//! Board representation
//!
//! [`Board`] is the full position: piece placement plus side to move, castling
//! rights, en-passant target and the two move counters. It is a plain value
//! (`Clone`, `Eq`, `Hash`); applying a move produces a new board rather than
//! mutating in place.
//!
//! Boards are built from [`Board::start_position`] or from FEN, and rendered
//! back to FEN for persistence and to an ASCII diagram for display.

use crate::error::{ChessEngineError, ChessEngineResult};
use crate::types::*;
use std::fmt;

/// A complete chess position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    squares: [Option<Piece>; 64],
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Default for Board {
    fn default() -> Self {
        Board::start_position()
    }
}

impl Board {
    /// Standard initial position
    pub fn start_position() -> Board {
        let mut squares = [None; 64];
        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for (file, kind) in back.iter().enumerate() {
            squares[file] = Some(Piece::new(*kind, Color::White));
            squares[8 + file] = Some(Piece::new(PieceKind::Pawn, Color::White));
            squares[48 + file] = Some(Piece::new(PieceKind::Pawn, Color::Black));
            squares[56 + file] = Some(Piece::new(*kind, Color::Black));
        }
        Board {
            squares,
            side_to_move: Color::White,
            castling: CastlingRights::all(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    #[inline]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    #[inline]
    pub fn is_empty(&self, square: Square) -> bool {
        self.squares[square.index()].is_none()
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Raw placement array, indexed by [`Square::index`]
    #[inline]
    pub fn placement(&self) -> &[Option<Piece>; 64] {
        &self.squares
    }

    /// Every occupied square with its piece, in index order
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    /// Square of `color`'s king, `None` only on a malformed position
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.kind == PieceKind::King && p.color == color)
            .map(|(sq, _)| sq)
    }

    /// Apply a move without checking legality
    ///
    /// The move must come from the pseudo-legal generator for this board; its
    /// flags drive the en-passant and castling side effects.
    pub(crate) fn play_unchecked(&self, mv: &Move) -> Board {
        let mut next = self.clone();
        let Some(mut piece) = self.piece_at(mv.from) else {
            return next;
        };
        let mover = piece.color;

        if mv.flags.en_passant {
            if let Some(victim) = Square::new(mv.to.file(), mv.from.rank()) {
                next.squares[victim.index()] = None;
            }
        }

        if let Some(kind) = mv.promotion {
            piece = Piece::new(kind, mover);
        }
        next.squares[mv.from.index()] = None;
        next.squares[mv.to.index()] = Some(piece);

        if let Some(side) = mv.flags.castle_side() {
            let rank = mover.back_rank();
            let (rook_from, rook_to) = match side {
                CastleSide::Kingside => (7, 5),
                CastleSide::Queenside => (0, 3),
            };
            if let (Some(from), Some(to)) = (Square::new(rook_from, rank), Square::new(rook_to, rank)) {
                next.squares[to.index()] = next.squares[from.index()].take();
            }
        }

        if piece.kind == PieceKind::King {
            next.castling.clear_color(mover);
        }
        next.castling.clear_for_corner(mv.from);
        next.castling.clear_for_corner(mv.to);

        let double_push = piece.kind == PieceKind::Pawn
            && (mv.to.rank() as i8 - mv.from.rank() as i8).abs() == 2;
        next.en_passant = if double_push {
            mv.from.offset(0, mover.pawn_direction())
        } else {
            None
        };

        let pawn_move = self
            .piece_at(mv.from)
            .map(|p| p.kind == PieceKind::Pawn)
            .unwrap_or(false);
        if pawn_move || mv.flags.capture {
            next.halfmove_clock = 0;
        } else {
            next.halfmove_clock = next.halfmove_clock.saturating_add(1);
        }

        if mover == Color::Black {
            next.fullmove_number = next.fullmove_number.saturating_add(1);
        }
        next.side_to_move = mover.opponent();
        next
    }

    /// Resolve coordinate notation against this position
    pub fn parse_uci(&self, text: &str) -> ChessEngineResult<Move> {
        crate::api::parse_uci(self, text)
    }

    /// Parse a Forsyth-Edwards Notation string
    ///
    /// The halfmove and fullmove fields may be omitted and default to `0 1`.
    /// A position must hold exactly one king of each colour and no pawns on
    /// the first or last rank.
    pub fn from_fen(fen: &str) -> ChessEngineResult<Board> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 4 && fields.len() != 6 {
            return Err(ChessEngineError::invalid_fen(fen, "expected 4 or 6 fields"));
        }

        let mut squares = [None; 64];
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(ChessEngineError::invalid_fen(fen, "expected 8 ranks"));
        }
        for (i, row) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in row.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file = file
                        .checked_add(skip as u8)
                        .filter(|f| *f <= 8)
                        .ok_or_else(|| ChessEngineError::invalid_fen(fen, "rank overflows 8 files"))?;
                    continue;
                }
                let piece = Piece::from_symbol(c)
                    .ok_or_else(|| ChessEngineError::invalid_fen(fen, format!("bad piece {c:?}")))?;
                let square = Square::new(file, rank)
                    .ok_or_else(|| ChessEngineError::invalid_fen(fen, "rank overflows 8 files"))?;
                squares[square.index()] = Some(piece);
                file += 1;
            }
            if file != 8 {
                return Err(ChessEngineError::invalid_fen(fen, "rank does not sum to 8 files"));
            }
        }

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(ChessEngineError::invalid_fen(fen, format!("bad side {other:?}")))
            }
        };
        let castling = CastlingRights::from_fen(fields[2])
            .ok_or_else(|| ChessEngineError::invalid_fen(fen, "bad castling field"))?;
        let en_passant = match fields[3] {
            "-" => None,
            sq => Some(
                Square::parse(sq)
                    .map_err(|_| ChessEngineError::invalid_fen(fen, "bad en-passant square"))?,
            ),
        };
        let (halfmove_clock, fullmove_number) = if fields.len() == 6 {
            let half = fields[4]
                .parse::<u32>()
                .map_err(|_| ChessEngineError::invalid_fen(fen, "bad halfmove clock"))?;
            let full = fields[5]
                .parse::<u32>()
                .map_err(|_| ChessEngineError::invalid_fen(fen, "bad fullmove number"))?;
            if half == u32::MAX || full == u32::MAX {
                return Err(ChessEngineError::invalid_fen(fen, "move counter out of range"));
            }
            (half, full.max(1))
        } else {
            (0, 1)
        };

        let board = Board {
            squares,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        };
        board.validate().map_err(|reason| ChessEngineError::invalid_fen(fen, reason))?;
        Ok(board)
    }

    fn validate(&self) -> Result<(), &'static str> {
        for color in Color::ALL {
            let kings = self
                .pieces()
                .filter(|(_, p)| p.kind == PieceKind::King && p.color == color)
                .count();
            if kings != 1 {
                return Err("each side needs exactly one king");
            }
        }
        let pawn_on_edge = self
            .pieces()
            .any(|(sq, p)| p.kind == PieceKind::Pawn && (sq.rank() == 0 || sq.rank() == 7));
        if pawn_on_edge {
            return Err("pawn on first or last rank");
        }
        Ok(())
    }

    /// Render as a Forsyth-Edwards Notation string
    pub fn to_fen(&self) -> String {
        let mut placement = String::with_capacity(72);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                let piece = Square::new(file, rank).and_then(|sq| self.piece_at(sq));
                match piece {
                    Some(p) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(p.symbol());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if rank > 0 {
                placement.push('/');
            }
        }
        let side = match self.side_to_move {
            Color::White => "w",
            Color::Black => "b",
        };
        let ep = self
            .en_passant
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} {} {} {} {} {}",
            placement,
            side,
            self.castling.to_fen(),
            ep,
            self.halfmove_clock,
            self.fullmove_number
        )
    }
}

impl fmt::Display for Board {
    /// ASCII diagram with coordinates, White at the bottom
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, " {} ", rank + 1)?;
            for file in 0..8u8 {
                let symbol = Square::new(file, rank)
                    .and_then(|sq| self.piece_at(sq))
                    .map(Piece::symbol)
                    .unwrap_or('.');
                write!(f, "{symbol} ")?;
            }
            writeln!(f, "{}", rank + 1)?;
        }
        write!(f, "   a b c d e f g h")
    }
}
