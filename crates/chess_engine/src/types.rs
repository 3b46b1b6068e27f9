//! # Chess Engine Core Types
//!
//! The value types every other module speaks in: colours, pieces, squares,
//! castling rights, moves and game results.
//!
//! ## Square Encoding
//!
//! A [`Square`] is a flat index `0..64` laid out rank-major from White's side:
//! `a1 = 0`, `h1 = 7`, `a8 = 56`, `h8 = 63`. So `index = rank * 8 + file`, the
//! same linear layout the old `i8` board used, but wrapped in a newtype that
//! can only be built for on-board coordinates.
//!
//! ## Moves Are Board-Relative
//!
//! A [`Move`] records source, destination, optional promotion and the special
//! flags (capture, en passant, castling) that the generator discovered. The
//! flags only mean something relative to the board the move was generated
//! from; applying a move to a different board goes back through the legal
//! move list (see [`crate::api::apply`]).

use crate::error::{ChessEngineError, ChessEngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    #[inline]
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank delta of a single pawn push
    #[inline]
    pub fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    #[inline]
    pub fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    #[inline]
    pub fn pawn_start_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    #[inline]
    pub fn promotion_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("White"),
            Color::Black => f.write_str("Black"),
        }
    }
}

/// Piece kind, independent of colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// Kinds a pawn may promote to, strongest first
    pub const PROMOTIONS: [PieceKind; 4] = [
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
    ];

    /// Lowercase letter used by FEN and UCI
    pub fn to_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    pub fn from_char(c: char) -> Option<PieceKind> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }

    #[inline]
    pub fn is_slider(self) -> bool {
        matches!(self, PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen)
    }
}

/// A coloured piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Piece { kind, color }
    }

    /// FEN symbol: uppercase for White, lowercase for Black
    pub fn symbol(self) -> char {
        let c = self.kind.to_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    pub fn from_symbol(c: char) -> Option<Piece> {
        let kind = PieceKind::from_char(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece { kind, color })
    }
}

/// Board square, `a1 = 0` through `h8 = 63`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    pub const A1: Square = Square(0);
    pub const B1: Square = Square(1);
    pub const C1: Square = Square(2);
    pub const D1: Square = Square(3);
    pub const E1: Square = Square(4);
    pub const F1: Square = Square(5);
    pub const G1: Square = Square(6);
    pub const H1: Square = Square(7);
    pub const A8: Square = Square(56);
    pub const B8: Square = Square(57);
    pub const C8: Square = Square(58);
    pub const D8: Square = Square(59);
    pub const E8: Square = Square(60);
    pub const F8: Square = Square(61);
    pub const G8: Square = Square(62);
    pub const H8: Square = Square(63);

    /// Build a square from file and rank, both `0..8`
    #[inline]
    pub fn new(file: u8, rank: u8) -> Option<Square> {
        (file < 8 && rank < 8).then(|| Square(rank * 8 + file))
    }

    #[inline]
    pub fn from_index(index: usize) -> Option<Square> {
        (index < 64).then(|| Square(index as u8))
    }

    /// All 64 squares in index order
    pub fn all() -> impl Iterator<Item = Square> {
        (0..64u8).map(Square)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn file(self) -> u8 {
        self.0 % 8
    }

    #[inline]
    pub fn rank(self) -> u8 {
        self.0 / 8
    }

    /// Step by a file/rank delta, `None` when the step leaves the board
    #[inline]
    pub fn offset(self, file_delta: i8, rank_delta: i8) -> Option<Square> {
        let file = self.file() as i8 + file_delta;
        let rank = self.rank() as i8 + rank_delta;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Square((rank * 8 + file) as u8))
        } else {
            None
        }
    }

    /// Light squares are those where file and rank parity differ (h1 is light)
    #[inline]
    pub fn is_light(self) -> bool {
        (self.file() + self.rank()) % 2 == 1
    }

    /// Parse algebraic square names such as `e4`
    pub fn parse(text: &str) -> ChessEngineResult<Square> {
        let bytes = text.as_bytes();
        if bytes.len() != 2 {
            return Err(ChessEngineError::InvalidSquare {
                text: text.to_string(),
            });
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank).ok_or_else(|| ChessEngineError::InvalidSquare {
            text: text.to_string(),
        })
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            (b'a' + self.file()) as char,
            (b'1' + self.rank()) as char
        )
    }
}

/// Which wing a castling move goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastleSide {
    Kingside,
    Queenside,
}

/// The four castling rights
///
/// Rights can only ever be cleared through this API; once a right is gone it
/// does not come back within a game. The only way to set a right is parsing a
/// FEN, which starts a new position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CastlingRights {
    white_kingside: bool,
    white_queenside: bool,
    black_kingside: bool,
    black_queenside: bool,
}

impl CastlingRights {
    pub const fn all() -> Self {
        CastlingRights {
            white_kingside: true,
            white_queenside: true,
            black_kingside: true,
            black_queenside: true,
        }
    }

    pub const fn none() -> Self {
        CastlingRights {
            white_kingside: false,
            white_queenside: false,
            black_kingside: false,
            black_queenside: false,
        }
    }

    pub fn has(&self, color: Color, side: CastleSide) -> bool {
        match (color, side) {
            (Color::White, CastleSide::Kingside) => self.white_kingside,
            (Color::White, CastleSide::Queenside) => self.white_queenside,
            (Color::Black, CastleSide::Kingside) => self.black_kingside,
            (Color::Black, CastleSide::Queenside) => self.black_queenside,
        }
    }

    pub fn clear(&mut self, color: Color, side: CastleSide) {
        match (color, side) {
            (Color::White, CastleSide::Kingside) => self.white_kingside = false,
            (Color::White, CastleSide::Queenside) => self.white_queenside = false,
            (Color::Black, CastleSide::Kingside) => self.black_kingside = false,
            (Color::Black, CastleSide::Queenside) => self.black_queenside = false,
        }
    }

    pub fn clear_color(&mut self, color: Color) {
        self.clear(color, CastleSide::Kingside);
        self.clear(color, CastleSide::Queenside);
    }

    /// Clear whichever right depends on a rook standing on `square`
    ///
    /// Called for both the origin and the destination of every move, which
    /// covers a rook moving away and a rook being captured at home.
    pub(crate) fn clear_for_corner(&mut self, square: Square) {
        match square {
            Square::A1 => self.white_queenside = false,
            Square::H1 => self.white_kingside = false,
            Square::A8 => self.black_queenside = false,
            Square::H8 => self.black_kingside = false,
            _ => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.white_kingside || self.white_queenside || self.black_kingside || self.black_queenside)
    }

    /// FEN castling field (`KQkq`, `-`)
    pub fn to_fen(&self) -> String {
        if self.is_empty() {
            return "-".to_string();
        }
        let mut s = String::with_capacity(4);
        if self.white_kingside {
            s.push('K');
        }
        if self.white_queenside {
            s.push('Q');
        }
        if self.black_kingside {
            s.push('k');
        }
        if self.black_queenside {
            s.push('q');
        }
        s
    }

    pub(crate) fn from_fen(field: &str) -> Option<Self> {
        let mut rights = CastlingRights::none();
        if field == "-" {
            return Some(rights);
        }
        for c in field.chars() {
            match c {
                'K' => rights.white_kingside = true,
                'Q' => rights.white_queenside = true,
                'k' => rights.black_kingside = true,
                'q' => rights.black_queenside = true,
                _ => return None,
            }
        }
        Some(rights)
    }
}

/// Special-move flags discovered during generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MoveFlags {
    pub capture: bool,
    pub en_passant: bool,
    pub castle_kingside: bool,
    pub castle_queenside: bool,
}

impl MoveFlags {
    pub const QUIET: MoveFlags = MoveFlags {
        capture: false,
        en_passant: false,
        castle_kingside: false,
        castle_queenside: false,
    };

    pub const CAPTURE: MoveFlags = MoveFlags {
        capture: true,
        ..MoveFlags::QUIET
    };

    pub const EN_PASSANT: MoveFlags = MoveFlags {
        capture: true,
        en_passant: true,
        ..MoveFlags::QUIET
    };

    pub fn castle(side: CastleSide) -> MoveFlags {
        MoveFlags {
            castle_kingside: side == CastleSide::Kingside,
            castle_queenside: side == CastleSide::Queenside,
            ..MoveFlags::QUIET
        }
    }

    pub fn castle_side(&self) -> Option<CastleSide> {
        if self.castle_kingside {
            Some(CastleSide::Kingside)
        } else if self.castle_queenside {
            Some(CastleSide::Queenside)
        } else {
            None
        }
    }
}

/// A move relative to the board it was generated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
    pub flags: MoveFlags,
}

impl Move {
    /// A quiet move with no flags; resolve against a board with
    /// [`crate::api::apply`] or [`crate::api::parse_uci`]
    pub fn new(from: Square, to: Square) -> Self {
        Move {
            from,
            to,
            promotion: None,
            flags: MoveFlags::QUIET,
        }
    }

    pub fn with_promotion(mut self, kind: PieceKind) -> Self {
        self.promotion = Some(kind);
        self
    }

    pub(crate) fn with_flags(mut self, flags: MoveFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn is_capture(&self) -> bool {
        self.flags.capture
    }

    #[inline]
    pub fn is_castle(&self) -> bool {
        self.flags.castle_side().is_some()
    }

    /// Same squares and promotion, ignoring flags
    #[inline]
    pub fn same_coordinates(&self, other: &Move) -> bool {
        self.from == other.from && self.to == other.to && self.promotion == other.promotion
    }

    /// Coordinate notation: `e2e4`, `e7e8q`
    pub fn to_uci(&self) -> String {
        let mut s = format!("{}{}", self.from, self.to);
        if let Some(kind) = self.promotion {
            s.push(kind.to_char());
        }
        s
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

/// Outcome of a game, persisted as a kebab-case tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameResult {
    InProgress,
    WhiteWins,
    BlackWins,
    DrawStalemate,
    DrawFiftyMove,
    DrawInsufficientMaterial,
    DrawThreefold,
}

impl GameResult {
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != GameResult::InProgress
    }

    /// Result when `color` has won
    pub fn win_for(color: Color) -> GameResult {
        match color {
            Color::White => GameResult::WhiteWins,
            Color::Black => GameResult::BlackWins,
        }
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            GameResult::WhiteWins => Some(Color::White),
            GameResult::BlackWins => Some(Color::Black),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameResult::InProgress => "in-progress",
            GameResult::WhiteWins => "white-wins",
            GameResult::BlackWins => "black-wins",
            GameResult::DrawStalemate => "draw-stalemate",
            GameResult::DrawFiftyMove => "draw-fifty-move",
            GameResult::DrawInsufficientMaterial => "draw-insufficient-material",
            GameResult::DrawThreefold => "draw-threefold",
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    Checkmate,
    Resignation,
    Stalemate,
    InsufficientMaterial,
    FiftyMove,
    ThreefoldRepetition,
}

impl Termination {
    /// Reason implied by a rules-derived result
    ///
    /// Decisive results map to checkmate; resignation is never derived from
    /// the board and has to be recorded explicitly.
    pub fn from_result(result: GameResult) -> Option<Termination> {
        match result {
            GameResult::InProgress => None,
            GameResult::WhiteWins | GameResult::BlackWins => Some(Termination::Checkmate),
            GameResult::DrawStalemate => Some(Termination::Stalemate),
            GameResult::DrawFiftyMove => Some(Termination::FiftyMove),
            GameResult::DrawInsufficientMaterial => Some(Termination::InsufficientMaterial),
            GameResult::DrawThreefold => Some(Termination::ThreefoldRepetition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_parse_and_display() {
        let e4 = Square::parse("e4").unwrap();
        assert_eq!(e4.file(), 4);
        assert_eq!(e4.rank(), 3);
        assert_eq!(e4.index(), 28);
        assert_eq!(e4.to_string(), "e4");
        assert!(Square::parse("i1").is_err());
        assert!(Square::parse("a9").is_err());
        assert!(Square::parse("e").is_err());
    }

    #[test]
    fn test_square_offset_does_not_wrap() {
        assert_eq!(Square::H1.offset(1, 0), None, "h1 east must fall off the board");
        assert_eq!(Square::A1.offset(-1, 1), None);
        assert_eq!(Square::A1.offset(1, 1), Square::new(1, 1));
    }

    #[test]
    fn test_square_colors() {
        assert!(!Square::A1.is_light());
        assert!(Square::H1.is_light());
        assert!(Square::parse("d1").unwrap().is_light());
    }

    #[test]
    fn test_castling_rights_only_clear() {
        let mut rights = CastlingRights::all();
        rights.clear_for_corner(Square::H1);
        assert!(!rights.has(Color::White, CastleSide::Kingside));
        assert!(rights.has(Color::White, CastleSide::Queenside));
        rights.clear_color(Color::Black);
        assert_eq!(rights.to_fen(), "Q");
        rights.clear(Color::White, CastleSide::Queenside);
        assert_eq!(rights.to_fen(), "-");
    }

    #[test]
    fn test_result_tags() {
        assert_eq!(
            serde_json::to_string(&GameResult::DrawInsufficientMaterial).unwrap(),
            "\"draw-insufficient-material\""
        );
        assert!(serde_json::from_str::<GameResult>("\"draw-agreed\"").is_err());
    }

    #[test]
    fn test_uci_rendering() {
        let mv = Move::new(Square::parse("e7").unwrap(), Square::parse("e8").unwrap())
            .with_promotion(PieceKind::Queen);
        assert_eq!(mv.to_uci(), "e7e8q");
    }
}
