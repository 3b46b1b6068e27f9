//! Game lifecycle management
//!
//! [`GameState`] wraps a [`Board`] with everything a single game needs beyond
//! the position itself: move history, per-move timestamps, the repetition
//! history and the result. It accepts one ply at a time.
//!
//! ## States
//!
//! `in-progress -> in-progress | terminated(result)`. Terminated is absorbing:
//! once a result is set no further move or resignation is accepted.

use super::moves::{parse_uci, resolve};
use super::state::terminal_status;
use crate::board::Board;
use crate::error::{ChessEngineError, ChessEngineResult};
use crate::hash::{position_key, PositionKey};
use crate::move_gen::legal_moves;
use crate::types::*;
use chrono::{DateTime, Utc};

/// One game in progress or finished
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    game_id: String,
    initial: Board,
    board: Board,
    moves: Vec<Move>,
    move_timestamps: Vec<DateTime<Utc>>,
    positions: Vec<PositionKey>,
    result: GameResult,
    termination: Option<Termination>,
    strategy: Option<String>,
    version: u64,
}

impl GameState {
    /// Create a new game at the standard starting position
    pub fn new(game_id: impl Into<String>) -> Self {
        Self::from_board(game_id.into(), Board::start_position())
    }

    /// Create a new game from an arbitrary position
    ///
    /// The position may already be terminal (for example a stalemate), in
    /// which case the game starts out finished.
    pub fn from_position(game_id: impl Into<String>, fen: &str) -> ChessEngineResult<Self> {
        Ok(Self::from_board(game_id.into(), Board::from_fen(fen)?))
    }

    fn from_board(game_id: String, initial: Board) -> Self {
        let positions = vec![position_key(&initial)];
        let result = terminal_status(&initial, &positions);
        GameState {
            game_id,
            board: initial.clone(),
            initial,
            moves: Vec::new(),
            move_timestamps: Vec::new(),
            positions,
            result,
            termination: Termination::from_result(result),
            strategy: None,
            version: 0,
        }
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn initial_board(&self) -> &Board {
        &self.initial
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn move_timestamps(&self) -> &[DateTime<Utc>] {
        &self.move_timestamps
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn strategy(&self) -> Option<&str> {
        self.strategy.as_deref()
    }

    pub fn is_terminated(&self) -> bool {
        self.result.is_terminal()
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    /// Version of the persisted record this state was last saved as
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Record the version the store assigned on save
    pub fn mark_saved(&mut self, version: u64) {
        self.version = version;
    }

    /// Legal moves for the side to move; empty once the game is over
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.is_terminated() {
            Vec::new()
        } else {
            legal_moves(&self.board)
        }
    }

    /// Play one ply, stamped with the current time
    pub fn submit_move(&mut self, mv: Move) -> ChessEngineResult<Move> {
        self.submit_move_at(mv, Utc::now())
    }

    /// Play one ply with an explicit timestamp
    ///
    /// On error the state is left untouched.
    ///
    /// # Errors
    ///
    /// [`ChessEngineError::IllegalMove`] if the game is already over or the
    /// move is not legal in the current position.
    pub fn submit_move_at(&mut self, mv: Move, at: DateTime<Utc>) -> ChessEngineResult<Move> {
        if self.is_terminated() {
            return Err(ChessEngineError::illegal(mv.to_uci(), "game is over"));
        }
        let played = resolve(&self.board, &mv)?;
        let next = self.board.play_unchecked(&played);

        self.positions.push(position_key(&next));
        self.result = terminal_status(&next, &self.positions);
        self.termination = Termination::from_result(self.result);
        self.board = next;
        self.moves.push(played);
        self.move_timestamps.push(at);
        Ok(played)
    }

    /// Play one ply given in coordinate notation
    pub fn submit_uci(&mut self, text: &str) -> ChessEngineResult<Move> {
        if self.is_terminated() {
            return Err(ChessEngineError::illegal(text, "game is over"));
        }
        let mv = parse_uci(&self.board, text)?;
        self.submit_move(mv)
    }

    /// `color` gives up; the opponent wins
    pub fn resign(&mut self, color: Color) -> ChessEngineResult<()> {
        if self.is_terminated() {
            return Err(ChessEngineError::GameOver {
                result: self.result,
            });
        }
        self.result = GameResult::win_for(color.opponent());
        self.termination = Some(Termination::Resignation);
        Ok(())
    }

    /// Move list in coordinate notation
    pub fn uci_history(&self) -> Vec<String> {
        self.moves.iter().map(Move::to_uci).collect()
    }

    pub(crate) fn restore_metadata(&mut self, strategy: Option<String>, version: u64) {
        self.strategy = strategy;
        self.version = version;
    }
}
