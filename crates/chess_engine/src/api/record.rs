//! Persisted game record
//!
//! [`GameRecord`] is the serde form of a [`GameState`]: the current FEN, the
//! move list in coordinate notation and the bookkeeping the store and the
//! synchronizer need (`version`, `last_updated`).
//!
//! ## Replay Check
//!
//! The FEN and the result in a record are redundant with the move list.
//! [`deserialize`] replays every move from `initial_fen` and rejects the
//! record as [`ChessEngineError::CorruptRecord`] unless both come out
//! identical. A record that passes can be trusted as a legal game.

use super::game::GameState;
use crate::constants::START_FEN;
use crate::error::{ChessEngineError, ChessEngineResult};
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_initial_fen() -> String {
    START_FEN.to_string()
}

/// One game as it is written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    #[serde(default = "default_initial_fen")]
    pub initial_fen: String,
    pub fen: String,
    pub moves: Vec<String>,
    #[serde(default)]
    pub move_timestamps: Vec<DateTime<Utc>>,
    pub result: GameResult,
    #[serde(default)]
    pub termination: Option<Termination>,
    #[serde(default)]
    pub strategy: Option<String>,
    pub version: u64,
    pub last_updated: DateTime<Utc>,
}

impl GameRecord {
    /// Equal in everything except `version` and `last_updated`
    pub fn same_content(&self, other: &GameRecord) -> bool {
        self.game_id == other.game_id
            && self.initial_fen == other.initial_fen
            && self.fen == other.fen
            && self.moves == other.moves
            && self.move_timestamps == other.move_timestamps
            && self.result == other.result
            && self.termination == other.termination
            && self.strategy == other.strategy
    }

    pub fn is_terminal(&self) -> bool {
        self.result.is_terminal()
    }
}

/// Project a game into its persisted form
///
/// `last_updated` is the time of the most recent move, or now for a game
/// with no moves yet.
pub fn serialize(state: &GameState) -> GameRecord {
    GameRecord {
        game_id: state.game_id().to_string(),
        initial_fen: state.initial_board().to_fen(),
        fen: state.board().to_fen(),
        moves: state.uci_history(),
        move_timestamps: state.move_timestamps().to_vec(),
        result: state.result(),
        termination: state.termination(),
        strategy: state.strategy().map(str::to_string),
        version: state.version(),
        last_updated: state.move_timestamps().last().copied().unwrap_or_else(Utc::now),
    }
}

/// Rebuild a game by replaying its record
///
/// # Errors
///
/// [`ChessEngineError::CorruptRecord`] if the record is internally
/// inconsistent: an illegal or malformed move, a FEN or result that the
/// replay does not reproduce, or a timestamp list of the wrong length.
pub fn deserialize(record: &GameRecord) -> ChessEngineResult<GameState> {
    if record.game_id.is_empty() {
        return Err(ChessEngineError::corrupt("empty game_id"));
    }
    let timestamps = if record.move_timestamps.is_empty() {
        vec![record.last_updated; record.moves.len()]
    } else if record.move_timestamps.len() == record.moves.len() {
        record.move_timestamps.clone()
    } else {
        return Err(ChessEngineError::corrupt(format!(
            "{} moves but {} timestamps",
            record.moves.len(),
            record.move_timestamps.len()
        )));
    };

    let mut state = GameState::from_position(record.game_id.clone(), &record.initial_fen)
        .map_err(|e| ChessEngineError::corrupt(format!("initial_fen: {e}")))?;
    for (ply, (text, at)) in record.moves.iter().zip(timestamps).enumerate() {
        let mv = state
            .board()
            .parse_uci(text)
            .map_err(|e| ChessEngineError::corrupt(format!("ply {}: {e}", ply + 1)))?;
        state
            .submit_move_at(mv, at)
            .map_err(|e| ChessEngineError::corrupt(format!("ply {}: {e}", ply + 1)))?;
    }

    if record.termination == Some(Termination::Resignation) {
        let loser = record
            .result
            .winner()
            .map(Color::opponent)
            .ok_or_else(|| ChessEngineError::corrupt("resignation without a winner"))?;
        state
            .resign(loser)
            .map_err(|e| ChessEngineError::corrupt(format!("resignation: {e}")))?;
    }

    if state.board().to_fen() != record.fen {
        return Err(ChessEngineError::corrupt(format!(
            "replay reached {:?}, record says {:?}",
            state.board().to_fen(),
            record.fen
        )));
    }
    if state.result() != record.result {
        return Err(ChessEngineError::corrupt(format!(
            "replay result {}, record says {}",
            state.result(),
            record.result
        )));
    }
    // Records written before `termination` existed leave it out
    if record.termination.is_some() && record.termination != state.termination() {
        return Err(ChessEngineError::corrupt(format!(
            "replay ended by {:?}, record says {:?}",
            state.termination(),
            record.termination
        )));
    }

    state.restore_metadata(record.strategy.clone(), record.version);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn played(moves: &[&str]) -> GameState {
        let mut game = GameState::new("rec").with_strategy("random");
        for mv in moves {
            game.submit_uci(mv).unwrap();
        }
        game
    }

    #[test]
    fn test_round_trip_preserves_board_and_history() {
        let game = played(&["e2e4", "c7c5", "g1f3", "d7d6"]);
        let back = deserialize(&serialize(&game)).unwrap();
        assert_eq!(back, game);
        assert_eq!(back.strategy(), Some("random"));
    }

    #[test]
    fn test_resignation_survives_round_trip() {
        let mut game = played(&["e2e4"]);
        game.resign(Color::Black).unwrap();
        let record = serialize(&game);
        assert_eq!(record.termination, Some(Termination::Resignation));
        let back = deserialize(&record).unwrap();
        assert_eq!(back.result(), GameResult::WhiteWins);
        assert_eq!(back.termination(), Some(Termination::Resignation));
    }

    #[test]
    fn test_tampered_fen_is_corrupt() {
        let mut record = serialize(&played(&["e2e4"]));
        record.fen = START_FEN.to_string();
        assert!(matches!(
            deserialize(&record),
            Err(ChessEngineError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_tampered_result_is_corrupt() {
        let mut record = serialize(&played(&["e2e4"]));
        record.result = GameResult::DrawStalemate;
        assert!(deserialize(&record).is_err());
    }

    #[test]
    fn test_tampered_termination_is_corrupt() {
        let mut record = serialize(&played(&["f2f3", "e7e5", "g2g4", "d8h4"]));
        assert_eq!(record.termination, Some(Termination::Checkmate));
        record.termination = Some(Termination::Stalemate);
        assert!(matches!(
            deserialize(&record),
            Err(ChessEngineError::CorruptRecord { .. })
        ));

        record.termination = None;
        assert_eq!(deserialize(&record).unwrap().termination(), Some(Termination::Checkmate));
    }

    #[test]
    fn test_illegal_move_in_history_is_corrupt() {
        let mut record = serialize(&played(&["e2e4"]));
        record.moves.push("e4e6".into());
        record.move_timestamps.clear();
        let err = deserialize(&record).unwrap_err();
        assert!(err.to_string().contains("ply 2"), "got {err}");
    }

    #[test]
    fn test_unknown_result_tag_is_rejected() {
        let mut json = serde_json::to_value(serialize(&played(&[]))).unwrap();
        json["result"] = serde_json::Value::String("white-resigned".into());
        assert!(serde_json::from_value::<GameRecord>(json).is_err());
    }

    #[test]
    fn test_same_content_ignores_version() {
        let game = played(&["d2d4"]);
        let a = serialize(&game);
        let mut b = a.clone();
        b.version += 3;
        b.last_updated = Utc::now();
        assert!(a.same_content(&b));
        b.strategy = None;
        assert!(!a.same_content(&b));
    }
}
