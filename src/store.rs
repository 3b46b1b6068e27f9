//! Game store
//!
//! One pretty-printed JSON file per game, `game_id_<id>.json`, in a single
//! directory. The agent playing a game is the only writer of its file.
//!
//! ## Atomic Replace
//!
//! Every write goes to `game_id_<id>.json.tmp` first and is then renamed over
//! the target, so a reader (including a remote `read_file` from the
//! synchronizer) sees either the old record or the new one, never a torn
//! write.
//!
//! ## Versioning
//!
//! [`GameStore::save`] compares the record against the last one it wrote for
//! that id (or the file on disk when it has not written one yet). Unchanged
//! content is a no-op; changed content is written as `previous + 1`.

use chess_engine::{deserialize, ChessEngineError, ChessEngineResult, GameRecord, GameState};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::{StoreError, StoreResult};

const RECORD_PREFIX: &str = "game_id_";
const RECORD_SUFFIX: &str = ".json";

/// File name of a game's record, relative to its store directory
pub fn record_file_name(game_id: &str) -> String {
    format!("{RECORD_PREFIX}{game_id}{RECORD_SUFFIX}")
}

/// Decode a record and run its replay check
///
/// Shared by [`GameStore::load`] and the synchronizer's remote read path.
/// Both an undecodable payload and a failed replay are
/// [`ChessEngineError::CorruptRecord`].
pub fn decode_record(bytes: &[u8]) -> ChessEngineResult<(GameRecord, GameState)> {
    let record: GameRecord = serde_json::from_slice(bytes).map_err(|e| {
        ChessEngineError::CorruptRecord {
            reason: e.to_string(),
        }
    })?;
    let state = deserialize(&record)?;
    Ok((record, state))
}

/// Encode a record the way it is stored
pub fn encode_record(record: &GameRecord) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec_pretty(record)
}

fn check_game_id(game_id: &str) -> StoreResult<()> {
    let valid = !game_id.is_empty()
        && game_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidGameId(game_id.to_string()))
    }
}

/// Directory of game records
#[derive(Debug)]
pub struct GameStore {
    dir: PathBuf,
    last_saved: HashMap<String, GameRecord>,
}

impl GameStore {
    /// Open a store, creating the directory if missing
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            last_saved: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, game_id: &str) -> PathBuf {
        self.dir.join(record_file_name(game_id))
    }

    pub fn exists(&self, game_id: &str) -> bool {
        self.path_for(game_id).is_file()
    }

    /// Save a record, returning the version now on disk
    pub fn save(&mut self, mut record: GameRecord) -> StoreResult<u64> {
        check_game_id(&record.game_id)?;
        let previous = match self.last_saved.get(&record.game_id) {
            Some(prev) => Some(prev.clone()),
            None => match self.load(&record.game_id) {
                Ok(prev) => Some(prev),
                Err(StoreError::NotFound { .. }) => None,
                Err(StoreError::Corrupt { reason, .. }) => {
                    warn!(
                        "[STORE] Overwriting corrupt record for {}: {}",
                        record.game_id, reason
                    );
                    None
                }
                Err(e) => return Err(e),
            },
        };

        if let Some(prev) = previous {
            if prev.same_content(&record) {
                self.last_saved.insert(record.game_id.clone(), prev.clone());
                return Ok(prev.version);
            }
            record.version = prev.version + 1;
        }

        self.put(&record)?;
        let version = record.version;
        self.last_saved.insert(record.game_id.clone(), record);
        Ok(version)
    }

    /// Serialize and save a game, updating its version in place
    pub fn save_state(&mut self, state: &mut GameState) -> StoreResult<u64> {
        let version = self.save(chess_engine::serialize(state))?;
        state.mark_saved(version);
        Ok(version)
    }

    /// Write a record verbatim, keeping its version
    ///
    /// Used to mirror records fetched from elsewhere; local agents go through
    /// [`GameStore::save`].
    pub fn put(&self, record: &GameRecord) -> StoreResult<()> {
        check_game_id(&record.game_id)?;
        let path = self.path_for(&record.game_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, encode_record(record)?)?;
        fs::rename(&tmp, &path)?;
        debug!("[STORE] Wrote {} v{} to {:?}", record.game_id, record.version, path);
        Ok(())
    }

    /// Load and check a record
    pub fn load(&self, game_id: &str) -> StoreResult<GameRecord> {
        self.load_both(game_id).map(|(record, _)| record)
    }

    /// Load a record and rebuild its game
    pub fn load_state(&self, game_id: &str) -> StoreResult<GameState> {
        self.load_both(game_id).map(|(_, state)| state)
    }

    fn load_both(&self, game_id: &str) -> StoreResult<(GameRecord, GameState)> {
        check_game_id(game_id)?;
        let bytes = match fs::read(self.path_for(game_id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    game_id: game_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        decode_record(&bytes).map_err(|e| StoreError::Corrupt {
            game_id: game_id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Ids of every record in the directory, sorted
    pub fn list_ids(&self) -> StoreResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name
                .strip_prefix(RECORD_PREFIX)
                .and_then(|rest| rest.strip_suffix(RECORD_SUFFIX))
            {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Remove a record; returns whether one existed
    pub fn delete(&mut self, game_id: &str) -> StoreResult<bool> {
        check_game_id(game_id)?;
        self.last_saved.remove(game_id);
        match fs::remove_file(self.path_for(game_id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
