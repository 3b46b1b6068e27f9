//! Integration tests for the on-disk game store
//!
//! Covers versioning across save calls and store instances, atomic replace,
//! and how missing or damaged records surface.

use chess_engine::{serialize, GameResult, GameState};
use chessfleet::core::StoreError;
use chessfleet::store::{record_file_name, GameStore};
use std::fs;

fn played(id: &str, moves: &[&str]) -> GameState {
    let mut game = GameState::new(id);
    for uci in moves {
        game.submit_uci(uci).unwrap();
    }
    game
}

#[test]
fn test_versions_increase_only_on_change() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = GameStore::open(dir.path()).unwrap();

    let mut game = GameState::new("g1");
    assert_eq!(store.save_state(&mut game).unwrap(), 0);
    // Same content again is a no-op
    assert_eq!(store.save_state(&mut game).unwrap(), 0);

    game.submit_uci("e2e4").unwrap();
    assert_eq!(store.save_state(&mut game).unwrap(), 1);
    game.submit_uci("e7e5").unwrap();
    assert_eq!(store.save_state(&mut game).unwrap(), 2);
    assert_eq!(game.version(), 2);

    let loaded = store.load("g1").unwrap();
    assert_eq!(loaded.version, 2);
    assert_eq!(loaded.moves, vec!["e2e4", "e7e5"]);
}

#[test]
fn test_new_store_continues_from_disk_version() {
    //! A restarted agent opens a fresh store; versions must keep climbing
    //! from what is already on disk.

    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = GameStore::open(dir.path()).unwrap();
        let mut game = played("g2", &["d2d4"]);
        store.save_state(&mut game).unwrap();
        game.submit_uci("d7d5").unwrap();
        assert_eq!(store.save_state(&mut game).unwrap(), 1);
    }

    let mut store = GameStore::open(dir.path()).unwrap();
    let mut game = store.load_state("g2").unwrap();
    assert_eq!(game.version(), 1);
    assert_eq!(game.moves().len(), 2);

    game.submit_uci("c2c4").unwrap();
    assert_eq!(store.save_state(&mut game).unwrap(), 2);
}

#[test]
fn test_save_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = GameStore::open(dir.path()).unwrap();
    let mut game = played("g3", &["g1f3"]);
    store.save_state(&mut game).unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![record_file_name("g3")]);
}

#[test]
fn test_missing_record_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = GameStore::open(dir.path()).unwrap();
    assert!(matches!(store.load("nope"), Err(StoreError::NotFound { .. })));
}

#[test]
fn test_damaged_records_are_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = GameStore::open(dir.path()).unwrap();

    fs::write(store.path_for("trunc"), b"{\"game_id\": \"trunc\", \"fen\"").unwrap();
    assert!(matches!(store.load("trunc"), Err(StoreError::Corrupt { .. })));

    // Well-formed JSON whose fields disagree with its move list
    let mut game = played("lying", &["e2e4"]);
    store.save_state(&mut game).unwrap();
    let mut record = store.load("lying").unwrap();
    record.result = GameResult::WhiteWins;
    store.put(&record).unwrap();
    let err = store.load("lying").unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
    assert!(err.to_string().contains("lying"));
}

#[test]
fn test_list_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = GameStore::open(dir.path()).unwrap();
    for id in ["charlie", "alpha", "bravo"] {
        store.save(serialize(&GameState::new(id))).unwrap();
    }
    fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    assert_eq!(store.list_ids().unwrap(), vec!["alpha", "bravo", "charlie"]);
    assert!(store.delete("bravo").unwrap());
    assert!(!store.delete("bravo").unwrap());
    assert_eq!(store.list_ids().unwrap(), vec!["alpha", "charlie"]);
}

#[test]
fn test_put_keeps_the_given_version() {
    let dir = tempfile::tempdir().unwrap();
    let store = GameStore::open(dir.path()).unwrap();
    let mut record = serialize(&played("mirror", &["e2e4", "c7c5"]));
    record.version = 17;
    store.put(&record).unwrap();
    assert_eq!(store.load("mirror").unwrap().version, 17);
}
