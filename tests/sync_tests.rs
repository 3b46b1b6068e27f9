//! Integration tests for the synchronizer and snapshot registry
//!
//! A fake node serves whatever record bytes the test puts in front of it, so
//! reordering, outages and corruption can be staged one poll at a time.

use async_trait::async_trait;
use chess_engine::{serialize, GameRecord, GameState};
use chessfleet::compute::{ComputeProvider, ExecOutput, NodeHandle, NodeSpec, NodeStatus};
use chessfleet::core::{ComputeError, ComputeResult, SyncConfig};
use chessfleet::store::{encode_record, GameStore};
use chessfleet::sync::PollOutcome;
use chessfleet::{SnapshotRegistry, Synchronizer};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Serves one canned response per path
#[derive(Default)]
struct FakeNode {
    files: Mutex<HashMap<String, ComputeResult<Vec<u8>>>>,
    reads: AtomicUsize,
}

impl FakeNode {
    fn serve(&self, path: &str, record: &GameRecord) {
        let bytes = encode_record(record).unwrap();
        self.files.lock().insert(path.to_string(), Ok(bytes));
    }

    fn serve_bytes(&self, path: &str, bytes: &[u8]) {
        self.files.lock().insert(path.to_string(), Ok(bytes.to_vec()));
    }

    fn fail(&self, path: &str, error: ComputeError) {
        self.files.lock().insert(path.to_string(), Err(error));
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComputeProvider for FakeNode {
    async fn start(&self, spec: &NodeSpec) -> ComputeResult<NodeHandle> {
        Ok(NodeHandle {
            instance_id: spec.game_id.clone(),
        })
    }

    async fn stop(&self, _handle: &NodeHandle) -> ComputeResult<()> {
        Ok(())
    }

    async fn pause(&self, _handle: &NodeHandle) -> ComputeResult<()> {
        Ok(())
    }

    async fn resume(&self, _handle: &NodeHandle) -> ComputeResult<()> {
        Ok(())
    }

    async fn exec(&self, _handle: &NodeHandle, _command: &str) -> ComputeResult<ExecOutput> {
        Ok(ExecOutput::default())
    }

    async fn read_file(&self, _handle: &NodeHandle, path: &str) -> ComputeResult<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(ComputeError::NotFound(path.to_string())))
    }

    async fn write_file(&self, _handle: &NodeHandle, _path: &str, _bytes: &[u8]) -> ComputeResult<()> {
        Ok(())
    }

    async fn status(&self, _handle: &NodeHandle) -> ComputeResult<NodeStatus> {
        Ok(NodeStatus::Running)
    }
}

fn handle(id: &str) -> NodeHandle {
    NodeHandle {
        instance_id: id.to_string(),
    }
}

/// Records of one game at successive versions, one ply apart
fn versions(game_id: &str, plies: &[&str]) -> Vec<GameRecord> {
    let mut game = GameState::new(game_id);
    let mut out = vec![serialize(&game)];
    for (i, uci) in plies.iter().enumerate() {
        game.submit_uci(uci).unwrap();
        game.mark_saved(i as u64 + 1);
        out.push(serialize(&game));
    }
    out
}

fn synchronizer(node: Arc<FakeNode>) -> Synchronizer {
    Synchronizer::new(node, SnapshotRegistry::new(), SyncConfig::default(), "chess_autosaves")
}

fn synchronizer_with(node: Arc<FakeNode>, config: SyncConfig) -> Synchronizer {
    Synchronizer::new(node, SnapshotRegistry::new(), config, "chess_autosaves")
}

/// Fast polling with every cutoff switched off
fn quick_config() -> SyncConfig {
    SyncConfig {
        poll_interval_ms: 100,
        backoff_base_ms: 100,
        backoff_max_ms: 100,
        inactive_timeout_ms: None,
        max_unchanged_polls: None,
        sync_timeout_ms: None,
        ..SyncConfig::default()
    }
}

fn fools_mate(game_id: &str) -> GameRecord {
    versions(game_id, &["f2f3", "e7e5", "g2g4", "d8h4"]).pop().unwrap()
}

#[tokio::test]
async fn test_out_of_order_records_keep_the_highest_version() {
    let node = Arc::new(FakeNode::default());
    let sync = synchronizer(node.clone());
    let path = sync.remote_path("g");
    let records = versions("g", &["e2e4", "e7e5", "g1f3"]);

    node.serve(&path, &records[2]);
    assert_eq!(sync.poll_once("g", &handle("g")).await, PollOutcome::Created { version: 2 });

    node.serve(&path, &records[1]);
    assert_eq!(
        sync.poll_once("g", &handle("g")).await,
        PollOutcome::Stale { fetched: 1, current: 2 }
    );
    node.serve(&path, &records[2]);
    assert!(matches!(sync.poll_once("g", &handle("g")).await, PollOutcome::Stale { .. }));

    node.serve(&path, &records[3]);
    assert_eq!(
        sync.poll_once("g", &handle("g")).await,
        PollOutcome::Replaced { from: 2, to: 3 }
    );

    let snap = sync.registry().get("g").unwrap();
    assert_eq!(snap.version(), 3);
    assert_eq!(snap.record.moves, vec!["e2e4", "e7e5", "g1f3"]);
    assert_eq!(snap.board.to_fen(), records[3].fen);
}

#[tokio::test]
async fn test_unreachable_node_keeps_last_board() {
    let node = Arc::new(FakeNode::default());
    let sync = synchronizer(node.clone());
    let path = sync.remote_path("g");
    let records = versions("g", &["d2d4"]);

    node.serve(&path, &records[1]);
    sync.poll_once("g", &handle("g")).await;
    let before = sync.registry().get("g").unwrap();

    node.fail(&path, ComputeError::Transient("connection reset".into()));
    for expected in 1..=3 {
        match sync.poll_once("g", &handle("g")).await {
            PollOutcome::Unreachable { failures, .. } => assert_eq!(failures, expected),
            other => panic!("expected unreachable, got {other:?}"),
        }
    }

    let snap = sync.registry().get("g").unwrap();
    assert!(!snap.reachable);
    assert_eq!(snap.consecutive_poll_failures, 3);
    assert_eq!(snap.board, before.board);
    assert_eq!(snap.version(), 1);
    assert!(snap.last_error.as_deref().unwrap().contains("connection reset"));
    assert!(snap.failed.is_none());

    // A reader that grabbed the snapshot earlier still sees its own copy
    assert!(before.reachable);

    node.serve(&path, &records[1]);
    sync.poll_once("g", &handle("g")).await;
    let snap = sync.registry().get("g").unwrap();
    assert!(snap.reachable);
    assert_eq!(snap.consecutive_poll_failures, 0);
}

#[tokio::test]
async fn test_failure_before_first_record_creates_no_snapshot() {
    let node = Arc::new(FakeNode::default());
    let sync = synchronizer(node);
    let outcome = sync.poll_once("fresh", &handle("fresh")).await;
    assert!(outcome.is_failure());
    assert!(sync.registry().get("fresh").is_none());
    assert!(sync.registry().is_empty());
}

#[tokio::test]
async fn test_corrupt_record_reports_failure() {
    let node = Arc::new(FakeNode::default());
    let reported: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = reported.clone();
    let sync = synchronizer(node.clone()).with_failure_hook(Arc::new(move |game_id: &str, _reason: &str| {
        sink.lock().push(game_id.to_string());
    }));
    let path = sync.remote_path("g");
    let records = versions("g", &["e2e4"]);

    node.serve(&path, &records[1]);
    sync.poll_once("g", &handle("g")).await;

    // Version bumped but the move list disagrees with the position
    let mut forged = records[1].clone();
    forged.version = 5;
    forged.moves = vec!["d2d4".to_string()];
    node.serve(&path, &forged);
    assert!(matches!(
        sync.poll_once("g", &handle("g")).await,
        PollOutcome::Corrupt { .. }
    ));

    node.serve_bytes(&path, b"not json");
    assert!(matches!(
        sync.poll_once("g", &handle("g")).await,
        PollOutcome::Corrupt { .. }
    ));

    assert_eq!(*reported.lock(), vec!["g".to_string(), "g".to_string()]);
    let snap = sync.registry().get("g").unwrap();
    assert_eq!(snap.version(), 1);
    assert!(snap.failed.is_some());
    assert!(!snap.reachable);
}

#[tokio::test]
async fn test_record_for_another_game_is_corrupt() {
    let node = Arc::new(FakeNode::default());
    let sync = synchronizer(node.clone());
    let path = sync.remote_path("mine");
    node.serve(&path, &versions("theirs", &[])[0]);
    assert!(matches!(
        sync.poll_once("mine", &handle("mine")).await,
        PollOutcome::Corrupt { .. }
    ));
    assert!(sync.registry().get("mine").is_none());
}

#[tokio::test]
async fn test_record_with_forged_start_position_is_corrupt() {
    let node = Arc::new(FakeNode::default());
    let sync = synchronizer(node.clone());
    let path = sync.remote_path("g");

    for fen in [
        format!("{}/8/8/8/8/8/8/4K2k w - - 0 1", "9".repeat(40)),
        "4k3/8/8/8/8/8/8/R3K3 w - - 4294967295 1".to_string(),
    ] {
        let mut forged = versions("g", &[])[0].clone();
        forged.initial_fen = fen.clone();
        forged.fen = fen;
        node.serve(&path, &forged);
        assert!(matches!(
            sync.poll_once("g", &handle("g")).await,
            PollOutcome::Corrupt { .. }
        ));
    }
    assert!(sync.registry().get("g").is_none());
}

#[tokio::test]
async fn test_missing_record_is_its_own_outcome() {
    let node = Arc::new(FakeNode::default());
    let sync = synchronizer(node.clone());
    assert_eq!(
        sync.poll_once("g", &handle("g")).await,
        PollOutcome::Missing { failures: 1 }
    );
    assert_eq!(
        sync.poll_once("g", &handle("g")).await,
        PollOutcome::Missing { failures: 2 }
    );

    node.serve(&sync.remote_path("g"), &versions("g", &[])[0]);
    assert_eq!(sync.poll_once("g", &handle("g")).await, PollOutcome::Created { version: 0 });
}

#[tokio::test]
async fn test_accepted_records_are_mirrored() {
    let dir = tempfile::tempdir().unwrap();
    let node = Arc::new(FakeNode::default());
    let sync = synchronizer(node.clone()).with_mirror(GameStore::open(dir.path()).unwrap());
    let path = sync.remote_path("g");
    let records = versions("g", &["c2c4", "e7e5"]);

    node.serve(&path, &records[2]);
    sync.poll_once("g", &handle("g")).await;
    node.serve(&path, &records[1]);
    sync.poll_once("g", &handle("g")).await;

    let mirror = GameStore::open(dir.path()).unwrap();
    assert_eq!(mirror.load("g").unwrap().version, 2);
}

#[tokio::test]
async fn test_mirror_never_goes_backwards() {
    let dir = tempfile::tempdir().unwrap();
    let records = versions("g", &["c2c4", "e7e5"]);
    let store = GameStore::open(dir.path()).unwrap();
    store.put(&records[2]).unwrap();

    // A fresh synchronizer has no snapshot, so v1 is accepted into the registry
    let node = Arc::new(FakeNode::default());
    let sync = synchronizer(node.clone()).with_mirror(store);
    node.serve(&sync.remote_path("g"), &records[1]);
    assert_eq!(sync.poll_once("g", &handle("g")).await, PollOutcome::Created { version: 1 });

    let mirror = GameStore::open(dir.path()).unwrap();
    assert_eq!(mirror.load("g").unwrap().version, 2);
}

#[tokio::test(start_paused = true)]
async fn test_poll_tasks_run_independently() {
    //! Two games are tracked concurrently; one node is down the whole time.
    //! The healthy game's snapshot still advances.

    let node = Arc::new(FakeNode::default());
    let config = SyncConfig {
        poll_interval_ms: 100,
        backoff_base_ms: 100,
        ..SyncConfig::default()
    };
    let sync = Synchronizer::new(node.clone(), SnapshotRegistry::new(), config, "chess_autosaves");
    let records = versions("up", &["e2e4", "e7e5"]);
    node.serve(&sync.remote_path("up"), &records[1]);
    node.fail(&sync.remote_path("down"), ComputeError::Transient("offline".into()));

    sync.spawn("up", handle("up")).unwrap();
    sync.spawn("down", handle("down")).unwrap();
    assert!(sync.spawn("up", handle("up")).is_err());
    assert_eq!(sync.tracked(), vec!["down".to_string(), "up".to_string()]);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(sync.registry().get("up").unwrap().version(), 1);

    node.serve(&sync.remote_path("up"), &records[2]);
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(sync.registry().get("up").unwrap().version(), 2);
    assert!(sync.registry().get("down").is_none());

    sync.shutdown().await;
    assert!(sync.tracked().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_untrack_keeps_snapshot_and_evict_drops_it() {
    let node = Arc::new(FakeNode::default());
    let sync = synchronizer(node.clone());
    node.serve(&sync.remote_path("g"), &versions("g", &["e2e4"])[1]);

    sync.spawn("g", handle("g")).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sync.registry().get("g").unwrap().version(), 1);

    assert!(sync.untrack("g"));
    assert!(!sync.untrack("g"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(sync.tracked().is_empty());
    assert!(sync.registry().get("g").is_some());

    let evicted = sync.evict("g").unwrap();
    assert_eq!(evicted.version(), 1);
    assert!(sync.registry().get("g").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_finished_game_stops_polling_when_configured() {
    let node = Arc::new(FakeNode::default());
    let config = SyncConfig {
        stop_after_terminal: true,
        ..quick_config()
    };
    let sync = synchronizer_with(node.clone(), config);
    node.serve(&sync.remote_path("g"), &fools_mate("g"));

    sync.spawn("g", handle("g")).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(sync.tracked().is_empty());
    assert_eq!(node.reads(), 1);

    let snap = sync.registry().get("g").unwrap();
    assert!(snap.is_terminal());
    assert_eq!(snap.version(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_finished_game_slows_to_terminal_cadence() {
    //! A finished game is re-read once per terminal interval, and stale
    //! polls of a finished game never count toward the unchanged limit.

    let node = Arc::new(FakeNode::default());
    let config = SyncConfig {
        terminal_poll_interval_ms: 1_000,
        max_unchanged_polls: Some(1),
        ..quick_config()
    };
    let sync = synchronizer_with(node.clone(), config);
    node.serve(&sync.remote_path("g"), &fools_mate("g"));

    sync.spawn("g", handle("g")).unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    // Reads at 0s, 1s and 2s
    assert_eq!(node.reads(), 3);
    assert_eq!(sync.tracked(), vec!["g".to_string()]);

    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_missing_record_gives_up_after_inactive_timeout() {
    let node = Arc::new(FakeNode::default());
    let config = SyncConfig {
        inactive_timeout_ms: Some(1_000),
        ..quick_config()
    };
    let sync = synchronizer_with(node.clone(), config);

    sync.spawn("never", handle("never")).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sync.tracked(), vec!["never".to_string()]);

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert!(sync.tracked().is_empty());
    let reads = node.reads();
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(node.reads(), reads);
    assert!(sync.registry().get("never").is_none());

    // Giving up frees the id for a new task
    sync.spawn("never", handle("never")).unwrap();
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_node_does_not_trip_inactive_timeout() {
    let node = Arc::new(FakeNode::default());
    let config = SyncConfig {
        inactive_timeout_ms: Some(300),
        ..quick_config()
    };
    let sync = synchronizer_with(node.clone(), config);
    node.fail(&sync.remote_path("g"), ComputeError::Transient("offline".into()));

    sync.spawn("g", handle("g")).unwrap();
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(sync.tracked(), vec!["g".to_string()]);
    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_game_gives_up_and_keeps_snapshot() {
    //! Polls at 0, 100, 200, ... ms. A new version at 150 ms resets the
    //! count, so the task gives up on the third stale poll after it, at
    //! 500 ms.

    let node = Arc::new(FakeNode::default());
    let config = SyncConfig {
        max_unchanged_polls: Some(3),
        ..quick_config()
    };
    let sync = synchronizer_with(node.clone(), config);
    let path = sync.remote_path("g");
    let records = versions("g", &["e2e4", "e7e5"]);
    node.serve(&path, &records[1]);

    sync.spawn("g", handle("g")).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    node.serve(&path, &records[2]);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(sync.tracked(), vec!["g".to_string()]);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(sync.tracked().is_empty());
    let snap = sync.registry().get("g").unwrap();
    assert_eq!(snap.version(), 2);
    assert!(!snap.is_terminal());
}

#[tokio::test(start_paused = true)]
async fn test_sync_timeout_bounds_every_game() {
    let node = Arc::new(FakeNode::default());
    let config = SyncConfig {
        sync_timeout_ms: Some(500),
        ..quick_config()
    };
    let sync = synchronizer_with(node.clone(), config);
    let path = sync.remote_path("g");
    let records = versions("g", &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4", "g8f6"]);
    node.serve(&path, &records[0]);

    sync.spawn("g", handle("g")).unwrap();
    for record in &records[1..4] {
        tokio::time::sleep(Duration::from_millis(100)).await;
        node.serve(&path, record);
    }
    assert_eq!(sync.tracked(), vec!["g".to_string()]);

    for record in &records[4..] {
        tokio::time::sleep(Duration::from_millis(100)).await;
        node.serve(&path, record);
    }
    assert!(sync.tracked().is_empty());
    assert!(sync.registry().get("g").unwrap().version() < 8);
}

#[test]
fn test_registry_lists_in_game_id_order() {
    let registry = SnapshotRegistry::new();
    let reader = registry.reader();
    assert!(reader.is_empty());

    let node = Arc::new(FakeNode::default());
    let sync = Synchronizer::new(node.clone(), registry, SyncConfig::default(), "saves");
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    for id in ["zulu", "alpha", "mike"] {
        node.serve(&sync.remote_path(id), &versions(id, &[])[0]);
        rt.block_on(sync.poll_once(id, &handle(id)));
    }

    let ids: Vec<String> = reader.list().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["alpha", "mike", "zulu"]);
    assert_eq!(reader.len(), 3);
}
