//! Synchronizer
//!
//! One poll task per tracked game pulls the game's record from its node,
//! checks it, and publishes it to the [`SnapshotRegistry`].
//!
//! ## Poll Algorithm
//!
//! 1. Read `<autosave_dir>/game_id_<id>.json` from the node, bounded by the
//!    call timeout.
//! 2. On failure the existing snapshot keeps its board; it is marked
//!    unreachable, its failure count goes up, and the next poll is delayed
//!    by exponential backoff.
//! 3. On success the record is decoded and replay-checked. A version strictly
//!    greater than the registered one replaces the snapshot; anything else
//!    is stale and dropped ([`reconcile`]).
//! 4. Once the game has a result the task slows to the terminal cadence, or
//!    exits if configured to.
//! 5. The task also gives up, keeping whatever snapshot exists, when the
//!    record stays missing past the inactivity timeout, when an unfinished
//!    game goes too many polls without a new version, or when the overall
//!    sync timeout runs out.
//!
//! A corrupt record is treated like an unreachable node for the snapshot,
//! and the game is additionally reported through the failure hook so the
//! fleet can mark it failed.
//!
//! Polls for one game run strictly one after another inside its task, which
//! is what makes the version comparison race-free. Different games never
//! wait on each other.

use chess_engine::GameRecord;
use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::compute::{ComputeProvider, NodeHandle};
use crate::core::{ComputeError, SyncConfig, SyncError};
use crate::registry::{Snapshot, SnapshotRegistry};
use crate::retry::{sleep_or_cancel, with_timeout, Backoff, CancellationToken};
use crate::store::{decode_record, record_file_name, GameStore};

/// Called with `(game_id, reason)` when a game's record is corrupt
pub type FailureHook = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// What to do with a fetched record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No snapshot yet
    Create,
    /// Newer than the registered snapshot
    Replace,
    /// Same or older version; drop it
    Stale,
}

/// Last-writer-wins by version
pub fn reconcile(current: Option<&Snapshot>, fetched: &GameRecord) -> Decision {
    match current {
        None => Decision::Create,
        Some(snapshot) if fetched.version > snapshot.version() => Decision::Replace,
        Some(_) => Decision::Stale,
    }
}

/// Result of a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Created { version: u64 },
    Replaced { from: u64, to: u64 },
    Stale { fetched: u64, current: u64 },
    /// Node answered but has no record yet
    Missing { failures: u32 },
    /// Fetch failed; `failures` is the consecutive count for this game
    Unreachable { failures: u32, error: String },
    Corrupt { reason: String },
}

impl PollOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PollOutcome::Missing { .. } | PollOutcome::Unreachable { .. } | PollOutcome::Corrupt { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Missing,
    Unreachable,
    Corrupt,
}

struct PollTask {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Cloneable handle to the synchronizer
#[derive(Clone)]
pub struct Synchronizer {
    provider: Arc<dyn ComputeProvider>,
    registry: SnapshotRegistry,
    config: SyncConfig,
    remote_dir: String,
    tasks: Arc<Mutex<HashMap<String, PollTask>>>,
    /// Failures seen for games that have no snapshot yet
    orphan_failures: Arc<Mutex<HashMap<String, u32>>>,
    mirror: Option<Arc<Mutex<GameStore>>>,
    on_failure: Option<FailureHook>,
}

impl Synchronizer {
    pub fn new(
        provider: Arc<dyn ComputeProvider>,
        registry: SnapshotRegistry,
        config: SyncConfig,
        remote_dir: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            config,
            remote_dir: remote_dir.into(),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            orphan_failures: Arc::new(Mutex::new(HashMap::new())),
            mirror: None,
            on_failure: None,
        }
    }

    /// Also write every accepted record into a local store
    pub fn with_mirror(mut self, store: GameStore) -> Self {
        self.mirror = Some(Arc::new(Mutex::new(store)));
        self
    }

    pub fn with_failure_hook(mut self, hook: FailureHook) -> Self {
        self.on_failure = Some(hook);
        self
    }

    pub fn registry(&self) -> &SnapshotRegistry {
        &self.registry
    }

    pub fn remote_path(&self, game_id: &str) -> String {
        format!("{}/{}", self.remote_dir.trim_end_matches('/'), record_file_name(game_id))
    }

    /// Game ids with a live poll task, sorted
    pub fn tracked(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tasks
            .lock()
            .iter()
            .filter(|(_, task)| !task.join.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Poll a game once and publish the result
    pub async fn poll_once(&self, game_id: &str, handle: &NodeHandle) -> PollOutcome {
        let path = self.remote_path(game_id);
        let fetched = with_timeout(
            self.config.call_timeout(),
            self.provider.read_file(handle, &path),
        )
        .await;

        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(e @ ComputeError::NotFound(_)) => {
                return self.record_failure(game_id, e.to_string(), FailureKind::Missing)
            }
            Err(e) => return self.record_failure(game_id, e.to_string(), FailureKind::Unreachable),
        };
        let (record, state) = match decode_record(&bytes) {
            Ok(decoded) => decoded,
            Err(e) => return self.record_failure(game_id, e.to_string(), FailureKind::Corrupt),
        };
        if record.game_id != game_id {
            let reason = format!("record names game {:?}", record.game_id);
            return self.record_failure(game_id, reason, FailureKind::Corrupt);
        }

        let version = record.version;
        let snapshot = Snapshot::new(record.clone(), state.board().clone(), Utc::now());
        match self.registry.offer(snapshot) {
            (Decision::Stale, current) => PollOutcome::Stale {
                fetched: version,
                current: current.unwrap_or_default(),
            },
            (Decision::Replace, Some(from)) => {
                debug!("[SYNC] {} v{} -> v{}", game_id, from, version);
                self.mirror_record(record).await;
                PollOutcome::Replaced { from, to: version }
            }
            _ => {
                info!("[SYNC] First snapshot of {} at v{}", game_id, version);
                self.orphan_failures.lock().remove(game_id);
                self.mirror_record(record).await;
                PollOutcome::Created { version }
            }
        }
    }

    fn record_failure(&self, game_id: &str, error: String, kind: FailureKind) -> PollOutcome {
        let now = Utc::now();
        let corrupt = kind == FailureKind::Corrupt;
        let updated = self.registry.update(game_id, |s| {
            s.last_poll_time = now;
            s.reachable = false;
            s.consecutive_poll_failures += 1;
            s.last_error = Some(error.clone());
            if corrupt {
                s.failed = Some(error.clone());
            }
        });
        let failures = match updated {
            Some(snapshot) => snapshot.consecutive_poll_failures,
            None => {
                let mut orphans = self.orphan_failures.lock();
                let count = orphans.entry(game_id.to_string()).or_insert(0);
                *count += 1;
                *count
            }
        };

        match kind {
            FailureKind::Corrupt => {
                warn!("[SYNC] Corrupt record for {}: {}", game_id, error);
                if let Some(hook) = &self.on_failure {
                    hook(game_id, &error);
                }
                PollOutcome::Corrupt { reason: error }
            }
            FailureKind::Missing => {
                debug!("[SYNC] No record for {} yet ({} in a row)", game_id, failures);
                PollOutcome::Missing { failures }
            }
            FailureKind::Unreachable => {
                warn!(
                    "[SYNC] Poll of {} failed ({} in a row): {}",
                    game_id, failures, error
                );
                PollOutcome::Unreachable { failures, error }
            }
        }
    }

    /// Write an accepted record to the mirror unless it already holds that
    /// version or a later one
    async fn mirror_record(&self, record: GameRecord) {
        let Some(mirror) = self.mirror.clone() else {
            return;
        };
        let game_id = record.game_id.clone();
        let written = tokio::task::spawn_blocking(move || {
            let store = mirror.lock();
            match store.load(&record.game_id) {
                Ok(existing) if existing.version >= record.version => Ok(()),
                _ => store.put(&record),
            }
        })
        .await;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("[SYNC] Could not mirror {}: {}", game_id, e),
            Err(e) => warn!("[SYNC] Mirror write for {} did not finish: {}", game_id, e),
        }
    }

    /// Start polling a game in its own task
    pub fn spawn(&self, game_id: &str, handle: NodeHandle) -> Result<(), SyncError> {
        let mut tasks = self.tasks.lock();
        if let Some(existing) = tasks.get(game_id) {
            if !existing.join.is_finished() {
                return Err(SyncError::AlreadyTracked(game_id.to_string()));
            }
        }
        let cancel = CancellationToken::new();
        let sync = self.clone();
        let id = game_id.to_string();
        let token = cancel.clone();
        let join = tokio::spawn(async move { sync.poll_loop(id, handle, token).await });
        tasks.insert(game_id.to_string(), PollTask { cancel, join });
        info!("[SYNC] Tracking {}", game_id);
        Ok(())
    }

    async fn poll_loop(self, game_id: String, handle: NodeHandle, cancel: CancellationToken) {
        let mut backoff = Backoff::new(self.config.backoff_base(), self.config.backoff_max());
        let started = Instant::now();
        let mut last_fetch = started;
        let mut unchanged: u32 = 0;
        loop {
            let outcome = tokio::select! {
                outcome = self.poll_once(&game_id, &handle) => outcome,
                _ = cancel.cancelled() => break,
            };
            let terminal = self
                .registry
                .get(&game_id)
                .is_some_and(|s| s.is_terminal());

            match &outcome {
                PollOutcome::Created { .. } | PollOutcome::Replaced { .. } => {
                    last_fetch = Instant::now();
                    unchanged = 0;
                }
                PollOutcome::Stale { .. } => {
                    last_fetch = Instant::now();
                    if !terminal {
                        unchanged += 1;
                    }
                }
                PollOutcome::Missing { .. }
                | PollOutcome::Unreachable { .. }
                | PollOutcome::Corrupt { .. } => {}
            }
            if let Some(reason) = self.idle_limit(&outcome, started, last_fetch, unchanged) {
                info!("[SYNC] Giving up on {}: {}", game_id, reason);
                self.orphan_failures.lock().remove(&game_id);
                break;
            }

            let delay = if outcome.is_failure() {
                backoff.next_delay()
            } else {
                backoff.reset();
                if terminal && self.config.stop_after_terminal {
                    info!("[SYNC] {} is finished; no further polls", game_id);
                    break;
                }
                if terminal {
                    self.config.terminal_poll_interval()
                } else {
                    self.config.poll_interval()
                }
            };

            if !sleep_or_cancel(delay, &cancel).await {
                break;
            }
        }
        debug!("[SYNC] Poll task for {} exited", game_id);
    }

    /// Which configured cutoff, if any, this game has reached
    fn idle_limit(
        &self,
        outcome: &PollOutcome,
        started: Instant,
        last_fetch: Instant,
        unchanged: u32,
    ) -> Option<String> {
        if let Some(limit) = self.config.sync_timeout() {
            if started.elapsed() >= limit {
                return Some(format!("polled for {:?}", limit));
            }
        }
        if let (PollOutcome::Missing { .. }, Some(limit)) = (outcome, self.config.inactive_timeout()) {
            if last_fetch.elapsed() >= limit {
                return Some(format!("no record for {:?}", limit));
            }
        }
        match self.config.max_unchanged_polls {
            Some(max) if unchanged >= max => Some(format!("{} polls without a new version", unchanged)),
            _ => None,
        }
    }

    /// Stop polling a game; its snapshot stays readable
    pub fn untrack(&self, game_id: &str) -> bool {
        match self.tasks.lock().remove(game_id) {
            Some(task) => {
                task.cancel.cancel();
                info!("[SYNC] Untracked {}", game_id);
                true
            }
            None => false,
        }
    }

    /// Stop polling and drop the snapshot
    pub fn evict(&self, game_id: &str) -> Option<Arc<Snapshot>> {
        self.untrack(game_id);
        self.orphan_failures.lock().remove(game_id);
        self.registry.remove(game_id)
    }

    /// Cancel every poll task and wait for them to exit
    pub async fn shutdown(&self) {
        let tasks: Vec<PollTask> = self.tasks.lock().drain().map(|(_, task)| task).collect();
        for task in &tasks {
            task.cancel.cancel();
        }
        let count = tasks.len();
        join_all(tasks.into_iter().map(|task| task.join)).await;
        info!("[SYNC] Stopped {} poll task(s)", count);
    }
}
