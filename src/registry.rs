//! Snapshot registry
//!
//! Process-wide map from game id to the latest reconciled [`Snapshot`].
//! The synchronizer is the only writer; everything else reads.
//!
//! Entries are `Arc<Snapshot>` and are replaced whole, never edited, so a
//! reader holding a snapshot keeps a consistent value no matter what the
//! synchronizer does next. Listing is ordered by game id.

use chess_engine::{Board, GameRecord, GameResult};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::sync::{reconcile, Decision};

/// Latest reconciled record of one game plus poll health
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub record: GameRecord,
    pub board: Board,
    pub last_poll_time: DateTime<Utc>,
    pub consecutive_poll_failures: u32,
    pub reachable: bool,
    /// Error of the most recent failed poll, cleared by a successful one
    pub last_error: Option<String>,
    /// Set when the game has been reported failed (corrupt record)
    pub failed: Option<String>,
}

impl Snapshot {
    pub fn new(record: GameRecord, board: Board, polled_at: DateTime<Utc>) -> Self {
        Self {
            record,
            board,
            last_poll_time: polled_at,
            consecutive_poll_failures: 0,
            reachable: true,
            last_error: None,
            failed: None,
        }
    }

    pub fn game_id(&self) -> &str {
        &self.record.game_id
    }

    pub fn version(&self) -> u64 {
        self.record.version
    }

    pub fn result(&self) -> GameResult {
        self.record.result
    }

    pub fn is_terminal(&self) -> bool {
        self.record.is_terminal()
    }
}

/// Shared handle to the registry
#[derive(Debug, Clone, Default)]
pub struct SnapshotRegistry {
    inner: Arc<RwLock<BTreeMap<String, Arc<Snapshot>>>>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, game_id: &str) -> Option<Arc<Snapshot>> {
        self.inner.read().get(game_id).cloned()
    }

    /// Every snapshot, ordered by game id
    pub fn list(&self) -> Vec<(String, Arc<Snapshot>)> {
        self.inner
            .read()
            .iter()
            .map(|(id, snap)| (id.clone(), Arc::clone(snap)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Read-only view for display code
    pub fn reader(&self) -> RegistryReader {
        RegistryReader {
            registry: self.clone(),
        }
    }

    /// Reconcile a freshly fetched snapshot against the registered one
    ///
    /// The version comparison and the write happen under one write lock, so
    /// overlapping polls of the same game can never move it backwards. A
    /// stale fetch only refreshes poll health: the node answered. Returns
    /// the decision and the version registered before the call.
    pub(crate) fn offer(&self, fetched: Snapshot) -> (Decision, Option<u64>) {
        let mut map = self.inner.write();
        let current = map.get(fetched.game_id()).cloned();
        let decision = reconcile(current.as_deref(), &fetched.record);
        let previous = current.as_ref().map(|s| s.version());
        match (decision, current) {
            (Decision::Stale, Some(current)) => {
                let mut next = Snapshot::clone(&current);
                next.last_poll_time = fetched.last_poll_time;
                next.reachable = true;
                next.consecutive_poll_failures = 0;
                next.last_error = None;
                map.insert(fetched.game_id().to_string(), Arc::new(next));
            }
            _ => {
                map.insert(fetched.game_id().to_string(), Arc::new(fetched));
            }
        }
        (decision, previous)
    }

    /// Replace an existing entry with a modified copy
    ///
    /// Returns the new snapshot, or `None` if there is no entry for the id.
    pub(crate) fn update(
        &self,
        game_id: &str,
        f: impl FnOnce(&mut Snapshot),
    ) -> Option<Arc<Snapshot>> {
        let mut map = self.inner.write();
        let current = map.get(game_id)?;
        let mut next = Snapshot::clone(current);
        f(&mut next);
        let next = Arc::new(next);
        map.insert(game_id.to_string(), Arc::clone(&next));
        Some(next)
    }

    pub(crate) fn remove(&self, game_id: &str) -> Option<Arc<Snapshot>> {
        self.inner.write().remove(game_id)
    }
}

/// Registry access without write methods
#[derive(Debug, Clone)]
pub struct RegistryReader {
    registry: SnapshotRegistry,
}

impl RegistryReader {
    pub fn get(&self, game_id: &str) -> Option<Arc<Snapshot>> {
        self.registry.get(game_id)
    }

    pub fn list(&self) -> Vec<(String, Arc<Snapshot>)> {
        self.registry.list()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
