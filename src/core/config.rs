//! Fleet configuration
//!
//! [`FleetConfig`] gathers every tunable of a run: where nodes and the
//! central mirror live, the retry budget for remote calls, the poll cadence
//! and what each game agent plays.
//!
//! # File Format
//!
//! A JSON file whose fields all have defaults, so a partial file such as
//! `{"sync": {"poll_interval_ms": 250}}` is valid.
//!
//! # Error Handling
//!
//! [`FleetConfig::load`] never fails: a missing or unreadable file falls back
//! to defaults and logs why.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use super::error::StoreResult;

/// Top-level configuration for one orchestrator run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Root for local nodes, metadata files and the central mirror
    pub work_dir: PathBuf,
    pub retry: RetryConfig,
    pub sync: SyncConfig,
    pub agent: AgentConfig,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("chessfleet_work"),
            retry: RetryConfig::default(),
            sync: SyncConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl FleetConfig {
    /// Load from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("[CONFIG] No config file at {:?}. Using defaults.", path);
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<FleetConfig>(&contents) {
                Ok(config) => {
                    info!("[CONFIG] Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "[CONFIG] Failed to parse config file at {:?}: {}. Using defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!(
                    "[CONFIG] Failed to read config file at {:?}: {}. Using defaults.",
                    path, e
                );
                Self::default()
            }
        }
    }

    /// Write as pretty JSON, creating the parent directory
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn nodes_dir(&self) -> PathBuf {
        self.work_dir.join("nodes")
    }

    pub fn mirror_dir(&self) -> PathBuf {
        self.work_dir.join("central")
    }
}

/// Bounded exponential backoff for provisioning, lifecycle and health calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per call, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Deadline for a single remote call
    pub call_timeout_ms: u64,
    /// Status polls while waiting for a new node to report running
    pub readiness_polls: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            call_timeout_ms: 10_000,
            readiness_polls: 5,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Poll cadence of the synchronizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub poll_interval_ms: u64,
    /// First delay after a failed poll; doubles per consecutive failure
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub call_timeout_ms: u64,
    /// Cadence once the game has a terminal result
    pub terminal_poll_interval_ms: u64,
    /// Stop polling a finished game instead of slowing down
    pub stop_after_terminal: bool,
    /// Give up on a game whose record stays missing this long
    pub inactive_timeout_ms: Option<u64>,
    /// Give up on an unfinished game after this many polls in a row that
    /// brought nothing new
    pub max_unchanged_polls: Option<u32>,
    /// Hard limit on how long one game is polled
    pub sync_timeout_ms: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
            call_timeout_ms: 5_000,
            terminal_poll_interval_ms: 5_000,
            stop_after_terminal: false,
            inactive_timeout_ms: Some(20_000),
            max_unchanged_polls: Some(15),
            sync_timeout_ms: None,
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn terminal_poll_interval(&self) -> Duration {
        Duration::from_millis(self.terminal_poll_interval_ms)
    }

    pub fn inactive_timeout(&self) -> Option<Duration> {
        self.inactive_timeout_ms.map(Duration::from_millis)
    }

    pub fn sync_timeout(&self) -> Option<Duration> {
        self.sync_timeout_ms.map(Duration::from_millis)
    }
}

/// Which move-selection policy an agent runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Random,
    Scripted,
}

impl PolicyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Random => "random",
            PolicyKind::Scripted => "scripted",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(PolicyKind::Random),
            "scripted" => Ok(PolicyKind::Scripted),
            other => Err(format!("unknown strategy {other:?} (expected random or scripted)")),
        }
    }
}

/// What each remote game agent plays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub policy: PolicyKind,
    /// Seed for the random policy; unseeded when absent
    pub seed: Option<u64>,
    /// Coordinate-notation moves for the scripted policy
    pub script: Vec<String>,
    /// Plies to play per agent session
    pub max_moves: u32,
    pub move_delay_ms: u64,
    /// Autosave directory on the node, relative to its root
    pub autosave_dir: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Random,
            seed: None,
            script: Vec::new(),
            max_moves: 100,
            move_delay_ms: 200,
            autosave_dir: "chess_autosaves".to_string(),
        }
    }
}

impl AgentConfig {
    pub fn move_delay(&self) -> Duration {
        Duration::from_millis(self.move_delay_ms)
    }
}
