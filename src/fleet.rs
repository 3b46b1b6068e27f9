//! Fleet manager
//!
//! Owns the set of game nodes: provisions a node per game, deploys the agent
//! on it, and tracks each game through its lifecycle.
//!
//! ## Lifecycle
//!
//! ```text
//! provisioning ──► running ◄──► paused
//!       │             │           │
//!       │             └──► stopped ◄┘
//!       └──────────────► failed ◄── (health check exhausted / corrupt record)
//! ```
//!
//! Pause, resume and stop are idempotent: asking for the state a game is
//! already in succeeds without calling the provider.
//!
//! Entering `stopped` or `failed` fires the retire hook, which the binary
//! uses to end the game's poll task.
//!
//! ## Failure Isolation
//!
//! Remote calls are retried with bounded backoff. When a budget runs out
//! only that game is marked failed; the error is returned to the caller and
//! every other game carries on.

use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::agent::AgentArgs;
use crate::compute::{ComputeProvider, NodeHandle, NodeSpec, NodeStatus};
use crate::core::{AgentConfig, ComputeError, FleetConfig, FleetError, FleetResult, RetryConfig};
use crate::retry::{retry, CancellationToken, RetryFailure};

/// Fleet-side state of one game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Provisioning,
    Running,
    Paused,
    Stopped,
    Failed,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Provisioning => "provisioning",
            NodeState::Running => "running",
            NodeState::Paused => "paused",
            NodeState::Stopped => "stopped",
            NodeState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One tracked game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetEntry {
    pub game_id: String,
    pub handle: Option<NodeHandle>,
    pub state: NodeState,
    pub last_error: Option<String>,
    pub strategy: String,
}

/// Written next to the central mirror for every provisioned game
#[derive(Debug, Serialize)]
struct GameMetadata<'a> {
    instance_id: &'a str,
    game_id: &'a str,
    strategy: &'a str,
}

/// Called with the game id when a game is stopped or fails
pub type RetireHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Cloneable handle to the fleet
#[derive(Clone)]
pub struct FleetManager {
    provider: Arc<dyn ComputeProvider>,
    config: FleetConfig,
    entries: Arc<Mutex<BTreeMap<String, FleetEntry>>>,
    cancel: CancellationToken,
    on_retire: Option<RetireHook>,
}

impl FleetManager {
    pub fn new(provider: Arc<dyn ComputeProvider>, config: FleetConfig) -> Self {
        Self {
            provider,
            config,
            entries: Arc::new(Mutex::new(BTreeMap::new())),
            cancel: CancellationToken::new(),
            on_retire: None,
        }
    }

    pub fn with_retire_hook(mut self, hook: RetireHook) -> Self {
        self.on_retire = Some(hook);
        self
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn status(&self, game_id: &str) -> Option<FleetEntry> {
        self.entries.lock().get(game_id).cloned()
    }

    /// Every tracked game, ordered by game id
    pub fn list(&self) -> Vec<FleetEntry> {
        self.entries.lock().values().cloned().collect()
    }

    pub fn handle(&self, game_id: &str) -> Option<NodeHandle> {
        self.entries.lock().get(game_id).and_then(|e| e.handle.clone())
    }

    /// Record a game as failed with the reason
    pub fn mark_failed(&self, game_id: &str, reason: impl Into<String>) {
        let reason = reason.into();
        let known = match self.entries.lock().get_mut(game_id) {
            Some(entry) => {
                if entry.state != NodeState::Failed {
                    error!("[FLEET] Game {} failed: {}", game_id, reason);
                }
                entry.state = NodeState::Failed;
                entry.last_error = Some(reason);
                true
            }
            None => false,
        };
        if known {
            self.retire(game_id);
        }
    }

    fn set_state(&self, game_id: &str, state: NodeState, handle: Option<NodeHandle>) {
        let known = match self.entries.lock().get_mut(game_id) {
            Some(entry) => {
                entry.state = state;
                if handle.is_some() {
                    entry.handle = handle;
                }
                true
            }
            None => false,
        };
        if known && matches!(state, NodeState::Stopped | NodeState::Failed) {
            self.retire(game_id);
        }
    }

    /// Runs outside the entries lock so the hook may call back into the fleet
    fn retire(&self, game_id: &str) {
        if let Some(hook) = &self.on_retire {
            hook(game_id);
        }
    }

    fn provision_failed(&self, game_id: &str, failure: RetryFailure) -> FleetError {
        self.mark_failed(game_id, failure.error.to_string());
        FleetError::Provision {
            game_id: game_id.to_string(),
            attempts: failure.attempts,
            source: failure.error,
        }
    }

    /// Allocate a node, deploy the agent and wait until it reports running
    ///
    /// A game that is already tracked and not stopped or failed is rejected.
    pub async fn provision_and_start(
        &self,
        game_id: &str,
        agent: &AgentConfig,
    ) -> FleetResult<NodeHandle> {
        {
            let mut entries = self.entries.lock();
            if let Some(existing) = entries.get(game_id) {
                if !matches!(existing.state, NodeState::Stopped | NodeState::Failed) {
                    return Err(FleetError::AlreadyTracked(game_id.to_string()));
                }
            }
            entries.insert(
                game_id.to_string(),
                FleetEntry {
                    game_id: game_id.to_string(),
                    handle: None,
                    state: NodeState::Provisioning,
                    last_error: None,
                    strategy: agent.policy.to_string(),
                },
            );
        }
        info!("[FLEET] Provisioning game {}", game_id);

        let provider = &self.provider;
        let spec = &NodeSpec::for_game(game_id);
        let handle = retry(&self.config.retry, &self.cancel, "start", move |_| provider.start(spec))
            .await
            .map_err(|f| self.provision_failed(game_id, f))?;
        self.set_state(game_id, NodeState::Provisioning, Some(handle.clone()));

        if let Err(err) = self.deploy_and_confirm(game_id, &handle, agent).await {
            if let Err(e) = self.provider.stop(&handle).await {
                warn!("[FLEET] Could not stop node {} after failed deploy: {}", handle, e);
            }
            return Err(err);
        }

        if let Err(e) = self.write_metadata(game_id, &handle, agent).await {
            warn!("[FLEET] Could not write metadata for {}: {}", game_id, e);
        }
        self.set_state(game_id, NodeState::Running, None);
        info!("[FLEET] Game {} running on {}", game_id, handle);
        Ok(handle)
    }

    async fn deploy_and_confirm(
        &self,
        game_id: &str,
        handle: &NodeHandle,
        agent: &AgentConfig,
    ) -> FleetResult<()> {
        let retry_config = &self.config.retry;
        let provider = &self.provider;
        let command = &AgentArgs::from_config(game_id, agent).to_command_line();
        retry(retry_config, &self.cancel, "deploy", move |_| async move {
            let output = provider.exec(handle, command).await?;
            if output.success() {
                Ok(())
            } else {
                Err(ComputeError::Permanent(format!(
                    "agent launch exited with {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                )))
            }
        })
        .await
        .map_err(|f| self.provision_failed(game_id, f))?;

        let readiness = RetryConfig {
            max_attempts: retry_config.readiness_polls,
            ..retry_config.clone()
        };
        retry(&readiness, &self.cancel, "readiness", move |_| async move {
            match provider.status(handle).await? {
                NodeStatus::Running => Ok(()),
                other => Err(ComputeError::Transient(format!("node reports {other:?}"))),
            }
        })
        .await
        .map_err(|f| self.provision_failed(game_id, f))
    }

    async fn write_metadata(
        &self,
        game_id: &str,
        handle: &NodeHandle,
        agent: &AgentConfig,
    ) -> FleetResult<()> {
        let metadata = GameMetadata {
            instance_id: &handle.instance_id,
            game_id,
            strategy: agent.policy.as_str(),
        };
        let json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let path = self
            .config
            .work_dir
            .join(format!("metadata_game_id_{game_id}.json"));
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Provision several games concurrently
    pub async fn provision_all(
        &self,
        games: &[(String, AgentConfig)],
    ) -> Vec<(String, FleetResult<NodeHandle>)> {
        let starts = games.iter().map(move |(game_id, agent)| async move {
            (game_id.clone(), self.provision_and_start(game_id, agent).await)
        });
        join_all(starts).await
    }

    fn lifecycle_target(&self, game_id: &str, to: NodeState) -> FleetResult<Option<NodeHandle>> {
        let entries = self.entries.lock();
        let entry = entries
            .get(game_id)
            .ok_or_else(|| FleetError::UnknownGame(game_id.to_string()))?;
        if entry.state == to {
            return Ok(None);
        }
        let allowed = match to {
            NodeState::Paused => entry.state == NodeState::Running,
            NodeState::Running => entry.state == NodeState::Paused,
            NodeState::Stopped => matches!(entry.state, NodeState::Running | NodeState::Paused),
            NodeState::Provisioning | NodeState::Failed => false,
        };
        match (&entry.handle, allowed) {
            (Some(handle), true) => Ok(Some(handle.clone())),
            _ => Err(FleetError::InvalidTransition {
                game_id: game_id.to_string(),
                from: entry.state,
                to,
            }),
        }
    }

    async fn transition(&self, game_id: &str, to: NodeState) -> FleetResult<()> {
        let Some(handle) = self.lifecycle_target(game_id, to)? else {
            return Ok(());
        };
        let provider = &self.provider;
        let target = &handle;
        let label = to.to_string();
        retry(&self.config.retry, &self.cancel, &label, move |_| async move {
            match to {
                NodeState::Paused => provider.pause(target).await,
                NodeState::Running => provider.resume(target).await,
                _ => provider.stop(target).await,
            }
        })
        .await
        .map_err(|f| FleetError::Compute {
            game_id: game_id.to_string(),
            source: f.error,
        })?;
        self.set_state(game_id, to, None);
        info!("[FLEET] Game {} is now {}", game_id, to);
        Ok(())
    }

    pub async fn pause(&self, game_id: &str) -> FleetResult<()> {
        self.transition(game_id, NodeState::Paused).await
    }

    pub async fn resume(&self, game_id: &str) -> FleetResult<()> {
        self.transition(game_id, NodeState::Running).await
    }

    pub async fn stop(&self, game_id: &str) -> FleetResult<()> {
        self.transition(game_id, NodeState::Stopped).await
    }

    /// Ask the node for its status, with retries
    ///
    /// Exhausting the budget, or a node that reports stopped while the fleet
    /// believes it is live, marks the game failed.
    pub async fn health_check(&self, game_id: &str) -> FleetResult<NodeStatus> {
        let (handle, state) = {
            let entries = self.entries.lock();
            let entry = entries
                .get(game_id)
                .ok_or_else(|| FleetError::UnknownGame(game_id.to_string()))?;
            let handle = entry.handle.clone().ok_or_else(|| FleetError::InvalidTransition {
                game_id: game_id.to_string(),
                from: entry.state,
                to: NodeState::Running,
            })?;
            (handle, entry.state)
        };

        let provider = &self.provider;
        let target = &handle;
        let status = retry(&self.config.retry, &self.cancel, "health", move |_| {
            provider.status(target)
        })
        .await
        .map_err(|f| {
            self.mark_failed(game_id, format!("health check: {}", f.error));
            FleetError::HealthCheck {
                game_id: game_id.to_string(),
                source: f.error,
            }
        })?;

        if status == NodeStatus::Stopped
            && matches!(state, NodeState::Running | NodeState::Paused)
        {
            self.mark_failed(game_id, "node stopped unexpectedly");
        }
        Ok(status)
    }

    /// Tear down: cancel pending backoffs, then stop every live node unless
    /// `persist` is set
    pub async fn shutdown(&self, persist: bool) {
        self.cancel.cancel();
        if persist {
            info!("[FLEET] Leaving {} node(s) running", self.list().len());
            return;
        }
        let live: Vec<(String, NodeHandle)> = self
            .list()
            .into_iter()
            .filter(|e| matches!(e.state, NodeState::Running | NodeState::Paused))
            .filter_map(|e| e.handle.map(|h| (e.game_id, h)))
            .collect();

        let stops = live.iter().map(move |(game_id, handle)| async move {
            match self.provider.stop(handle).await {
                Ok(()) => self.set_state(game_id, NodeState::Stopped, None),
                Err(e) => warn!("[FLEET] Failed to stop {} ({}): {}", game_id, handle, e),
            }
        });
        join_all(stops).await;
        info!("[FLEET] Stopped {} node(s)", live.len());
    }
}
