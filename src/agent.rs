//! Remote game agent
//!
//! The process that plays one game on a node: load the autosave if there is
//! one, otherwise start fresh, then choose, submit and save one ply at a time
//! until the game ends or the session's move budget is spent. The record is
//! saved after every ply, and the agent is its only writer. Store calls touch
//! the filesystem, so they run on the blocking pool.
//!
//! ## Control
//!
//! A [`watch`] channel of [`AgentSignal`] pauses, resumes and stops the loop.
//! The agent checks it before every ply and while sleeping between plies.
//!
//! ## Launch Command
//!
//! Nodes start an agent with a command line built by
//! [`AgentArgs::to_command_line`], for example
//! `chessfleet agent --game-id 3f2a9c1e --strategy random --moves 100`. The
//! binary and [`crate::compute::LocalCompute`] parse the same arguments.

use chess_engine::{serialize, GameState};
use clap::Parser;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::{AgentConfig, AgentError, PolicyKind, StoreError};
use crate::policy::{policy_from_config, MovePolicy, PolicyDecision};
use crate::store::GameStore;

/// Run-state requested of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentSignal {
    Run,
    Pause,
    Stop,
}

/// Arguments of the agent launch command
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "agent", about = "Play one game and autosave it after every move")]
pub struct AgentArgs {
    /// Game to create or resume
    #[arg(long)]
    pub game_id: String,

    /// Move-selection policy
    #[arg(long, default_value = "random")]
    pub strategy: PolicyKind,

    /// Plies to play this session
    #[arg(long, default_value_t = 100)]
    pub moves: u32,

    /// Directory holding game_id_<id>.json
    #[arg(long, default_value = "chess_autosaves")]
    pub autosave_dir: PathBuf,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Comma-separated moves for the scripted strategy
    #[arg(long, value_delimiter = ',')]
    pub script: Vec<String>,

    #[arg(long, default_value_t = 200)]
    pub move_delay_ms: u64,
}

impl AgentArgs {
    pub fn from_config(game_id: &str, config: &AgentConfig) -> Self {
        Self {
            game_id: game_id.to_string(),
            strategy: config.policy,
            moves: config.max_moves,
            autosave_dir: PathBuf::from(&config.autosave_dir),
            seed: config.seed,
            script: config.script.clone(),
            move_delay_ms: config.move_delay_ms,
        }
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            policy: self.strategy,
            seed: self.seed,
            script: self.script.clone(),
            max_moves: self.moves,
            move_delay_ms: self.move_delay_ms,
            autosave_dir: self.autosave_dir.to_string_lossy().into_owned(),
        }
    }

    /// Render as the command a node executes
    pub fn to_command_line(&self) -> String {
        let mut parts = vec![
            "chessfleet".to_string(),
            "agent".to_string(),
            format!("--game-id {}", self.game_id),
            format!("--strategy {}", self.strategy),
            format!("--moves {}", self.moves),
            format!("--autosave-dir {}", self.autosave_dir.display()),
            format!("--move-delay-ms {}", self.move_delay_ms),
        ];
        if let Some(seed) = self.seed {
            parts.push(format!("--seed {seed}"));
        }
        if !self.script.is_empty() {
            parts.push(format!("--script {}", self.script.join(",")));
        }
        parts.join(" ")
    }

    /// Parse a command produced by [`to_command_line`](Self::to_command_line)
    ///
    /// Returns `None` when the command is not an agent launch at all.
    pub fn parse_command_line(command: &str) -> Option<Result<Self, clap::Error>> {
        let words: Vec<&str> = command.split_whitespace().collect();
        match words.as_slice() {
            ["chessfleet", "agent", ..] => Some(Self::try_parse_from(words[1..].iter().copied())),
            _ => None,
        }
    }
}

/// Plays one game
pub struct GameAgent {
    game_id: String,
    store: Arc<Mutex<GameStore>>,
    policy: Box<dyn MovePolicy>,
    max_moves: u32,
    move_delay: Duration,
    control: watch::Receiver<AgentSignal>,
}

impl GameAgent {
    pub fn new(
        game_id: impl Into<String>,
        store: GameStore,
        policy: Box<dyn MovePolicy>,
        config: &AgentConfig,
        control: watch::Receiver<AgentSignal>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            store: Arc::new(Mutex::new(store)),
            policy,
            max_moves: config.max_moves,
            move_delay: config.move_delay(),
            control,
        }
    }

    /// Build an agent from its launch arguments, rooted at `node_root`
    pub fn from_args(
        args: &AgentArgs,
        node_root: &Path,
        control: watch::Receiver<AgentSignal>,
    ) -> Result<Self, StoreError> {
        let config = args.agent_config();
        let store = GameStore::open(node_root.join(&args.autosave_dir))?;
        Ok(Self::new(
            args.game_id.clone(),
            store,
            policy_from_config(&config),
            &config,
            control,
        ))
    }

    /// Play until the game ends, the budget is spent, or a stop arrives
    pub async fn run(mut self) -> Result<GameState, AgentError> {
        let store = self.store.clone();
        let game_id = self.game_id.clone();
        let loaded = with_store(&store, move |store| store.load_state(&game_id)).await;
        let mut state = match loaded {
            Ok(state) => {
                info!(
                    "[AGENT] Resuming game {} at ply {} (v{})",
                    self.game_id,
                    state.moves().len(),
                    state.version()
                );
                state
            }
            Err(AgentError::Store(StoreError::NotFound { .. })) => {
                info!(
                    "[AGENT] Starting game {} with {} policy",
                    self.game_id,
                    self.policy.name()
                );
                GameState::new(self.game_id.clone()).with_strategy(self.policy.name())
            }
            Err(e) => return Err(e),
        };
        save(&store, &mut state).await?;

        let mut played = 0;
        while !state.is_terminated() && played < self.max_moves {
            if !self.wait_until_running().await {
                info!("[AGENT] Stop requested for {} after {} plies", self.game_id, played);
                return Ok(state);
            }

            let legal = state.legal_moves();
            match self.policy.choose_move(&state, &legal) {
                PolicyDecision::Play(mv) => {
                    state.submit_move(mv)?;
                    debug!("[AGENT] {} played {}", self.game_id, mv);
                }
                PolicyDecision::Resign => {
                    let side = state.side_to_move();
                    state.resign(side)?;
                    info!("[AGENT] {} resigned game {}", side, self.game_id);
                }
            }
            played += 1;
            save(&store, &mut state).await?;

            if !state.is_terminated() && !self.move_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.move_delay) => {}
                    changed = self.control.changed() => {
                        if changed.is_err() {
                            warn!("[AGENT] Control channel for {} closed", self.game_id);
                        }
                    }
                }
            }
        }

        info!(
            "[AGENT] Game {} finished session: {} after {} plies",
            self.game_id,
            state.result(),
            state.moves().len()
        );
        Ok(state)
    }

    /// Block while paused; `false` means stop
    async fn wait_until_running(&mut self) -> bool {
        loop {
            let signal = *self.control.borrow_and_update();
            match signal {
                AgentSignal::Run => return true,
                AgentSignal::Stop => return false,
                AgentSignal::Pause => {}
            }
            if self.control.changed().await.is_err() {
                return false;
            }
        }
    }
}

async fn save(store: &Arc<Mutex<GameStore>>, state: &mut GameState) -> Result<(), AgentError> {
    let record = serialize(state);
    let version = with_store(store, move |store| store.save(record)).await?;
    state.mark_saved(version);
    Ok(())
}

/// Run a store call on the blocking pool
async fn with_store<T, F>(store: &Arc<Mutex<GameStore>>, call: F) -> Result<T, AgentError>
where
    F: FnOnce(&mut GameStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    let result = tokio::task::spawn_blocking(move || call(&mut store.lock())).await?;
    Ok(result?)
}
