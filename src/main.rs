//! chessfleet binary
//!
//! - `chessfleet run` provisions a fleet of game nodes on the in-process
//!   host, syncs them into the registry and prints a status table until the
//!   games finish, the time limit passes, or Ctrl-C.
//! - `chessfleet agent` is the per-node game process, the same command the
//!   fleet deploys.
//! - `chessfleet status` prints the central mirror of a previous run.

use anyhow::{Context, Result};
use chessfleet::agent::{AgentArgs, AgentSignal, GameAgent};
use chessfleet::core::{FleetConfig, PolicyKind};
use chessfleet::status::{render_boards, render_table};
use chessfleet::store::GameStore;
use chessfleet::{FleetManager, LocalCompute, SnapshotRegistry, Synchronizer};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chessfleet", version, about = "Distributed chess game fleet")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Provision games, sync them and print their status
    Run(RunArgs),
    /// Play a single game (the per-node process)
    Agent(AgentArgs),
    /// Print the central mirror of a previous run
    Status {
        #[arg(long, default_value = "chessfleet_work")]
        work_dir: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Number of games to run
    #[arg(long, default_value_t = 3)]
    games: usize,

    /// Overrides the configured policy
    #[arg(long)]
    strategy: Option<PolicyKind>,

    /// Overrides the configured plies per agent session
    #[arg(long)]
    moves: Option<u32>,

    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(long, default_value = "chessfleet.json")]
    config: PathBuf,

    /// Leave nodes running on exit
    #[arg(long)]
    persist: bool,

    /// Stop after this many seconds even if games are unfinished
    #[arg(long, default_value_t = 300)]
    duration_secs: u64,

    /// Print board diagrams with each status update
    #[arg(long)]
    boards: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Agent(args) => agent(args).await,
        Command::Status { work_dir } => status(work_dir),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = FleetConfig::load(&args.config);
    if let Some(strategy) = args.strategy {
        config.agent.policy = strategy;
    }
    if let Some(moves) = args.moves {
        config.agent.max_moves = moves;
    }
    if let Some(work_dir) = args.work_dir {
        config.work_dir = work_dir;
    }

    let provider = Arc::new(LocalCompute::new(config.nodes_dir()));
    let registry = SnapshotRegistry::new();
    let mirror = GameStore::open(config.mirror_dir())
        .with_context(|| format!("opening mirror at {:?}", config.mirror_dir()))?;
    let sync = Synchronizer::new(
        provider.clone(),
        registry.clone(),
        config.sync.clone(),
        config.agent.autosave_dir.clone(),
    )
    .with_mirror(mirror);
    let retired = sync.clone();
    let fleet = FleetManager::new(provider, config.clone()).with_retire_hook(Arc::new(
        move |game_id: &str| {
            retired.untrack(game_id);
        },
    ));
    let failure_fleet = fleet.clone();
    let sync = sync.with_failure_hook(Arc::new(move |game_id: &str, reason: &str| {
        failure_fleet.mark_failed(game_id, format!("corrupt record: {reason}"));
    }));

    let games: Vec<(String, _)> = (0..args.games)
        .map(|_| {
            let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
            (id, config.agent.clone())
        })
        .collect();
    info!("[FLEET] Starting {} game(s) with {} policy", games.len(), config.agent.policy);

    for (game_id, result) in fleet.provision_all(&games).await {
        match result {
            Ok(handle) => sync.spawn(&game_id, handle)?,
            Err(e) => warn!("[FLEET] {}", e),
        }
    }

    let reader = registry.reader();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.duration_secs);
    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("[FLEET] Interrupted");
                break;
            }
            _ = tokio::time::sleep_until(deadline) => {
                info!("[FLEET] Time limit reached");
                break;
            }
        }

        let live: Vec<String> = fleet
            .list()
            .into_iter()
            .filter(|e| e.state == chessfleet::NodeState::Running)
            .map(|e| e.game_id)
            .collect();
        let checks = join_all(live.iter().map(|game_id| fleet.health_check(game_id))).await;
        for e in checks.into_iter().filter_map(Result::err) {
            warn!("[FLEET] {}", e);
        }

        println!("{}", render_table(&reader, &fleet.list()));
        if args.boards {
            println!("{}", render_boards(&reader));
        }

        // Games whose poll task gave up count as done
        let tracked = sync.tracked();
        let all_done = !fleet.list().is_empty()
            && live.iter().all(|id| {
                reader.get(id).is_some_and(|snap| snap.is_terminal()) || !tracked.contains(id)
            });
        if all_done {
            info!("[FLEET] All games finished");
            break;
        }
    }

    sync.shutdown().await;
    fleet.shutdown(args.persist).await;
    println!("{}", render_table(&reader, &fleet.list()));
    Ok(())
}

async fn agent(args: AgentArgs) -> Result<()> {
    let (control, rx) = watch::channel(AgentSignal::Run);
    let root = std::env::current_dir().context("resolving working directory")?;
    let agent = GameAgent::from_args(&args, &root, rx)?;
    let game = tokio::spawn(agent.run());
    tokio::select! {
        finished = game => {
            let state = finished.context("agent task panicked")??;
            println!("{}", state.board());
            println!("Result: {}", state.result());
        }
        _ = tokio::signal::ctrl_c() => {
            control.send_replace(AgentSignal::Stop);
            info!("[AGENT] Interrupted; last saved position is kept");
        }
    }
    Ok(())
}

fn status(work_dir: PathBuf) -> Result<()> {
    let config = FleetConfig {
        work_dir,
        ..FleetConfig::default()
    };
    let store = GameStore::open(config.mirror_dir())?;
    for game_id in store.list_ids()? {
        match store.load(&game_id) {
            Ok(record) => println!(
                "{:<12} v{:<4} {:>4} plies  {}",
                game_id,
                record.version,
                record.moves.len(),
                record.result
            ),
            Err(e) => println!("{:<12} {}", game_id, e),
        }
    }
    Ok(())
}
