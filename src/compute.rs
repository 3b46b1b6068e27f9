//! Compute provider contract and the in-process provider
//!
//! [`ComputeProvider`] is everything the fleet manager and the synchronizer
//! need from a node host: lifecycle calls, command execution and file
//! access. Every call can fail with a [`ComputeError`] whose
//! [`is_retryable`](ComputeError::is_retryable) decides whether the caller
//! backs off and tries again.
//!
//! [`LocalCompute`] hosts nodes in this process. A node is a directory under
//! the provider root; executing the agent launch command spawns a
//! [`GameAgent`] task rooted there. Pausing a node pauses its agent and makes
//! its files unreadable (a paused machine does not answer), which is how
//! remote hosts behave too.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::agent::{AgentArgs, AgentSignal, GameAgent};
use crate::core::{ComputeError, ComputeResult};

/// What to start
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Game the node will host, used for naming and logs
    pub game_id: String,
    pub labels: BTreeMap<String, String>,
}

impl NodeSpec {
    pub fn for_game(game_id: &str) -> Self {
        Self {
            game_id: game_id.to_string(),
            labels: BTreeMap::new(),
        }
    }
}

/// Opaque reference to a started node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle {
    pub instance_id: String,
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.instance_id)
    }
}

/// Result of running a command on a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Node state as reported by its host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Starting,
    Running,
    Paused,
    Stopped,
}

/// Host of remote game nodes
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    async fn start(&self, spec: &NodeSpec) -> ComputeResult<NodeHandle>;

    async fn stop(&self, handle: &NodeHandle) -> ComputeResult<()>;

    async fn pause(&self, handle: &NodeHandle) -> ComputeResult<()>;

    async fn resume(&self, handle: &NodeHandle) -> ComputeResult<()>;

    async fn exec(&self, handle: &NodeHandle, command: &str) -> ComputeResult<ExecOutput>;

    /// Read a file relative to the node root
    async fn read_file(&self, handle: &NodeHandle, path: &str) -> ComputeResult<Vec<u8>>;

    async fn write_file(&self, handle: &NodeHandle, path: &str, bytes: &[u8]) -> ComputeResult<()>;

    /// Health check
    async fn status(&self, handle: &NodeHandle) -> ComputeResult<NodeStatus>;
}

struct LocalNode {
    root: PathBuf,
    status: NodeStatus,
    control: watch::Sender<AgentSignal>,
    agent: Option<JoinHandle<()>>,
}

/// In-process provider: nodes are directories plus tokio tasks
#[derive(Clone)]
pub struct LocalCompute {
    root: PathBuf,
    nodes: Arc<Mutex<HashMap<String, LocalNode>>>,
}

impl LocalCompute {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            nodes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory backing a node, if it exists
    pub fn node_root(&self, handle: &NodeHandle) -> Option<PathBuf> {
        self.nodes
            .lock()
            .get(&handle.instance_id)
            .map(|node| node.root.clone())
    }

    fn with_node<T>(
        &self,
        handle: &NodeHandle,
        f: impl FnOnce(&mut LocalNode) -> ComputeResult<T>,
    ) -> ComputeResult<T> {
        let mut nodes = self.nodes.lock();
        let node = nodes
            .get_mut(&handle.instance_id)
            .ok_or_else(|| ComputeError::NotFound(format!("node {handle}")))?;
        f(node)
    }

    /// Resolve a node-relative path; paused or stopped nodes do not answer
    fn readable_path(&self, handle: &NodeHandle, path: &str) -> ComputeResult<PathBuf> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ComputeError::Permanent(format!("path {path:?} escapes node root")));
        }
        self.with_node(handle, |node| match node.status {
            NodeStatus::Running | NodeStatus::Starting => Ok(node.root.join(relative)),
            NodeStatus::Paused => Err(ComputeError::Transient(format!("node {handle} is paused"))),
            NodeStatus::Stopped => Err(ComputeError::Transient(format!("node {handle} is stopped"))),
        })
    }

    fn spawn_agent(&self, handle: &NodeHandle, args: AgentArgs) -> ComputeResult<ExecOutput> {
        self.with_node(handle, |node| {
            if node.status == NodeStatus::Stopped {
                return Err(ComputeError::Permanent(format!("node {handle} is stopped")));
            }
            if node.agent.as_ref().is_some_and(|task| !task.is_finished()) {
                return Ok(ExecOutput {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: format!("an agent is already running on {handle}"),
                });
            }
            let agent = GameAgent::from_args(&args, &node.root, node.control.subscribe())
                .map_err(|e| ComputeError::Permanent(e.to_string()))?;
            let game_id = args.game_id.clone();
            node.agent = Some(tokio::spawn(async move {
                if let Err(e) = agent.run().await {
                    error!("[AGENT] Game {} stopped with error: {}", game_id, e);
                }
            }));
            Ok(ExecOutput {
                exit_code: 0,
                stdout: format!("agent started for game {}\n", args.game_id),
                stderr: String::new(),
            })
        })
    }
}

#[async_trait]
impl ComputeProvider for LocalCompute {
    async fn start(&self, spec: &NodeSpec) -> ComputeResult<NodeHandle> {
        let short = uuid::Uuid::new_v4().simple().to_string();
        let instance_id = format!("local-{}", &short[..8]);
        let root = self.root.join(&instance_id);
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| ComputeError::Transient(format!("create {root:?}: {e}")))?;

        let (control, _) = watch::channel(AgentSignal::Run);
        self.nodes.lock().insert(
            instance_id.clone(),
            LocalNode {
                root,
                status: NodeStatus::Running,
                control,
                agent: None,
            },
        );
        info!("[COMPUTE] Started node {} for game {}", instance_id, spec.game_id);
        Ok(NodeHandle { instance_id })
    }

    async fn stop(&self, handle: &NodeHandle) -> ComputeResult<()> {
        self.with_node(handle, |node| {
            node.status = NodeStatus::Stopped;
            node.control.send_replace(AgentSignal::Stop);
            Ok(())
        })
    }

    async fn pause(&self, handle: &NodeHandle) -> ComputeResult<()> {
        self.with_node(handle, |node| match node.status {
            NodeStatus::Stopped => Err(ComputeError::Permanent(format!("node {handle} is stopped"))),
            _ => {
                node.status = NodeStatus::Paused;
                node.control.send_replace(AgentSignal::Pause);
                Ok(())
            }
        })
    }

    async fn resume(&self, handle: &NodeHandle) -> ComputeResult<()> {
        self.with_node(handle, |node| match node.status {
            NodeStatus::Stopped => Err(ComputeError::Permanent(format!("node {handle} is stopped"))),
            _ => {
                node.status = NodeStatus::Running;
                node.control.send_replace(AgentSignal::Run);
                Ok(())
            }
        })
    }

    async fn exec(&self, handle: &NodeHandle, command: &str) -> ComputeResult<ExecOutput> {
        match AgentArgs::parse_command_line(command) {
            Some(Ok(args)) => self.spawn_agent(handle, args),
            Some(Err(e)) => Ok(ExecOutput {
                exit_code: 2,
                stdout: String::new(),
                stderr: e.to_string(),
            }),
            None => {
                warn!("[COMPUTE] Unsupported command on {}: {}", handle, command);
                Ok(ExecOutput {
                    exit_code: 127,
                    stdout: String::new(),
                    stderr: format!("command not found: {command}"),
                })
            }
        }
    }

    async fn read_file(&self, handle: &NodeHandle, path: &str) -> ComputeResult<Vec<u8>> {
        let full = self.readable_path(handle, path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ComputeError::NotFound(format!("{path} on {handle}")))
            }
            Err(e) => Err(ComputeError::Transient(format!("read {path} on {handle}: {e}"))),
        }
    }

    async fn write_file(&self, handle: &NodeHandle, path: &str, bytes: &[u8]) -> ComputeResult<()> {
        let full = self.readable_path(handle, path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ComputeError::Transient(format!("create {parent:?}: {e}")))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| ComputeError::Transient(format!("write {path} on {handle}: {e}")))
    }

    async fn status(&self, handle: &NodeHandle) -> ComputeResult<NodeStatus> {
        self.with_node(handle, |node| Ok(node.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_paused_node_does_not_answer_reads() {
        let dir = tempfile::tempdir().unwrap();
        let compute = LocalCompute::new(dir.path());
        let handle = compute.start(&NodeSpec::for_game("g")).await.unwrap();
        compute.write_file(&handle, "a/b.txt", b"hi").await.unwrap();
        assert_eq!(compute.read_file(&handle, "a/b.txt").await.unwrap(), b"hi");

        compute.pause(&handle).await.unwrap();
        let err = compute.read_file(&handle, "a/b.txt").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(compute.status(&handle).await.unwrap(), NodeStatus::Paused);

        compute.resume(&handle).await.unwrap();
        assert!(compute.read_file(&handle, "a/b.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_file_and_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let compute = LocalCompute::new(dir.path());
        let handle = compute.start(&NodeSpec::for_game("g")).await.unwrap();
        assert!(matches!(
            compute.read_file(&handle, "nope.json").await,
            Err(ComputeError::NotFound(_))
        ));
        assert!(matches!(
            compute.read_file(&handle, "../x").await,
            Err(ComputeError::Permanent(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_command_exits_127() {
        let dir = tempfile::tempdir().unwrap();
        let compute = LocalCompute::new(dir.path());
        let handle = compute.start(&NodeSpec::for_game("g")).await.unwrap();
        let out = compute.exec(&handle, "rm -rf /").await.unwrap();
        assert_eq!(out.exit_code, 127);
        assert!(!out.success());
    }

    #[tokio::test]
    async fn test_unknown_handle_is_not_found() {
        let compute = LocalCompute::new("unused");
        let ghost = NodeHandle {
            instance_id: "ghost".into(),
        };
        assert!(matches!(compute.status(&ghost).await, Err(ComputeError::NotFound(_))));
    }
}
