// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: Single-container start, stop, kill, pause, unpause, remove, and inspect.

use super::sealed::Sealed;
use crate::types::{ContainerId, Signal};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Per-container lifecycle operations.
///
/// One call performs one transition on one container. Pod-level sequencing,
/// concurrency and aggregation live above this trait.
#[async_trait]
pub trait ContainerOps: Sealed + Send + Sync {
    /// Start a created or stopped container.
    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Stop a running container, waiting up to `timeout` before killing it.
    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError>;

    /// Send a signal to a running container.
    async fn kill_container(&self, id: &ContainerId, signal: Signal)
    -> Result<(), ContainerError>;

    /// Freeze all processes in a running container.
    async fn pause_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Thaw a paused container.
    async fn unpause_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Remove a container.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;

    /// Current runtime state of a container.
    async fn container_state(&self, id: &ContainerId) -> Result<ContainerState, ContainerError>;
}

/// The single-container action a plan step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerAction {
    Start,
    Stop,
    Kill,
    Pause,
    Unpause,
    Remove,
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContainerAction::Start => "start",
            ContainerAction::Stop => "stop",
            ContainerAction::Kill => "kill",
            ContainerAction::Pause => "pause",
            ContainerAction::Unpause => "unpause",
            ContainerAction::Remove => "remove",
        };
        f.write_str(s)
    }
}

/// Container state as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

/// Errors from container operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("container is paused: {0}")]
    Paused(String),

    #[error("container is not paused: {0}")]
    NotPaused(String),

    #[error("container is in use: {0}")]
    InUse(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
