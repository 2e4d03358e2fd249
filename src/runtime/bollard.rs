// ABOUTME: Bollard-based container runtime adapter.
// ABOUTME: Talks to Docker or Podman over the Docker-compatible API, one call per member.

use crate::runtime::RuntimeError;
use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{ContainerError, ContainerOps, ContainerState};
use crate::types::{ContainerId, Signal};
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{
    InspectContainerOptions, KillContainerOptionsBuilder, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use std::time::Duration;

/// Seconds bollard waits on a single HTTP request before giving up.
const REQUEST_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn status_of(e: &bollard::errors::Error) -> Option<(u16, &str)> {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => Some((*status_code, message.as_str())),
        _ => None,
    }
}

fn map_start_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, msg)) => ContainerError::NotFound(msg.to_string()),
        Some((304, msg)) => ContainerError::AlreadyRunning(msg.to_string()),
        Some((409, msg)) => ContainerError::Paused(msg.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_stop_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, msg)) => ContainerError::NotFound(msg.to_string()),
        Some((304, msg)) => ContainerError::NotRunning(msg.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_signal_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, msg)) => ContainerError::NotFound(msg.to_string()),
        Some((409, msg)) => ContainerError::NotRunning(msg.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_unpause_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, msg)) => ContainerError::NotFound(msg.to_string()),
        Some((409, msg)) => ContainerError::NotPaused(msg.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_remove_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, msg)) => ContainerError::NotFound(msg.to_string()),
        Some((409, msg)) => ContainerError::InUse(msg.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, msg)) => ContainerError::NotFound(msg.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime adapter using bollard.
///
/// Works against both Docker and Podman through the Docker-compatible API.
pub struct BollardRuntime {
    client: Docker,
}

impl BollardRuntime {
    /// Wrap an existing Docker client.
    pub fn new(client: Docker) -> Self {
        Self { client }
    }

    /// Connect to an explicit unix socket.
    ///
    /// No request is made until the first operation, so this succeeds even
    /// when the daemon is down.
    pub fn connect(socket_path: &str) -> Result<Self, RuntimeError> {
        let client = Docker::connect_with_unix(
            socket_path,
            REQUEST_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| RuntimeError::Connection {
            message: format!("{socket_path}: {e}"),
        })?;
        Ok(Self::new(client))
    }

    /// Connect using `DOCKER_HOST` or the platform default socket.
    pub fn connect_local() -> Result<Self, RuntimeError> {
        let client = Docker::connect_with_local_defaults().map_err(|e| {
            RuntimeError::Connection {
                message: e.to_string(),
            }
        })?;
        Ok(Self::new(client))
    }
}

impl Sealed for BollardRuntime {}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(map_start_error)
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs().min(i32::MAX as u64) as i32),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(map_stop_error)
    }

    async fn kill_container(
        &self,
        id: &ContainerId,
        signal: Signal,
    ) -> Result<(), ContainerError> {
        let opts = KillContainerOptionsBuilder::default()
            .signal(&signal.to_string())
            .build();

        self.client
            .kill_container(id.as_str(), Some(opts))
            .await
            .map_err(map_signal_error)
    }

    async fn pause_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .pause_container(id.as_str())
            .await
            .map_err(map_signal_error)
    }

    async fn unpause_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .unpause_container(id.as_str())
            .await
            .map_err(map_unpause_error)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_remove_error)
    }

    async fn container_state(&self, id: &ContainerId) -> Result<ContainerState, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_not_found_error)?;

        let state = details
            .state
            .as_ref()
            .and_then(|s| s.status)
            .map(|s| match s {
                bollard::models::ContainerStateStatusEnum::CREATED => ContainerState::Created,
                bollard::models::ContainerStateStatusEnum::RUNNING => ContainerState::Running,
                bollard::models::ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
                bollard::models::ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
                bollard::models::ContainerStateStatusEnum::REMOVING => ContainerState::Removing,
                bollard::models::ContainerStateStatusEnum::EXITED => ContainerState::Exited,
                bollard::models::ContainerStateStatusEnum::DEAD => ContainerState::Dead,
                _ => ContainerState::Exited,
            })
            .unwrap_or(ContainerState::Exited);

        Ok(state)
    }
}
