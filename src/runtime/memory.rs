// ABOUTME: In-memory container runtime with fault and latency injection.
// ABOUTME: Mirrors Docker state rules; used by the test suite and dry runs.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{ContainerAction, ContainerError, ContainerOps, ContainerState};
use crate::types::{ContainerId, Signal};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Default)]
struct Inner {
    containers: HashMap<ContainerId, ContainerState>,
    faults: HashMap<(ContainerId, ContainerAction), String>,
    delays: HashMap<ContainerId, Duration>,
    signals: HashMap<ContainerId, Signal>,
    calls: Vec<(ContainerAction, ContainerId)>,
    in_flight: usize,
    max_in_flight: usize,
}

/// A container runtime that lives entirely in process memory.
///
/// State transitions follow the Docker API rules (starting a running container
/// fails, removing a running one needs force, and so on). Faults registered
/// with [`MemoryRuntime::fail_on`] make a specific action on a specific
/// container fail until cleared, and [`MemoryRuntime::delay`] makes every call
/// on a container sleep first.
#[derive(Default)]
pub struct MemoryRuntime {
    inner: Mutex<Inner>,
}

/// Decrements the in-flight counter even when the call is dropped mid-sleep.
struct InFlight<'a>(&'a Mutex<Inner>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.lock().in_flight -= 1;
    }
}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a container in the given state.
    pub fn add_container(&self, id: &str, state: ContainerState) -> ContainerId {
        let id = ContainerId::new(id);
        self.inner.lock().containers.insert(id.clone(), state);
        id
    }

    /// Force a container into a state, as if changed outside the pod core.
    pub fn set_state(&self, id: &ContainerId, state: ContainerState) {
        self.inner.lock().containers.insert(id.clone(), state);
    }

    /// Current state, or `None` if the container does not exist.
    pub fn state_of(&self, id: &ContainerId) -> Option<ContainerState> {
        self.inner.lock().containers.get(id).copied()
    }

    /// Make `action` on `id` fail with a runtime error until cleared.
    pub fn fail_on(&self, id: &ContainerId, action: ContainerAction, message: &str) {
        self.inner
            .lock()
            .faults
            .insert((id.clone(), action), message.to_string());
    }

    pub fn clear_fault(&self, id: &ContainerId, action: ContainerAction) {
        self.inner.lock().faults.remove(&(id.clone(), action));
    }

    /// Make every call on `id` sleep for `duration` before taking effect.
    pub fn delay(&self, id: &ContainerId, duration: Duration) {
        self.inner.lock().delays.insert(id.clone(), duration);
    }

    /// Every mutating call received so far, in arrival order.
    pub fn calls(&self) -> Vec<(ContainerAction, ContainerId)> {
        self.inner.lock().calls.clone()
    }

    /// Signal most recently delivered to a container by `kill_container`.
    pub fn last_signal(&self, id: &ContainerId) -> Option<Signal> {
        self.inner.lock().signals.get(id).copied()
    }

    /// Highest number of mutating calls that were in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.inner.lock().max_in_flight
    }

    async fn apply<F>(
        &self,
        id: &ContainerId,
        action: ContainerAction,
        transition: F,
    ) -> Result<(), ContainerError>
    where
        F: FnOnce(ContainerState) -> Result<Option<ContainerState>, ContainerError>,
    {
        let delay = {
            let mut inner = self.inner.lock();
            inner.calls.push((action, id.clone()));
            inner.in_flight += 1;
            inner.max_in_flight = inner.max_in_flight.max(inner.in_flight);
            inner.delays.get(id).copied()
        };
        let _in_flight = InFlight(&self.inner);

        match delay {
            Some(d) => tokio::time::sleep(d).await,
            None => tokio::task::yield_now().await,
        }

        let mut inner = self.inner.lock();
        if let Some(message) = inner.faults.get(&(id.clone(), action)) {
            return Err(ContainerError::Runtime(message.clone()));
        }

        let current = *inner
            .containers
            .get(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;

        match transition(current)? {
            Some(next) => {
                inner.containers.insert(id.clone(), next);
            }
            None => {
                inner.containers.remove(id);
            }
        }
        Ok(())
    }
}

fn is_active(state: ContainerState) -> bool {
    matches!(
        state,
        ContainerState::Running | ContainerState::Paused | ContainerState::Restarting
    )
}

impl Sealed for MemoryRuntime {}

#[async_trait]
impl ContainerOps for MemoryRuntime {
    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let name = id.to_string();
        self.apply(id, ContainerAction::Start, |state| match state {
            ContainerState::Running | ContainerState::Restarting => {
                Err(ContainerError::AlreadyRunning(name))
            }
            ContainerState::Paused => Err(ContainerError::Paused(name)),
            _ => Ok(Some(ContainerState::Running)),
        })
        .await
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        _timeout: Duration,
    ) -> Result<(), ContainerError> {
        let name = id.to_string();
        self.apply(id, ContainerAction::Stop, |state| {
            if is_active(state) {
                Ok(Some(ContainerState::Exited))
            } else {
                Err(ContainerError::NotRunning(name))
            }
        })
        .await
    }

    async fn kill_container(
        &self,
        id: &ContainerId,
        signal: Signal,
    ) -> Result<(), ContainerError> {
        let name = id.to_string();
        self.apply(id, ContainerAction::Kill, |state| {
            if is_active(state) {
                Ok(Some(ContainerState::Exited))
            } else {
                Err(ContainerError::NotRunning(name))
            }
        })
        .await?;
        self.inner.lock().signals.insert(id.clone(), signal);
        Ok(())
    }

    async fn pause_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let name = id.to_string();
        self.apply(id, ContainerAction::Pause, |state| match state {
            ContainerState::Running => Ok(Some(ContainerState::Paused)),
            _ => Err(ContainerError::NotRunning(name)),
        })
        .await
    }

    async fn unpause_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let name = id.to_string();
        self.apply(id, ContainerAction::Unpause, |state| match state {
            ContainerState::Paused => Ok(Some(ContainerState::Running)),
            _ => Err(ContainerError::NotPaused(name)),
        })
        .await
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let name = id.to_string();
        self.apply(id, ContainerAction::Remove, |state| {
            if is_active(state) && !force {
                Err(ContainerError::InUse(name))
            } else {
                Ok(None)
            }
        })
        .await
    }

    async fn container_state(&self, id: &ContainerId) -> Result<ContainerState, ContainerError> {
        self.state_of(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))
    }
}
