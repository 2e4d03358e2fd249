// ABOUTME: Entry point for pod commands: validation, lookup, locking, dispatch.
// ABOUTME: Also hosts the query side (inspect, exists, list) and prune.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::runtime::ContainerOps;
use crate::types::PodId;

use super::command::{Defaults, PodCommand, Transition};
use super::coordinator::{Coordinator, Limits};
use super::error::PodError;
use super::filter::PodFilter;
use super::machine::{self, Decision, ShortCircuit};
use super::outcome::{Outcome, Payload, PruneFailure, PruneReport};
use super::record::{MemberSpec, PodSpec};
use super::registry::PodRegistry;

/// Tunables for a [`PodService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub defaults: Defaults,
    pub limits: Limits,
    /// Pods removed at once by prune.
    pub max_parallel_pods: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            limits: Limits::default(),
            max_parallel_pods: 4,
        }
    }
}

/// A request to the pod core.
#[derive(Debug, Clone)]
pub enum Command {
    Create(PodSpec),
    Attach { pod: String, member: MemberSpec },
    Lifecycle { pod: String, command: PodCommand },
    Inspect { pod: String },
    Exists { pod: String },
    List(PodFilter),
    Prune,
}

pub struct PodService<R> {
    registry: Arc<PodRegistry>,
    coordinator: Coordinator<R>,
    options: ServiceOptions,
    cancel: CancellationToken,
}

impl<R: ContainerOps> PodService<R> {
    pub fn new(runtime: Arc<R>, registry: Arc<PodRegistry>, options: ServiceOptions) -> Self {
        Self {
            coordinator: Coordinator::new(runtime, Arc::clone(&registry), options.limits),
            registry,
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &PodRegistry {
        &self.registry
    }

    /// Token cancelled by [`PodService::cancel_all`]. Every operation runs
    /// under a child of it.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stop dispatching member calls in every running and future operation.
    pub fn cancel_all(&self) {
        tracing::warn!("cancelling pod operations");
        self.cancel.cancel();
    }

    pub async fn dispatch(&self, command: Command) -> Result<Outcome, PodError> {
        match command {
            Command::Create(spec) => self.create(spec).await,
            Command::Attach { pod, member } => self.attach(&pod, member).await,
            Command::Lifecycle { pod, command } => self.apply(&pod, command).await,
            Command::Inspect { pod } => self.inspect(&pod),
            Command::Exists { pod } => self.exists(&pod),
            Command::List(filter) => Ok(self.list(&filter)),
            Command::Prune => Ok(self.prune().await),
        }
    }

    /// Register a pod and read its members' current states.
    pub async fn create(&self, spec: PodSpec) -> Result<Outcome, PodError> {
        let created = self.registry.create(spec)?;
        let (guard, mut pod) = self.registry.lock(created.id()).await?;
        self.coordinator.refresh(&mut pod).await;
        let id = pod.id().clone();
        self.registry.commit(&guard, pod)?;
        Ok(Outcome::success(Payload::Id(id)))
    }

    /// Add a container to an existing pod.
    pub async fn attach(&self, identifier: &str, member: MemberSpec) -> Result<Outcome, PodError> {
        let found = self.registry.resolve(identifier)?;
        let (guard, _) = self.registry.lock(found.id()).await?;
        let mut pod = self.registry.attach(&guard, found.id(), member)?;
        self.coordinator.refresh(&mut pod).await;
        let snapshot = pod.snapshot();
        self.registry.commit(&guard, pod)?;
        Ok(Outcome::success(Payload::Snapshot(snapshot)))
    }

    /// Apply a lifecycle command to the pod named by `identifier`.
    pub async fn apply(&self, identifier: &str, command: PodCommand) -> Result<Outcome, PodError> {
        self.apply_with(identifier, command, &self.cancel.child_token())
            .await
    }

    /// Like [`PodService::apply`], cancellable through `cancel` as well.
    pub async fn apply_with(
        &self,
        identifier: &str,
        command: PodCommand,
        cancel: &CancellationToken,
    ) -> Result<Outcome, PodError> {
        let transition = command.validate(&self.options.defaults)?;
        let pod = self.registry.resolve(identifier)?;
        tracing::debug!(pod = %pod.id().short(), command = command.name(), "applying command");
        self.run(pod.id(), transition, cancel).await
    }

    async fn run(
        &self,
        id: &PodId,
        transition: Transition,
        cancel: &CancellationToken,
    ) -> Result<Outcome, PodError> {
        let (guard, mut pod) = self.registry.lock(id).await?;
        self.coordinator.refresh(&mut pod).await;

        match machine::decide(&pod, &transition) {
            Decision::Proceed(plan) => self.coordinator.execute(&guard, pod, plan, cancel).await,
            Decision::ShortCircuit(ShortCircuit::NoOp) => {
                let state = self.registry.commit(&guard, pod)?;
                tracing::info!(pod = %id.short(), state = %state, "pod already in requested state");
                Ok(Outcome::NoOp {
                    pod: id.clone(),
                    state,
                })
            }
            Decision::ShortCircuit(ShortCircuit::Conflict(reason)) => {
                let name = pod.name().clone();
                self.registry.commit(&guard, pod)?;
                Err(PodError::conflict(name, reason))
            }
        }
    }

    pub fn inspect(&self, identifier: &str) -> Result<Outcome, PodError> {
        let pod = self.registry.resolve(identifier)?;
        Ok(Outcome::success(Payload::Snapshot(pod.snapshot())))
    }

    pub fn exists(&self, identifier: &str) -> Result<Outcome, PodError> {
        let pod = self.registry.resolve(identifier)?;
        Ok(Outcome::success(Payload::Id(pod.id().clone())))
    }

    pub fn list(&self, filter: &PodFilter) -> Outcome {
        let pods = self
            .registry
            .list(|pod| filter.matches(pod))
            .iter()
            .map(|pod| pod.snapshot())
            .collect();
        Outcome::success(Payload::Pods(pods))
    }

    /// Remove every pod with no running or paused member.
    ///
    /// Each pod goes through the normal locked remove, so a pod that started
    /// in the meantime is reported as a conflict rather than removed.
    pub async fn prune(&self) -> Outcome {
        let candidates = self.registry.list(|pod| !pod.has_active_members());
        let remove = Transition::Remove {
            force: false,
            timeout: self.options.defaults.stop_timeout,
        };

        let results: Vec<_> = stream::iter(candidates)
            .map(|pod| async move {
                let cancel = self.cancel.child_token();
                let result = self.run(pod.id(), remove, &cancel).await;
                (pod.id().clone(), result)
            })
            .buffered(self.options.max_parallel_pods.max(1))
            .collect()
            .await;

        let mut report = PruneReport::default();
        for (pod, result) in results {
            match result {
                Ok(Outcome::Success { .. }) => report.removed.push(pod),
                Ok(outcome) => {
                    let message = match outcome.report() {
                        Some(group) => group.to_string(),
                        None => "pod was not removed".to_string(),
                    };
                    report.failures.push(PruneFailure {
                        pod,
                        kind: outcome.kind(),
                        message,
                    });
                }
                Err(e) => report.failures.push(PruneFailure {
                    pod,
                    kind: e.kind(),
                    message: e.to_string(),
                }),
            }
        }

        tracing::info!(
            removed = report.removed.len(),
            failed = report.failures.len(),
            "prune complete"
        );
        Outcome::success(Payload::Pruned(report))
    }
}
