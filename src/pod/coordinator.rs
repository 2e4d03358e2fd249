// ABOUTME: Executes a transition plan against the runtime, tier by tier.
// ABOUTME: Bounds concurrency, applies deadlines and cancellation, aggregates member results.

use futures::stream::{self, StreamExt};
use nonempty::NonEmpty;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::runtime::{ContainerError, ContainerOps};
use crate::types::ContainerId;

use super::error::PodError;
use super::lock::PodGuard;
use super::machine::{MemberOp, Plan};
use super::ordering;
use super::outcome::{GroupReport, MemberError, MemberFailure, Outcome, Payload};
use super::record::Pod;
use super::registry::PodRegistry;
use super::state::PodState;

/// Concurrency and deadline bounds for member calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Member calls in flight at once within one pod operation.
    pub max_parallel_members: usize,
    /// Deadline for a single member call. Stops get their grace period on top.
    pub member_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_parallel_members: 4,
            member_timeout: Duration::from_secs(30),
        }
    }
}

/// Runs plans for pods whose guard the caller holds.
pub struct Coordinator<R> {
    runtime: Arc<R>,
    registry: Arc<PodRegistry>,
    limits: Limits,
}

type MemberResult = (ContainerId, Result<(), MemberError>);

impl<R: ContainerOps> Coordinator<R> {
    pub fn new(runtime: Arc<R>, registry: Arc<PodRegistry>, limits: Limits) -> Self {
        Self {
            runtime,
            registry,
            limits,
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Update cached member states from the runtime.
    ///
    /// A member whose state cannot be read keeps its cached state.
    pub async fn refresh(&self, pod: &mut Pod) {
        let ids: Vec<ContainerId> = pod.members().iter().map(|m| m.id.clone()).collect();
        let states: Vec<_> = stream::iter(ids)
            .map(|id| async move {
                let state = tokio::time::timeout(
                    self.limits.member_timeout,
                    self.runtime.container_state(&id),
                )
                .await;
                (id, state)
            })
            .buffer_unordered(self.parallelism())
            .collect()
            .await;

        for (id, state) in states {
            match state {
                Ok(Ok(state)) => {
                    if let Some(member) = pod.member_mut(&id) {
                        member.state = state.into();
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        container = %id,
                        error = %e,
                        "could not read member state, keeping cached"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        container = %id,
                        "timed out reading member state, keeping cached"
                    );
                }
            }
        }
    }

    /// Run `plan` and commit the resulting member states.
    ///
    /// Members that fail a phase are excluded from later phases. Any failure
    /// in a gating phase, or failure of every attempted member, is fatal;
    /// otherwise failures come back as a partial-failure report.
    #[tracing::instrument(skip_all, fields(pod = %pod.id().short()))]
    pub async fn execute(
        &self,
        guard: &PodGuard,
        mut pod: Pod,
        plan: Plan,
        cancel: &CancellationToken,
    ) -> Result<Outcome, PodError> {
        let mut attempted: Vec<ContainerId> = Vec::new();
        let mut failed: HashSet<ContainerId> = HashSet::new();
        let mut failures: Vec<MemberFailure> = Vec::new();
        let mut gate_closed = false;
        let mut removed: Vec<ContainerId> = Vec::new();

        for phase in &plan.phases {
            let members: Vec<ContainerId> = phase
                .members
                .iter()
                .filter(|id| !failed.contains(*id))
                .cloned()
                .collect();
            if members.is_empty() {
                continue;
            }

            let tiers = ordering::tiers(pod.members(), &members, phase.op.direction());
            tracing::debug!(
                action = %phase.op.action(),
                members = members.len(),
                tiers = tiers.len(),
                "running phase"
            );

            for tier in tiers {
                for (id, result) in self.run_tier(tier, phase.op, cancel).await {
                    if !attempted.contains(&id) {
                        attempted.push(id.clone());
                    }

                    match result {
                        Ok(()) => match phase.op.target_state() {
                            Some(state) => {
                                if let Some(member) = pod.member_mut(&id) {
                                    member.state = state;
                                }
                            }
                            None => removed.push(id),
                        },
                        Err(error) => {
                            tracing::warn!(
                                container = %id,
                                action = %phase.op.action(),
                                error = %error,
                                "member operation failed"
                            );
                            if !matches!(error, MemberError::Cancelled) {
                                self.reinspect(&mut pod, &id).await;
                            }
                            if phase.gating {
                                gate_closed = true;
                            }
                            failed.insert(id.clone());
                            failures.push(MemberFailure {
                                container: id,
                                action: phase.op.action(),
                                error,
                            });
                        }
                    }
                }
            }
        }

        let pod_id = pod.id().clone();
        let succeeded: Vec<ContainerId> = attempted
            .into_iter()
            .filter(|id| !failed.contains(id))
            .collect();

        let committed = if plan.removes() {
            pod.drop_members(&removed);
            if pod.members().is_empty() {
                self.registry
                    .remove(guard, &pod_id)
                    .map(|_| PodState::Removed)
            } else {
                self.registry.commit(guard, pod)
            }
        } else {
            self.registry.commit(guard, pod)
        };

        // Member calls already happened, so their results travel with the error.
        let state = match committed {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, failures = failures.len(), "pod state not saved");
                return Err(PodError::Unsaved {
                    pod: pod_id,
                    succeeded,
                    failures,
                    reason: e.to_string(),
                });
            }
        };

        let Some(failures) = NonEmpty::from_vec(failures) else {
            tracing::info!(
                state = %state,
                members = succeeded.len(),
                "pod operation complete"
            );
            return Ok(Outcome::success(Payload::Id(pod_id)));
        };

        if gate_closed || succeeded.is_empty() {
            tracing::error!(state = %state, failures = failures.len(), "pod operation failed");
            return Err(PodError::Fatal {
                pod: pod_id,
                state,
                succeeded,
                failures,
            });
        }

        tracing::warn!(
            state = %state,
            failures = failures.len(),
            "pod operation partially failed"
        );
        Ok(Outcome::PartialFailure {
            report: GroupReport {
                pod: pod_id,
                state,
                succeeded,
                failures,
            },
        })
    }

    async fn run_tier(
        &self,
        tier: Vec<ContainerId>,
        op: MemberOp,
        cancel: &CancellationToken,
    ) -> Vec<MemberResult> {
        stream::iter(tier)
            .map(|id| async move {
                // Checked when the call is dispatched, not when the tier is queued.
                if cancel.is_cancelled() {
                    return (id, Err(MemberError::Cancelled));
                }

                let deadline = self.deadline(op);
                let result = match tokio::time::timeout(deadline, self.call(&id, op)).await {
                    Ok(result) => result.map_err(MemberError::from),
                    Err(_) => Err(MemberError::TimedOut(deadline)),
                };
                (id, result)
            })
            .buffer_unordered(self.parallelism())
            .collect()
            .await
    }

    async fn call(&self, id: &ContainerId, op: MemberOp) -> Result<(), ContainerError> {
        let runtime = self.runtime.as_ref();
        match op {
            MemberOp::Start => runtime.start_container(id).await,
            MemberOp::Stop { timeout } => runtime.stop_container(id, timeout).await,
            MemberOp::Kill { signal } => runtime.kill_container(id, signal).await,
            MemberOp::Pause => runtime.pause_container(id).await,
            MemberOp::Unpause => runtime.unpause_container(id).await,
            MemberOp::Remove { force } => match runtime.remove_container(id, force).await {
                // Already gone counts as removed.
                Err(ContainerError::NotFound(_)) => Ok(()),
                other => other,
            },
        }
    }

    /// Read back a member's state after a failed call.
    async fn reinspect(&self, pod: &mut Pod, id: &ContainerId) {
        let state =
            tokio::time::timeout(self.limits.member_timeout, self.runtime.container_state(id))
                .await;
        if let Ok(Ok(state)) = state {
            if let Some(member) = pod.member_mut(id) {
                member.state = state.into();
            }
        }
    }

    fn deadline(&self, op: MemberOp) -> Duration {
        match op {
            MemberOp::Stop { timeout } => self.limits.member_timeout + timeout,
            _ => self.limits.member_timeout,
        }
    }

    fn parallelism(&self) -> usize {
        self.limits.max_parallel_members.max(1)
    }
}
