// ABOUTME: Decides whether a lifecycle transition applies to a pod and plans it.
// ABOUTME: Pure function of the pod record; no runtime calls happen here.

use std::time::Duration;

use crate::runtime::ContainerAction;
use crate::types::{ContainerId, Signal};

use super::command::Transition;
use super::ordering::Direction;
use super::record::Pod;
use super::state::{MemberState, PodState};

/// One operation applied to a single member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOp {
    Start,
    Stop { timeout: Duration },
    Kill { signal: Signal },
    Pause,
    Unpause,
    Remove { force: bool },
}

impl MemberOp {
    pub fn action(&self) -> ContainerAction {
        match self {
            MemberOp::Start => ContainerAction::Start,
            MemberOp::Stop { .. } => ContainerAction::Stop,
            MemberOp::Kill { .. } => ContainerAction::Kill,
            MemberOp::Pause => ContainerAction::Pause,
            MemberOp::Unpause => ContainerAction::Unpause,
            MemberOp::Remove { .. } => ContainerAction::Remove,
        }
    }

    /// Member state after the operation succeeds. `None` means the member
    /// leaves the pod.
    pub fn target_state(&self) -> Option<MemberState> {
        match self {
            MemberOp::Start | MemberOp::Unpause => Some(MemberState::Running),
            MemberOp::Stop { .. } | MemberOp::Kill { .. } => Some(MemberState::Stopped),
            MemberOp::Pause => Some(MemberState::Paused),
            MemberOp::Remove { .. } => None,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            MemberOp::Start | MemberOp::Unpause => Direction::DependenciesFirst,
            _ => Direction::DependentsFirst,
        }
    }
}

/// A set of members receiving the same operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub op: MemberOp,
    /// Members in pod insertion order; ordering tiers are derived at execution.
    pub members: Vec<ContainerId>,
    /// Any failure in a gating phase makes the whole operation fatal.
    pub gating: bool,
}

/// Phases run in order. Members that fail one phase sit out the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub phases: Vec<Phase>,
}

impl Plan {
    /// Whether the plan ends by removing members from the pod.
    pub fn removes(&self) -> bool {
        self.phases
            .last()
            .is_some_and(|p| matches!(p.op, MemberOp::Remove { .. }))
    }

    fn is_empty(&self) -> bool {
        self.phases.iter().all(|p| p.members.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Proceed(Plan),
    ShortCircuit(ShortCircuit),
}

/// Result decided without touching any member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortCircuit {
    /// Already in the requested state.
    NoOp,
    /// The transition is illegal from the current state.
    Conflict(String),
}

impl Decision {
    const NOOP: Decision = Decision::ShortCircuit(ShortCircuit::NoOp);

    fn conflict(reason: impl Into<String>) -> Self {
        Decision::ShortCircuit(ShortCircuit::Conflict(reason.into()))
    }
}

/// Check legality of `transition` against the pod's current member states.
pub fn decide(pod: &Pod, transition: &Transition) -> Decision {
    let in_state = |wanted: &[MemberState]| -> Vec<ContainerId> {
        pod.members()
            .iter()
            .filter(|m| wanted.contains(&m.state))
            .map(|m| m.id.clone())
            .collect()
    };
    let all: Vec<ContainerId> = pod.members().iter().map(|m| m.id.clone()).collect();
    let active = in_state(&[MemberState::Running, MemberState::Paused]);

    let plan = match *transition {
        Transition::Start => {
            if pod.state() == PodState::Running {
                return Decision::NOOP;
            }
            Plan {
                phases: vec![
                    phase(MemberOp::Unpause, in_state(&[MemberState::Paused])),
                    phase(
                        MemberOp::Start,
                        in_state(&[MemberState::Created, MemberState::Stopped]),
                    ),
                ],
            }
        }

        Transition::Stop { timeout } => Plan {
            phases: vec![phase(MemberOp::Stop { timeout }, active)],
        },

        Transition::Kill { signal } => {
            if active.is_empty() {
                return Decision::conflict("pod is not running");
            }
            Plan {
                phases: vec![phase(MemberOp::Kill { signal }, active)],
            }
        }

        Transition::Pause => Plan {
            phases: vec![phase(MemberOp::Pause, in_state(&[MemberState::Running]))],
        },

        Transition::Unpause => Plan {
            phases: vec![phase(MemberOp::Unpause, in_state(&[MemberState::Paused]))],
        },

        Transition::Restart { timeout } => {
            if all.is_empty() {
                return Decision::NOOP;
            }
            Plan {
                phases: vec![
                    Phase {
                        op: MemberOp::Stop { timeout },
                        members: active,
                        gating: true,
                    },
                    phase(MemberOp::Start, all),
                ],
            }
        }

        Transition::Remove { force, timeout } => {
            if !active.is_empty() && !force {
                return Decision::conflict(format!(
                    "{} member(s) still running; stop the pod or force removal",
                    active.len()
                ));
            }
            // A pod without members is removed without any member call.
            return Decision::Proceed(Plan {
                phases: vec![
                    phase(MemberOp::Stop { timeout }, active),
                    phase(MemberOp::Remove { force: false }, all),
                ],
            });
        }
    };

    if plan.is_empty() {
        Decision::NOOP
    } else {
        Decision::Proceed(plan)
    }
}

fn phase(op: MemberOp, members: Vec<ContainerId>) -> Phase {
    Phase {
        op,
        members,
        gating: false,
    }
}
