// ABOUTME: Member and pod lifecycle states plus the aggregation rule between them.
// ABOUTME: A pod's state is always derived from its members, never stored.

use crate::runtime::ContainerState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one member container, as far as the pod core cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberState {
    Created,
    Running,
    Paused,
    /// Exited, dead, or killed.
    Stopped,
}

impl MemberState {
    /// Running or paused: the member holds live processes.
    pub fn is_active(self) -> bool {
        matches!(self, MemberState::Running | MemberState::Paused)
    }
}

impl From<ContainerState> for MemberState {
    fn from(state: ContainerState) -> Self {
        match state {
            ContainerState::Created => MemberState::Created,
            ContainerState::Running | ContainerState::Restarting => MemberState::Running,
            ContainerState::Paused => MemberState::Paused,
            ContainerState::Exited | ContainerState::Dead | ContainerState::Removing => {
                MemberState::Stopped
            }
        }
    }
}

impl fmt::Display for MemberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemberState::Created => "created",
            MemberState::Running => "running",
            MemberState::Paused => "paused",
            MemberState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Aggregate lifecycle state of a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodState {
    Created,
    Running,
    Paused,
    Stopped,
    /// Members disagree.
    Degraded,
    /// Terminal. Only reported by a completed remove, never stored.
    Removed,
}

impl PodState {
    /// Derive the pod state from its members' states.
    ///
    /// A pod without members is `Created`. Otherwise the pod takes the
    /// members' common state, or `Degraded` when they differ.
    pub fn aggregate<I>(members: I) -> PodState
    where
        I: IntoIterator<Item = MemberState>,
    {
        let mut iter = members.into_iter();
        let Some(first) = iter.next() else {
            return PodState::Created;
        };

        if iter.any(|state| state != first) {
            return PodState::Degraded;
        }

        match first {
            MemberState::Created => PodState::Created,
            MemberState::Running => PodState::Running,
            MemberState::Paused => PodState::Paused,
            MemberState::Stopped => PodState::Stopped,
        }
    }
}

impl fmt::Display for PodState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PodState::Created => "created",
            PodState::Running => "running",
            PodState::Paused => "paused",
            PodState::Stopped => "stopped",
            PodState::Degraded => "degraded",
            PodState::Removed => "removed",
        };
        f.write_str(s)
    }
}
