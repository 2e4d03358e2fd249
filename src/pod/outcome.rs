// ABOUTME: Typed results of pod operations and per-member failure reports.
// ABOUTME: OutcomeKind is what a dispatch layer maps to transport status codes.

use nonempty::NonEmpty;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::runtime::{ContainerAction, ContainerError};
use crate::types::{ContainerId, PodId};

use super::record::PodSnapshot;
use super::state::PodState;

/// Coarse classification of any operation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    /// Already in the requested state.
    NotModified,
    NotFound,
    Conflict,
    /// Success with an embedded per-member error report.
    PartialFailure,
    BadParameter,
    Fatal,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeKind::Success => "success",
            OutcomeKind::NotModified => "not modified",
            OutcomeKind::NotFound => "not found",
            OutcomeKind::Conflict => "conflict",
            OutcomeKind::PartialFailure => "partial failure",
            OutcomeKind::BadParameter => "bad parameter",
            OutcomeKind::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// Why one member operation did not succeed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MemberError {
    #[error(transparent)]
    Runtime(#[from] ContainerError),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled before dispatch")]
    Cancelled,
}

/// One failed member operation.
#[derive(Debug, Clone, Serialize)]
pub struct MemberFailure {
    pub container: ContainerId,
    pub action: ContainerAction,
    #[serde(serialize_with = "serialize_display")]
    pub error: MemberError,
}

impl fmt::Display for MemberFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.action, self.container, self.error)
    }
}

/// Member-level detail of a group operation that did not fully succeed.
#[derive(Debug, Serialize)]
pub struct GroupReport {
    pub pod: PodId,
    /// Pod state after the operation, from the members' actual states.
    pub state: PodState,
    pub succeeded: Vec<ContainerId>,
    pub failures: NonEmpty<MemberFailure>,
}

impl fmt::Display for GroupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} member operation(s) failed on pod {} (now {})",
            self.failures.len(),
            self.failures.len() + self.succeeded.len(),
            self.pod.short(),
            self.state
        )
    }
}

/// Outcome of a prune: removed pods plus the pods that could not be removed.
#[derive(Debug, Default, Serialize)]
pub struct PruneReport {
    pub removed: Vec<PodId>,
    pub failures: Vec<PruneFailure>,
}

#[derive(Debug, Serialize)]
pub struct PruneFailure {
    pub pod: PodId,
    pub kind: OutcomeKind,
    pub message: String,
}

/// Data returned alongside a successful operation.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    None,
    Id(PodId),
    Snapshot(PodSnapshot),
    Pods(Vec<PodSnapshot>),
    Pruned(PruneReport),
}

/// Non-error result of a pod operation.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success { payload: Payload },
    NoOp { pod: PodId, state: PodState },
    PartialFailure { report: GroupReport },
}

impl Outcome {
    pub fn success(payload: Payload) -> Self {
        Outcome::Success { payload }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success { .. } => OutcomeKind::Success,
            Outcome::NoOp { .. } => OutcomeKind::NotModified,
            Outcome::PartialFailure { .. } => OutcomeKind::PartialFailure,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Outcome::Success { payload } => Some(payload),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&GroupReport> {
        match self {
            Outcome::PartialFailure { report } => Some(report),
            _ => None,
        }
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}
