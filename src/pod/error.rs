// ABOUTME: Error types for pod lookups and pod operations.
// ABOUTME: Each error reports the OutcomeKind a dispatch layer should surface.

use nonempty::NonEmpty;
use snafu::Snafu;

use crate::types::{ContainerId, PodId};

use super::outcome::{MemberFailure, OutcomeKind};
use super::state::PodState;
use super::store::StoreError;

/// Failure to resolve a pod identifier.
///
/// Both variants surface as `NotFound`; they stay distinct for diagnostics.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LookupError {
    #[snafu(display("no such pod: {identifier}"))]
    NoMatch { identifier: String },

    #[snafu(display("pod identifier {identifier} is ambiguous ({} matches)", candidates.len()))]
    Ambiguous {
        identifier: String,
        candidates: Vec<PodId>,
    },
}

/// Errors from pod operations.
#[derive(Debug, thiserror::Error)]
pub enum PodError {
    #[error(transparent)]
    NotFound(#[from] LookupError),

    #[error("pod {pod} is in a conflicting state: {reason}")]
    Conflict { pod: String, reason: String },

    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error("pod {} operation failed: {} member failure(s)", .pod.short(), .failures.len())]
    Fatal {
        pod: PodId,
        state: PodState,
        succeeded: Vec<ContainerId>,
        failures: NonEmpty<MemberFailure>,
    },

    /// Member calls ran but the resulting pod state could not be saved.
    #[error("pod {} was changed but not saved: {reason}", .pod.short())]
    Unsaved {
        pod: PodId,
        succeeded: Vec<ContainerId>,
        failures: Vec<MemberFailure>,
        reason: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl PodError {
    pub(crate) fn conflict(pod: impl ToString, reason: impl Into<String>) -> Self {
        PodError::Conflict {
            pod: pod.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn no_match(identifier: impl Into<String>) -> Self {
        PodError::NotFound(LookupError::NoMatch {
            identifier: identifier.into(),
        })
    }

    /// Classification for the dispatch layer.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            PodError::NotFound(_) => OutcomeKind::NotFound,
            PodError::Conflict { .. } => OutcomeKind::Conflict,
            PodError::BadParameter(_) => OutcomeKind::BadParameter,
            PodError::Fatal { .. } | PodError::Unsaved { .. } | PodError::Internal(_) => {
                OutcomeKind::Fatal
            }
        }
    }

    /// Member failures carried by a failed group operation.
    pub fn failures(&self) -> Vec<&MemberFailure> {
        match self {
            PodError::Fatal { failures, .. } => failures.iter().collect(),
            PodError::Unsaved { failures, .. } => failures.iter().collect(),
            _ => Vec::new(),
        }
    }
}

impl From<StoreError> for PodError {
    fn from(err: StoreError) -> Self {
        PodError::Internal(err.to_string())
    }
}
