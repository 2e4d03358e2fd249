// ABOUTME: Pod lifecycle core: registry, state machine, group coordinator, queries.
// ABOUTME: Everything above the per-container runtime and below the CLI.

mod command;
mod coordinator;
mod error;
mod filter;
mod lock;
mod machine;
mod ordering;
mod outcome;
mod record;
mod registry;
mod service;
mod state;
mod state_lock;
mod store;

pub use command::{Defaults, PodCommand, Transition};
pub use coordinator::{Coordinator, Limits};
pub use error::{LookupError, PodError};
pub use filter::PodFilter;
pub use lock::PodGuard;
pub use machine::{Decision, MemberOp, Phase, Plan, ShortCircuit, decide};
pub use ordering::{Direction, OrderingError};
pub use outcome::{
    GroupReport, MemberError, MemberFailure, Outcome, OutcomeKind, Payload, PruneFailure,
    PruneReport,
};
pub use record::{Member, MemberSnapshot, MemberSpec, Pod, PodSnapshot, PodSpec};
pub use registry::PodRegistry;
pub use service::{Command, PodService, ServiceOptions};
pub use state::{MemberState, PodState};
pub use state_lock::{LockInfo, StateLock};
pub use store::{RegistryStore, StoreError};
