// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;
mod pod_name;
mod signal;

pub use id::{ContainerId, Id, PodId};
pub use pod_name::{PodName, PodNameError};
pub use signal::{Signal, SignalError};
