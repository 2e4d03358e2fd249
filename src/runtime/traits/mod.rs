// ABOUTME: Capability traits for container runtime adapters.
// ABOUTME: Defines ContainerOps and the types it exchanges.

mod container;
pub(crate) mod sealed;

pub use container::{ContainerAction, ContainerError, ContainerOps, ContainerState};
