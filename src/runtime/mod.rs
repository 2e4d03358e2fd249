// ABOUTME: Container runtime adapters the pod core calls once per member.
// ABOUTME: Exposes the ContainerOps trait plus bollard and in-memory implementations.

mod bollard;
mod error;
mod memory;
pub mod traits;

pub use self::bollard::BollardRuntime;
pub use error::RuntimeError;
pub use memory::MemoryRuntime;
pub use traits::{ContainerAction, ContainerError, ContainerOps, ContainerState};
