// ABOUTME: Sealed trait pattern for runtime traits.
// ABOUTME: Prevents external implementations, allowing non-breaking evolution.

/// Sealed trait to prevent external implementations.
///
/// Only the adapters shipped in this crate (bollard and in-memory) can
/// implement `ContainerOps`, so new methods can be added without a major bump.
pub trait Sealed {}
