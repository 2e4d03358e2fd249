// ABOUTME: Library root for podvisor - exposes the pod core and adapters for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod error;
pub mod output;
pub mod pod;
pub mod runtime;
pub mod types;
