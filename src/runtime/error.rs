// ABOUTME: Runtime error types with SNAFU pattern.
// ABOUTME: Covers failures to set up a runtime adapter, before any container call.

use snafu::Snafu;

/// Failure to build a runtime adapter.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("runtime connection failed: {message}"))]
    Connection { message: String },
}
