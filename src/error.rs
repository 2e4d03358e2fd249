// ABOUTME: Application-wide error types for podvisor.
// ABOUTME: Uses thiserror; wraps config, runtime connection, storage, and pod errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::pod::{OutcomeKind, PodError, StoreError};
use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Pod(#[from] PodError),
}

impl Error {
    /// Outcome classification, for exit codes and JSON output.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Error::Pod(e) => e.kind(),
            Error::InvalidConfig(_) | Error::Yaml(_) => OutcomeKind::BadParameter,
            Error::AlreadyExists(_) => OutcomeKind::Conflict,
            Error::ConfigNotFound(_) => OutcomeKind::NotFound,
            Error::Io(_) | Error::Runtime(_) | Error::Store(_) => OutcomeKind::Fatal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
