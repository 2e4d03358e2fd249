// ABOUTME: Durable JSON snapshot of the pod registry.
// ABOUTME: Writes go to a temp file and are renamed into place atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::record::Pod;
use super::state_lock::StateLock;

/// Bumped when the on-disk layout changes incompatibly.
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read pod state {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write pod state {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt pod state {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unsupported pod state version {found} in {path}")]
    Version { path: PathBuf, found: u32 },

    #[error("pod state {path} is locked by {holder} (pid {pid}) since {since}")]
    Locked {
        path: PathBuf,
        holder: String,
        pid: u32,
        since: DateTime<Utc>,
    },

    #[error("failed to lock pod state {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Serialize, Deserialize)]
struct StateFile {
    version: u32,
    pods: Vec<Pod>,
}

/// File-backed persistence for registry contents.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the cross-process lock guarding this file.
    pub fn lock(&self) -> Result<StateLock, StoreError> {
        StateLock::acquire(&self.path)
    }

    /// Load pods in their saved order. A missing file is an empty registry.
    pub fn load(&self) -> Result<Vec<Pod>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let state: StateFile =
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        if state.version != FORMAT_VERSION {
            return Err(StoreError::Version {
                path: self.path.clone(),
                found: state.version,
            });
        }

        Ok(state.pods)
    }

    /// Replace the saved state with `pods`.
    pub fn save(&self, pods: &[Pod]) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let state = StateFile {
            version: FORMAT_VERSION,
            pods: pods.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&state).map_err(|e| write_err(e.into()))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;

        tracing::debug!(path = %self.path.display(), pods = pods.len(), "saved pod state");
        Ok(())
    }
}
