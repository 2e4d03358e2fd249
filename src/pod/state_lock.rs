// ABOUTME: Exclusive lock on the pod state file, shared by every podvisor process.
// ABOUTME: Uses atomic file creation with holder info, and breaks stale locks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::store::StoreError;

/// Locks held longer than this are assumed abandoned.
const STALE_AFTER_HOURS: i64 = 1;

/// Who holds a state lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process.
    pub fn current() -> Self {
        Self {
            holder: hostname(),
            pid: std::process::id(),
            started_at: Utc::now(),
        }
    }

    /// Older than an hour, or held by a process on this host that has exited.
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= STALE_AFTER_HOURS || (self.holder == hostname() && !alive(self.pid))
    }
}

fn hostname() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

#[cfg(target_os = "linux")]
fn alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn alive(_pid: u32) -> bool {
    true
}

/// A held state lock. The lock file is removed on drop.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl StateLock {
    /// Lock file guarding `state_file`.
    pub fn path_for(state_file: &Path) -> PathBuf {
        state_file.with_extension("lock")
    }

    /// Take the lock for `state_file`.
    ///
    /// Fails with [`StoreError::Locked`] while another live process holds it.
    /// Stale and unreadable locks are broken with a warning.
    pub fn acquire(state_file: &Path) -> Result<Self, StoreError> {
        let path = Self::path_for(state_file);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| lock_err(&path, source))?;
        }

        let info = LockInfo::current();
        if try_create(&path, &info)? {
            return Ok(Self { path });
        }

        match read_info(&path) {
            Some(existing) if !existing.is_stale() => {
                return Err(StoreError::Locked {
                    path,
                    holder: existing.holder,
                    pid: existing.pid,
                    since: existing.started_at,
                });
            }
            Some(existing) => tracing::warn!(
                holder = %existing.holder,
                pid = existing.pid,
                since = %existing.started_at,
                "breaking stale state lock"
            ),
            None => tracing::warn!(path = %path.display(), "state lock unreadable, breaking it"),
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(lock_err(&path, source)),
        }

        if try_create(&path, &info)? {
            return Ok(Self { path });
        }
        Err(lock_err(
            &path,
            std::io::Error::new(
                ErrorKind::AlreadyExists,
                "lock acquired by another process during break",
            ),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to release state lock"
            );
        }
    }
}

/// Publish a lock file holding `info`, or report that one already exists.
///
/// The content is written first and hard-linked into place, so a lock file is
/// never visible half-written.
fn try_create(path: &Path, info: &LockInfo) -> Result<bool, StoreError> {
    let staging = path.with_extension(format!("lock.{}", info.pid));
    let json = serde_json::to_vec(info).map_err(|e| lock_err(path, e.into()))?;
    std::fs::write(&staging, json).map_err(|source| lock_err(path, source))?;

    let linked = std::fs::hard_link(&staging, path);
    let _ = std::fs::remove_file(&staging);
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(source) => Err(lock_err(path, source)),
    }
}

fn read_info(path: &Path) -> Option<LockInfo> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

fn lock_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Lock {
        path: path.to_path_buf(),
        source,
    }
}
