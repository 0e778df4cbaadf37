//! Install lock management
//!
//! Serializes installs that share an install directory. The sentinel is
//! created with `create_new`, so two processes can never both hold it. The
//! fs2 advisory lock on top is best effort: filesystems without flock
//! support (some NFS mounts) still lock through the sentinel alone. A lock left by a crashed process is never taken over: callers
//! retry for a bounded time and then fail with the lock path.

use super::error::{Result, SwitchError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Sentinel file name inside the install directory
pub const LOCK_FILE_NAME: &str = ".tfswitch.lock";

/// Retry schedule for lock acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            attempts: 90,
            interval: Duration::from_secs(2),
        }
    }
}

/// Acquire the install lock for `install_dir`, waiting per `policy`.
/// Returns a guard that releases the lock when dropped.
pub fn acquire_install_lock(install_dir: &Path, policy: LockPolicy) -> Result<InstallLock> {
    let lock_path = install_dir.join(LOCK_FILE_NAME);
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        match try_acquire(&lock_path)? {
            Some(lock) => {
                tracing::debug!(path = %lock_path.display(), attempt, "acquired install lock");
                return Ok(lock);
            }
            None => {
                tracing::info!(
                    path = %lock_path.display(),
                    attempt,
                    attempts,
                    held_for = ?lock_age(&lock_path),
                    "install lock is held by another process, waiting"
                );
                if attempt < attempts {
                    std::thread::sleep(policy.interval);
                }
            }
        }
    }

    Err(SwitchError::LockTimeout {
        path: lock_path,
        attempts,
    })
}

/// One acquisition attempt; `Ok(None)` means someone else holds the lock
fn try_acquire(lock_path: &Path) -> Result<Option<InstallLock>> {
    let file = match OpenOptions::new().write(true).create_new(true).open(lock_path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(SwitchError::io(lock_path, e)),
    };

    let advisory = file.try_lock_exclusive();
    Ok(Some(claim(file, lock_path, advisory)))
}

/// The sentinel is ours once `create_new` succeeded; a failed advisory
/// lock only means the filesystem does not support flock.
fn claim(file: File, lock_path: &Path, advisory: std::io::Result<()>) -> InstallLock {
    if let Err(e) = advisory {
        tracing::debug!(
            path = %lock_path.display(),
            error = %e,
            "advisory lock unavailable, relying on the lock file alone"
        );
    }
    InstallLock {
        file,
        path: lock_path.to_path_buf(),
    }
}

/// How long the current lock file has existed, from its mtime
fn lock_age(lock_path: &Path) -> Option<Duration> {
    let modified = std::fs::metadata(lock_path).ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

/// RAII guard for the install lock: releases the lock and deletes the
/// sentinel when dropped
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}
