// Tabletkbd Lock
// Serializes toggler runs against rapid or concurrent switch events

mod exclusive;
mod sentinel;

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

pub use exclusive::ExclusiveLock;
pub use sentinel::SentinelLock;

use crate::policy::PolicyFs;

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur while taking or releasing a lock
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs an action while holding mutual exclusion
pub trait Lock {
    fn with_lock<T, A: FnOnce() -> T>(&self, action: A) -> LockResult<T>;
}

/// Which lock implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Sentinel file with bounded retry and stale-lock breaking
    #[default]
    Sentinel,
    /// `flock(2)` on a persistent lock file
    Exclusive,
}

/// Lock chosen at construction time
pub enum AnyLock<F> {
    Sentinel(SentinelLock<F>),
    Exclusive(ExclusiveLock),
}

impl<F: PolicyFs> AnyLock<F> {
    /// Build the lock for `mode`; `fs` and `dir` both describe the policy
    /// directory the lock file lives in.
    pub fn new(
        mode: LockMode,
        fs: F,
        dir: &Path,
        file_name: &str,
        max_attempts: u32,
        delay: Duration,
    ) -> Self {
        match mode {
            LockMode::Sentinel => {
                AnyLock::Sentinel(SentinelLock::new(fs, file_name, max_attempts, delay))
            }
            LockMode::Exclusive => {
                AnyLock::Exclusive(ExclusiveLock::new(dir.join(file_name), max_attempts, delay))
            }
        }
    }

    pub fn mode(&self) -> LockMode {
        match self {
            AnyLock::Sentinel(_) => LockMode::Sentinel,
            AnyLock::Exclusive(_) => LockMode::Exclusive,
        }
    }
}

impl<F: PolicyFs> Lock for AnyLock<F> {
    fn with_lock<T, A: FnOnce() -> T>(&self, action: A) -> LockResult<T> {
        match self {
            AnyLock::Sentinel(lock) => lock.with_lock(action),
            AnyLock::Exclusive(lock) => lock.with_lock(action),
        }
    }
}
