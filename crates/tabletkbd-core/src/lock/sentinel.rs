// Tabletkbd Lock - Sentinel File
// Presence-of-a-file debounce lock, compatible with earlier deployments

use std::io::ErrorKind;
use std::thread;
use std::time::Duration;

use super::{Lock, LockResult};
use crate::policy::PolicyFs;

/// Best-effort lock represented by an empty file in the policy directory.
///
/// While the sentinel exists, acquisition sleeps `delay` and retries. After
/// more than `max_attempts` retries the sentinel is presumed abandoned by a
/// crashed run and deleted.
///
/// Known races: two waiters that both exceed the bound can both delete the
/// sentinel and both proceed, and a process starting between the forced
/// delete and our re-check can take the lock first. Creation itself is
/// exclusive, so two processes never both create the same sentinel.
pub struct SentinelLock<F> {
    fs: F,
    name: String,
    max_attempts: u32,
    delay: Duration,
}

impl<F: PolicyFs> SentinelLock<F> {
    pub fn new(fs: F, name: impl Into<String>, max_attempts: u32, delay: Duration) -> Self {
        Self {
            fs,
            name: name.into(),
            max_attempts,
            delay,
        }
    }

    fn acquire(&self) -> LockResult<SentinelGuard<'_, F>> {
        let mut attempts: u32 = 0;

        loop {
            if attempts > self.max_attempts {
                log::warn!(
                    "{} held for {} attempts, assuming it is stale",
                    self.name,
                    attempts
                );
                match self.fs.remove(&self.name) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }

            if !self.fs.exists(&self.name)? {
                match self.fs.create(&self.name) {
                    Ok(()) => {
                        return Ok(SentinelGuard { lock: self });
                    }
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        log::debug!("Lost the race for {}", self.name);
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            attempts += 1;
            log::debug!("{} present, waiting (attempt {})", self.name, attempts);
            thread::sleep(self.delay);
        }
    }
}

/// Removes the sentinel when dropped, including during unwinding
struct SentinelGuard<'a, F: PolicyFs> {
    lock: &'a SentinelLock<F>,
}

impl<F: PolicyFs> Drop for SentinelGuard<'_, F> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.fs.remove(&self.lock.name) {
            log::warn!("Could not remove {}: {}", self.lock.name, e);
        }
    }
}

impl<F: PolicyFs> Lock for SentinelLock<F> {
    fn with_lock<T, A: FnOnce() -> T>(&self, action: A) -> LockResult<T> {
        let _guard = self.acquire()?;
        Ok(action())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::MemoryFs;
    use std::cell::Cell;

    fn lock(fs: &MemoryFs) -> SentinelLock<MemoryFs> {
        SentinelLock::new(fs.clone(), "gimmeasec.lock", 10, Duration::ZERO)
    }

    #[test]
    fn test_sentinel_present_only_during_action() {
        let fs = MemoryFs::new();
        let lock = lock(&fs);

        let seen = lock
            .with_lock(|| fs.exists("gimmeasec.lock").unwrap())
            .unwrap();

        assert!(seen);
        assert!(!fs.exists("gimmeasec.lock").unwrap());
    }

    #[test]
    fn test_returns_action_value() {
        let fs = MemoryFs::new();
        assert_eq!(lock(&fs).with_lock(|| 42).unwrap(), 42);
    }

    #[test]
    fn test_stale_sentinel_is_broken() {
        let fs = MemoryFs::with_files(["gimmeasec.lock"]);
        let ran = Cell::new(false);

        lock(&fs).with_lock(|| ran.set(true)).unwrap();

        assert!(ran.get());
        assert!(fs.files().is_empty());
    }

    #[test]
    fn test_sequential_calls_never_overlap() {
        let fs = MemoryFs::new();
        let lock = lock(&fs);
        let active = Cell::new(0);
        let max_active = Cell::new(0);

        for _ in 0..5 {
            lock.with_lock(|| {
                active.set(active.get() + 1);
                max_active.set(max_active.get().max(active.get()));
                assert!(fs.exists("gimmeasec.lock").unwrap());
                active.set(active.get() - 1);
            })
            .unwrap();
        }

        assert_eq!(max_active.get(), 1);
        assert!(!fs.exists("gimmeasec.lock").unwrap());
    }

    #[test]
    fn test_sentinel_removed_after_panic() {
        let fs = MemoryFs::new();
        let lock = lock(&fs);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            lock.with_lock::<(), _>(|| panic!("toggle blew up")).unwrap();
        }));

        assert!(result.is_err());
        assert!(!fs.exists("gimmeasec.lock").unwrap());
    }

    #[test]
    fn test_unrelated_files_untouched() {
        let fs = MemoryFs::with_files(["off.conf", "kbd.nope"]);
        lock(&fs).with_lock(|| ()).unwrap();
        assert_eq!(fs.files(), vec!["kbd.nope".to_string(), "off.conf".to_string()]);
    }
}
