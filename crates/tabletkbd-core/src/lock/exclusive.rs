// Tabletkbd Lock - Exclusive flock
// Kernel-backed advisory lock; released automatically if the holder dies

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use super::{Lock, LockResult};

/// `flock(2)` based lock on a persistent file.
///
/// Acquisition polls with `LOCK_NB` using the same delay and bound as the
/// sentinel lock, then falls back to a blocking wait. The kernel drops the
/// lock when the holder exits, so there is never a stale lock to break.
pub struct ExclusiveLock {
    path: PathBuf,
    max_attempts: u32,
    delay: Duration,
}

impl ExclusiveLock {
    pub fn new<P: Into<PathBuf>>(path: P, max_attempts: u32, delay: Duration) -> Self {
        Self {
            path: path.into(),
            max_attempts,
            delay,
        }
    }

    fn acquire(&self) -> LockResult<FlockGuard> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let mut attempts: u32 = 0;
        loop {
            match flock(&file, libc::LOCK_EX | libc::LOCK_NB) {
                Ok(()) => return Ok(FlockGuard { file }),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }

            attempts += 1;
            if attempts > self.max_attempts {
                log::warn!(
                    "{} still held after {} attempts, waiting for it",
                    self.path.display(),
                    attempts
                );
                flock(&file, libc::LOCK_EX)?;
                return Ok(FlockGuard { file });
            }

            log::debug!("{} busy, waiting (attempt {})", self.path.display(), attempts);
            thread::sleep(self.delay);
        }
    }
}

fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
    loop {
        let rc = unsafe { libc::flock(file.as_raw_fd(), operation) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

struct FlockGuard {
    file: File,
}

impl Drop for FlockGuard {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well
        if let Err(e) = flock(&self.file, libc::LOCK_UN) {
            log::warn!("flock unlock failed: {}", e);
        }
    }
}

impl Lock for ExclusiveLock {
    fn with_lock<T, A: FnOnce() -> T>(&self, action: A) -> LockResult<T> {
        let _guard = self.acquire()?;
        Ok(action())
    }
}
