// Tabletkbd Lock Exclusion Tests
//
// Several threads hammer one lock; no two actions may ever overlap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tabletkbd_core::lock::{ExclusiveLock, Lock, SentinelLock};
use tabletkbd_core::{MemoryFs, PolicyFs};

fn hammer<L: Lock + Send + Sync + 'static>(lock: Arc<L>) -> usize {
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();

    for _ in 0..4 {
        let lock = Arc::clone(&lock);
        let active = Arc::clone(&active);
        let max_active = Arc::clone(&max_active);
        handles.push(thread::spawn(move || {
            for _ in 0..10 {
                lock.with_lock(|| {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(1));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    max_active.load(Ordering::SeqCst)
}

#[test]
fn sentinel_lock_serializes_actions() {
    let fs = MemoryFs::new();
    // Generous bound so the stale-lock heuristic never fires here
    let lock = SentinelLock::new(fs.clone(), "gimmeasec.lock", 10_000, Duration::from_millis(1));

    assert_eq!(hammer(Arc::new(lock)), 1);
    assert!(!fs.exists("gimmeasec.lock").unwrap());
}

#[test]
fn exclusive_lock_serializes_actions() {
    let dir = std::env::temp_dir().join(format!("tabletkbd-hammer-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    // Each with_lock opens its own descriptor, so threads contend like processes
    let lock = ExclusiveLock::new(dir.join("tabletkbd.lock"), 10_000, Duration::from_millis(1));
    assert_eq!(hammer(Arc::new(lock)), 1);

    let _ = std::fs::remove_dir_all(&dir);
}
