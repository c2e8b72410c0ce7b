// Tabletkbd Startup Reconciler
// Guarantees a usable keyboard before the event loop starts

use crate::policy::{PolicyFs, Reloader, ToggleError, ToggleResult, Toggler, TransitionReport};

/// Enable the keyboard if the blocking policy is loaded.
///
/// Runs without the lock: it happens before the event loop starts, when no
/// other writer is expected. Returns `None` when nothing had to change.
pub fn reconcile<F: PolicyFs, R: Reloader>(
    toggler: &Toggler<F, R>,
) -> ToggleResult<Option<TransitionReport>> {
    let blocking = toggler.layout().blocking_active();
    let listing = toggler.fs().list().map_err(ToggleError::Inspect)?;

    if !listing.iter().any(|name| *name == blocking) {
        log::debug!("{} not active, keyboard already enabled", blocking);
        return Ok(None);
    }

    log::info!("{} is active at startup, enabling keyboard", blocking);
    toggler.enable().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{CountingReloader, MemoryFs, PolicyLayout, PolicyState};

    fn toggler(files: &[&str]) -> (Toggler<MemoryFs, CountingReloader>, MemoryFs, CountingReloader) {
        let fs = MemoryFs::with_files(files.iter().copied());
        let reloader = CountingReloader::new();
        (
            Toggler::new(fs.clone(), reloader.clone(), PolicyLayout::default()),
            fs,
            reloader,
        )
    }

    #[test]
    fn test_reconcile_enables_blocked_keyboard() {
        let (toggler, fs, reloader) = toggler(&["off.conf", "kbdA.nope", "kbdB.nope"]);

        let report = reconcile(&toggler).unwrap().unwrap();

        assert_eq!(report.before, PolicyState::Disabled);
        assert_eq!(
            fs.files(),
            vec!["kbdA.conf".to_string(), "kbdB.conf".to_string(), "off.nope".to_string()]
        );
        assert_eq!(reloader.calls(), 1);
    }

    #[test]
    fn test_reconcile_leaves_enabled_state_alone() {
        let (toggler, fs, reloader) = toggler(&["off.nope", "kbdA.conf"]);
        let before = fs.files();

        assert!(reconcile(&toggler).unwrap().is_none());
        assert_eq!(fs.files(), before);
        assert_eq!(reloader.calls(), 0);
    }

    #[test]
    fn test_reconcile_unblocks_despite_keymap_conflict() {
        let (toggler, fs, reloader) = toggler(&["off.conf", "kbdA.nope", "kbdA.conf", "kbdB.nope"]);

        assert!(matches!(reconcile(&toggler), Err(ToggleError::Conflict(_))));
        assert!(fs.exists("off.nope").unwrap());
        assert!(!fs.exists("off.conf").unwrap());
        assert_eq!(toggler.state().unwrap(), PolicyState::Enabled);
        assert_eq!(reloader.calls(), 1);
    }

    #[test]
    fn test_reconcile_ignores_held_sentinel() {
        let (toggler, fs, _) = toggler(&["off.conf", "kbdA.nope", "gimmeasec.lock"]);

        reconcile(&toggler).unwrap();

        assert!(fs.exists("off.nope").unwrap());
        assert!(fs.exists("gimmeasec.lock").unwrap());
    }
}
