// Tabletkbd Event Loop
// Read-decode-dispatch loop over the tablet-mode switch device

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::input::{EventReader, RawInputEvent};
use crate::lock::Lock;
use crate::policy::{PolicyFs, Reloader, Toggler, Transition};

/// Result type for event loop operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors that end the event loop
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Read from switch device failed: {0}")]
    Read(#[source] std::io::Error),
}

/// Counters reported when the stream ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    /// Whole records decoded
    pub records: u64,
    /// Tablet-mode switch events among them
    pub switch_events: u64,
    /// Transitions that completed
    pub transitions: u64,
    /// Transitions that failed (lock, rename or reload)
    pub failures: u64,
}

/// Stateless switch monitor.
///
/// Every tablet-mode event triggers a transition taken purely from the
/// event value, so repeated identical events repeat the (idempotent)
/// transition. Events are handled one at a time, in stream order, each
/// inside the lock.
pub struct Monitor<L, F, R> {
    lock: L,
    toggler: Toggler<F, R>,
}

impl<L: Lock, F: PolicyFs, R: Reloader> Monitor<L, F, R> {
    pub fn new(lock: L, toggler: Toggler<F, R>) -> Self {
        Self { lock, toggler }
    }

    /// Open a kernel device node and run until it ends
    pub fn run_device<P: AsRef<Path>>(&self, path: P) -> MonitorResult<MonitorSummary> {
        let path = path.as_ref();
        let mut reader = EventReader::open(path).map_err(|source| MonitorError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Listening for tablet mode events on {}", path.display());
        self.run(&mut reader)
    }

    /// Process records until end of stream.
    ///
    /// Transition failures are logged and counted; only read failures end
    /// the loop early.
    pub fn run<S: Read>(&self, reader: &mut EventReader<S>) -> MonitorResult<MonitorSummary> {
        let mut summary = MonitorSummary::default();

        while let Some(event) = reader.next_event().map_err(MonitorError::Read)? {
            summary.records += 1;
            self.handle_event(&event, &mut summary);
        }

        log::debug!("Event stream ended after {} record(s)", summary.records);
        Ok(summary)
    }

    /// Dispatch one record; non-switch records are ignored
    pub fn handle_event(&self, event: &RawInputEvent, summary: &mut MonitorSummary) {
        let Some(position) = event.switch_position() else {
            return;
        };
        summary.switch_events += 1;

        let transition = Transition::for_position(position);
        match transition {
            Transition::Disable => log::info!("Tablet mode, disabling keyboard"),
            Transition::Enable => log::info!("Laptop mode, enabling keyboard"),
        }

        match self.lock.with_lock(|| self.toggler.apply(transition)) {
            Ok(Ok(_)) => summary.transitions += 1,
            Ok(Err(e)) => {
                log::error!("Failed to {} keyboard: {}", transition, e);
                summary.failures += 1;
            }
            Err(e) => {
                log::error!("Could not take toggle lock: {}", e);
                summary.failures += 1;
            }
        }
    }
}
