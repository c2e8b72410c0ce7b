// Tabletkbd Policy Layer - Config Set Toggler
// Applies enable/disable transitions to the policy directory

use std::io;

use serde::Deserialize;

use super::fs::PolicyFs;
use super::reload::{ReloadError, Reloader};
use super::state::{Plan, PolicyLayout, PolicyState, RenameOp, Transition};

/// Result type for toggler operations
pub type ToggleResult<T> = Result<T, ToggleError>;

/// What to do when a rename in the middle of a batch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failure; reload only what was already renamed
    #[default]
    Abort,
    /// Attempt every rename, reload anyway, report failures afterwards
    Continue,
}

/// A rename that did not happen
#[derive(Debug)]
pub struct RenameFailure {
    pub op: RenameOp,
    pub error: io::Error,
}

/// Errors that can occur during a transition
#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    #[error("Cannot inspect policy directory: {0}")]
    Inspect(#[source] io::Error),

    #[error("Refusing to overwrite existing files: {}", format_ops(.0))]
    Conflict(Vec<RenameOp>),

    #[error("Partial transition: {} failed, {completed} completed, {skipped} skipped", format_failures(.failures))]
    Rename {
        failures: Vec<RenameFailure>,
        completed: usize,
        skipped: usize,
    },

    #[error("Policy reload failed: {0}")]
    Reload(#[from] ReloadError),
}

fn format_ops(ops: &[RenameOp]) -> String {
    ops.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_failures(failures: &[RenameFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.op, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Summary of a completed transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub transition: Transition,
    pub before: PolicyState,
    pub renamed: usize,
}

/// Owns the policy directory and the reload hook.
///
/// Each call re-lists the directory, so keymaps added or removed between
/// transitions are picked up.
pub struct Toggler<F, R> {
    fs: F,
    reloader: R,
    layout: PolicyLayout,
    on_error: FailurePolicy,
}

impl<F: PolicyFs, R: Reloader> Toggler<F, R> {
    pub fn new(fs: F, reloader: R, layout: PolicyLayout) -> Self {
        Self {
            fs,
            reloader,
            layout,
            on_error: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, on_error: FailurePolicy) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn layout(&self) -> &PolicyLayout {
        &self.layout
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Current state of the blocking policy
    pub fn state(&self) -> ToggleResult<PolicyState> {
        let listing = self.fs.list().map_err(ToggleError::Inspect)?;
        Ok(self.layout.state_of(&listing))
    }

    /// Unblock the keyboard and load the normal keymaps
    pub fn enable(&self) -> ToggleResult<TransitionReport> {
        self.apply(Transition::Enable)
    }

    /// Block the keyboard and park the normal keymaps
    pub fn disable(&self) -> ToggleResult<TransitionReport> {
        self.apply(Transition::Disable)
    }

    /// Plan a transition against the directory as it is right now
    pub fn plan(&self, transition: Transition) -> ToggleResult<Plan> {
        let listing = self.fs.list().map_err(ToggleError::Inspect)?;
        Ok(Plan::compute(&self.layout, &listing, transition))
    }

    pub fn apply(&self, transition: Transition) -> ToggleResult<TransitionReport> {
        let plan = self.plan(transition)?;

        match plan.before {
            PolicyState::Missing => log::warn!(
                "Neither {} nor {} exists; switching keymaps only",
                self.layout.blocking_active(),
                self.layout.blocking_inactive()
            ),
            state if state == transition.target_state() => {
                log::debug!("Blocking policy already {}", state)
            }
            _ => {}
        }

        for op in &plan.conflicts {
            log::warn!("Not renaming {}: destination exists", op);
        }

        let abort = self.on_error == FailurePolicy::Abort;
        let mut failures = Vec::new();
        let mut completed = 0;

        // The blocking policy moves before any keymap is looked at
        if let Some(op) = &plan.blocking {
            if !self.rename(op, &mut completed, &mut failures) && abort {
                return self.stop(completed, ToggleError::Rename {
                    failures,
                    completed,
                    skipped: plan.ops.len(),
                });
            }
        }

        if abort && !plan.conflicts.is_empty() {
            if completed > 0 {
                log::warn!("Keymaps left untouched; only the blocking policy was switched");
            }
            return self.stop(completed, ToggleError::Conflict(plan.conflicts));
        }

        for (index, op) in plan.ops.iter().enumerate() {
            if !self.rename(op, &mut completed, &mut failures) && abort {
                return self.stop(completed, ToggleError::Rename {
                    failures,
                    completed,
                    skipped: plan.ops.len() - index - 1,
                });
            }
        }

        // Continue mode counts the unexecuted conflicts as failures too
        for op in plan.conflicts {
            failures.push(RenameFailure {
                error: io::Error::new(io::ErrorKind::AlreadyExists, op.to.clone()),
                op,
            });
        }

        let reloaded = self.reloader.reload();

        if !failures.is_empty() {
            if let Err(e) = reloaded {
                log::error!("Policy reload failed: {}", e);
            }
            return Err(ToggleError::Rename {
                failures,
                completed,
                skipped: 0,
            });
        }
        reloaded?;

        log::info!(
            "Keyboard {}d ({} -> {}, {} file(s) renamed)",
            transition,
            plan.before,
            transition.target_state(),
            completed
        );

        Ok(TransitionReport {
            transition,
            before: plan.before,
            renamed: completed,
        })
    }

    /// Attempt one rename, recording the outcome
    fn rename(&self, op: &RenameOp, completed: &mut usize, failures: &mut Vec<RenameFailure>) -> bool {
        match self.fs.rename(&op.from, &op.to) {
            Ok(()) => {
                log::debug!("Renamed {}", op);
                *completed += 1;
                true
            }
            Err(error) => {
                log::error!("Rename {} failed: {}", op, error);
                failures.push(RenameFailure {
                    op: op.clone(),
                    error,
                });
                false
            }
        }
    }

    /// End an aborted batch, reloading whatever was already renamed
    fn stop(&self, completed: usize, error: ToggleError) -> ToggleResult<TransitionReport> {
        if completed > 0 {
            if let Err(e) = self.reloader.reload() {
                log::error!("Policy reload failed: {}", e);
            }
        }
        Err(error)
    }
}
