// Tabletkbd Policy Layer
// Policy file set: state inspection, planning and transitions

pub mod fs;
pub mod reload;
pub mod state;
pub mod toggler;

pub use fs::{DirFs, MemoryFs, PolicyFs};
pub use reload::{CommandReloader, CountingReloader, ReloadError, Reloader};
pub use state::{Plan, PolicyLayout, PolicyState, RenameOp, Transition};
pub use toggler::{FailurePolicy, RenameFailure, ToggleError, ToggleResult, Toggler, TransitionReport};
