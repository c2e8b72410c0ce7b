// Tabletkbd Core Library
// Tablet-mode switch monitoring and keyboard policy toggling

pub mod config;
pub mod device;
pub mod event;
pub mod input;
pub mod lock;
pub mod policy;

pub use config::{Config, ConfigError, DeviceSource};
pub use device::{DeviceResolver, ResolveError, ResolveResult};
pub use event::{reconcile, Monitor, MonitorError, MonitorResult, MonitorSummary};
pub use input::{EventReader, RawInputEvent, SwitchPosition};
pub use lock::{AnyLock, Lock, LockError, LockMode, LockResult};
pub use policy::{
    CommandReloader, DirFs, FailurePolicy, MemoryFs, PolicyFs, PolicyLayout, PolicyState,
    Reloader, ToggleError, ToggleResult, Toggler, Transition, TransitionReport,
};
