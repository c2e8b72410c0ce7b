// Tabletkbd Event Handling
// Switch monitoring loop and startup reconciliation

pub mod monitor;
pub mod startup;

pub use monitor::{Monitor, MonitorError, MonitorResult, MonitorSummary};
pub use startup::reconcile;
