// Tabletkbd Policy Layer - Policy Engine Reload
// Signals the external policy engine to re-read its configuration

use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Errors that can occur while triggering a reload
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("Reload command is empty")]
    EmptyCommand,

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Status { program: String, status: String },
}

/// Something that makes the policy engine pick up renamed files.
pub trait Reloader {
    fn reload(&self) -> Result<(), ReloadError>;
}

/// Runs an external reload command such as `keyd reload`.
#[derive(Debug, Clone)]
pub struct CommandReloader {
    command: Vec<String>,
    check_status: bool,
}

impl CommandReloader {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            check_status: true,
        }
    }

    /// Ignore the exit status, as fire-and-forget callers expect
    pub fn with_check_status(mut self, check_status: bool) -> Self {
        self.check_status = check_status;
        self
    }
}

impl Reloader for CommandReloader {
    fn reload(&self) -> Result<(), ReloadError> {
        let (program, args) = self.command.split_first().ok_or(ReloadError::EmptyCommand)?;

        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| ReloadError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            if self.check_status {
                return Err(ReloadError::Status {
                    program: program.clone(),
                    status: status.to_string(),
                });
            }
            log::debug!("{} exited with {} (not checked)", program, status);
        }

        Ok(())
    }
}

/// Reloader that only counts invocations.
#[derive(Debug, Clone, Default)]
pub struct CountingReloader {
    calls: Arc<AtomicUsize>,
}

impl CountingReloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Reloader for CountingReloader {
    fn reload(&self) -> Result<(), ReloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_command() {
        let reloader = CommandReloader::new(vec!["true".to_string()]);
        assert!(reloader.reload().is_ok());
    }

    #[test]
    fn test_failing_command_checked() {
        let reloader = CommandReloader::new(vec!["false".to_string()]);
        assert!(matches!(reloader.reload(), Err(ReloadError::Status { .. })));
    }

    #[test]
    fn test_failing_command_unchecked() {
        let reloader = CommandReloader::new(vec!["false".to_string()]).with_check_status(false);
        assert!(reloader.reload().is_ok());
    }

    #[test]
    fn test_missing_program() {
        let reloader = CommandReloader::new(vec!["/nonexistent/keyd".to_string(), "reload".to_string()]);
        assert!(matches!(reloader.reload(), Err(ReloadError::Spawn { .. })));
    }

    #[test]
    fn test_empty_command() {
        let reloader = CommandReloader::new(Vec::new());
        assert!(matches!(reloader.reload(), Err(ReloadError::EmptyCommand)));
    }

    #[test]
    fn test_counting_reloader_shares_count() {
        let reloader = CountingReloader::new();
        let observer = reloader.clone();
        reloader.reload().unwrap();
        reloader.reload().unwrap();
        assert_eq!(observer.calls(), 2);
    }
}
