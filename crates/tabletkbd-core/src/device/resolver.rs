// Tabletkbd Device Layer - Resolvers
// Turns a device inventory source into a kernel device path

use std::path::PathBuf;
use std::process::Command;

use evdev::SwitchType;

use super::inventory::{find_kernel_path, InventoryMatch};

/// Result type for device resolution
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors that can occur while resolving the switch device
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Tablet mode switch not found: {0}")]
    NotFound(String),

    #[error("Inventory command failed: {0}")]
    Command(String),
}

/// Locates the kernel device node of the tablet-mode switch.
pub trait DeviceResolver {
    fn resolve(&self) -> ResolveResult<PathBuf>;
}

/// Resolver backed by the textual output of `libinput list-devices`.
#[derive(Debug, Clone)]
pub struct LibinputResolver {
    command: Vec<String>,
    marker: String,
}

impl LibinputResolver {
    pub fn new(command: Vec<String>, marker: impl Into<String>) -> Self {
        Self {
            command,
            marker: marker.into(),
        }
    }

    /// Parse an already captured inventory
    pub fn resolve_from(&self, inventory: &str) -> ResolveResult<PathBuf> {
        match find_kernel_path(inventory, &self.marker) {
            InventoryMatch::Found(path) => Ok(path),
            InventoryMatch::MissingKernelPath => Err(ResolveError::NotFound(format!(
                "'{}' listed without a kernel device path",
                self.marker
            ))),
            InventoryMatch::NoDevice => Err(ResolveError::NotFound(format!(
                "no device labelled '{}'",
                self.marker
            ))),
        }
    }

    fn run_inventory(&self) -> ResolveResult<String> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ResolveError::Command("empty inventory command".to_string()))?;

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ResolveError::Command(format!("spawn {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(ResolveError::Command(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DeviceResolver for LibinputResolver {
    fn resolve(&self) -> ResolveResult<PathBuf> {
        let inventory = self.run_inventory()?;
        self.resolve_from(&inventory)
    }
}

/// Resolver that walks `/dev/input` and picks the first device advertising
/// the SW_TABLET_MODE switch.
#[derive(Debug, Clone, Default)]
pub struct EvdevResolver;

impl DeviceResolver for EvdevResolver {
    fn resolve(&self) -> ResolveResult<PathBuf> {
        for (path, device) in evdev::enumerate() {
            let has_switch = device
                .supported_switches()
                .map(|switches| switches.contains(SwitchType::SW_TABLET_MODE))
                .unwrap_or(false);

            if has_switch {
                log::debug!(
                    "evdev: {} ({}) reports SW_TABLET_MODE",
                    device.name().unwrap_or("Unknown"),
                    path.display()
                );
                return Ok(path);
            }
        }

        Err(ResolveError::NotFound(
            "no evdev device reports SW_TABLET_MODE".to_string(),
        ))
    }
}

/// Resolver for an explicitly configured device path
#[derive(Debug, Clone)]
pub struct FixedResolver(pub PathBuf);

impl DeviceResolver for FixedResolver {
    fn resolve(&self) -> ResolveResult<PathBuf> {
        if self.0.exists() {
            Ok(self.0.clone())
        } else {
            Err(ResolveError::NotFound(format!(
                "{} does not exist",
                self.0.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> LibinputResolver {
        LibinputResolver::new(
            vec!["libinput".to_string(), "list-devices".to_string()],
            "Tablet Mode Switch",
        )
    }

    #[test]
    fn test_resolve_from_inventory() {
        let inventory = "Device: Tablet Mode Switch\nKernel: /dev/input/event5\n";
        assert_eq!(
            resolver().resolve_from(inventory).unwrap(),
            PathBuf::from("/dev/input/event5")
        );
    }

    #[test]
    fn test_resolve_from_inventory_not_found() {
        let err = resolver().resolve_from("Device: Lid Switch\n").unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(_)));
    }

    #[test]
    fn test_missing_command_is_reported() {
        let resolver = LibinputResolver::new(
            vec!["/nonexistent/tabletkbd-inventory".to_string()],
            "Tablet Mode Switch",
        );
        assert!(matches!(resolver.resolve(), Err(ResolveError::Command(_))));
    }

    #[test]
    fn test_empty_command_is_reported() {
        let resolver = LibinputResolver::new(Vec::new(), "Tablet Mode Switch");
        assert!(matches!(resolver.resolve(), Err(ResolveError::Command(_))));
    }

    #[test]
    fn test_failing_command_is_reported() {
        let resolver = LibinputResolver::new(vec!["false".to_string()], "Tablet Mode Switch");
        assert!(matches!(resolver.resolve(), Err(ResolveError::Command(_))));
    }

    #[test]
    fn test_command_output_is_parsed() {
        let resolver = LibinputResolver::new(
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "printf 'Device: Tablet Mode Switch\\nKernel: /dev/input/event11\\n'".to_string(),
            ],
            "Tablet Mode Switch",
        );
        assert_eq!(resolver.resolve().unwrap(), PathBuf::from("/dev/input/event11"));
    }

    #[test]
    fn test_fixed_resolver_missing_path() {
        let resolver = FixedResolver(PathBuf::from("/nonexistent/event99"));
        assert!(matches!(resolver.resolve(), Err(ResolveError::NotFound(_))));
    }
}
