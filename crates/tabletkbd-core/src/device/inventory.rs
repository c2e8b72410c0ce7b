// Tabletkbd Device Layer - Inventory Parsing
// Locates the tablet-mode switch in `libinput list-devices` output

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

/// Label substring libinput uses for the tablet-mode switch device
pub const TABLET_SWITCH_MARKER: &str = "Tablet Mode Switch";

fn device_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Device:\s*(.*?)\s*$").expect("valid device regex"))
}

fn kernel_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Kernel:.*?\s(/dev/\S.*?)\s*$").expect("valid kernel regex"))
}

/// Outcome of scanning one inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryMatch {
    /// Marker found and followed by a kernel path
    Found(PathBuf),
    /// Marker found but no usable `Kernel:` line followed it
    MissingKernelPath,
    /// No device label contains the marker
    NoDevice,
}

/// Scan an inventory for the first device whose label contains `marker`.
///
/// Once a matching `Device:` line is seen, the next `Kernel:` line supplies
/// the path. Only the first matching device is honored; if several devices
/// share the marker the later ones are ignored.
pub fn find_kernel_path(inventory: &str, marker: &str) -> InventoryMatch {
    let mut found = false;

    for line in inventory.lines() {
        let line = line.trim_start();

        if !found {
            if let Some(caps) = device_line().captures(line) {
                if caps[1].contains(marker) {
                    found = true;
                }
            }
            continue;
        }

        if line.starts_with("Kernel:") {
            return match kernel_line().captures(line) {
                Some(caps) => InventoryMatch::Found(PathBuf::from(&caps[1])),
                None => InventoryMatch::MissingKernelPath,
            };
        }
    }

    if found {
        InventoryMatch::MissingKernelPath
    } else {
        InventoryMatch::NoDevice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = "\
Device:           Power Button
Kernel:           /dev/input/event2
Group:            1
Seat:             seat0, default
Capabilities:     keyboard

Device:           Lid Switch
Kernel:           /dev/input/event0
Group:            2
Capabilities:     switch

Device:           Intel HID switches
Kernel:           /dev/input/event9
Capabilities:     switch

Device:           Tablet Mode Switch
Kernel:           /dev/input/event7
Group:            4
Seat:             seat0, default
Capabilities:     switch
";

    #[test]
    fn test_finds_tablet_switch() {
        assert_eq!(
            find_kernel_path(INVENTORY, TABLET_SWITCH_MARKER),
            InventoryMatch::Found(PathBuf::from("/dev/input/event7"))
        );
    }

    #[test]
    fn test_no_matching_device() {
        let inventory = "Device: Power Button\nKernel: /dev/input/event2\n";
        assert_eq!(
            find_kernel_path(inventory, TABLET_SWITCH_MARKER),
            InventoryMatch::NoDevice
        );
    }

    #[test]
    fn test_empty_inventory() {
        assert_eq!(find_kernel_path("", TABLET_SWITCH_MARKER), InventoryMatch::NoDevice);
    }

    #[test]
    fn test_marker_without_kernel_line() {
        let inventory = "Device: Tablet Mode Switch\nGroup: 4\n";
        assert_eq!(
            find_kernel_path(inventory, TABLET_SWITCH_MARKER),
            InventoryMatch::MissingKernelPath
        );
    }

    #[test]
    fn test_kernel_line_without_dev_token() {
        let inventory = "Device: Tablet Mode Switch\nKernel: unknown\n";
        assert_eq!(
            find_kernel_path(inventory, TABLET_SWITCH_MARKER),
            InventoryMatch::MissingKernelPath
        );
    }

    #[test]
    fn test_only_first_match_is_honored() {
        let inventory = "\
Device: Tablet Mode Switch
Kernel: /dev/input/event7
Device: Virtual Tablet Mode Switch
Kernel: /dev/input/event21
";
        assert_eq!(
            find_kernel_path(inventory, TABLET_SWITCH_MARKER),
            InventoryMatch::Found(PathBuf::from("/dev/input/event7"))
        );
    }

    #[test]
    fn test_kernel_lines_before_match_are_skipped() {
        let inventory = "Kernel: /dev/input/event1\nDevice: Tablet Mode Switch\nKernel: /dev/input/event3\n";
        assert_eq!(
            find_kernel_path(inventory, TABLET_SWITCH_MARKER),
            InventoryMatch::Found(PathBuf::from("/dev/input/event3"))
        );
    }

    #[test]
    fn test_marker_in_attribute_line_is_not_a_label() {
        let inventory = "Group: Tablet Mode Switch\nKernel: /dev/input/event3\n";
        assert_eq!(
            find_kernel_path(inventory, TABLET_SWITCH_MARKER),
            InventoryMatch::NoDevice
        );
    }

    #[test]
    fn test_trailing_whitespace_is_trimmed() {
        let inventory = "Device: Tablet Mode Switch\nKernel:   /dev/input/event7   \n";
        assert_eq!(
            find_kernel_path(inventory, TABLET_SWITCH_MARKER),
            InventoryMatch::Found(PathBuf::from("/dev/input/event7"))
        );
    }
}
