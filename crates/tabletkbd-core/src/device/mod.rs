// Tabletkbd Device Layer
// Discovery of the tablet-mode switch kernel device

mod inventory;
mod resolver;

pub use inventory::{find_kernel_path, InventoryMatch, TABLET_SWITCH_MARKER};
pub use resolver::{
    DeviceResolver, EvdevResolver, FixedResolver, LibinputResolver, ResolveError, ResolveResult,
};
