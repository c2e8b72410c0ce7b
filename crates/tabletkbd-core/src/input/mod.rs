// Tabletkbd Input Layer
// Kernel event decoding for the tablet-mode switch

mod event;
mod reader;

pub use event::{RawInputEvent, SwitchPosition, EVENT_SIZE, EV_SW, SW_TABLET_MODE};
pub use reader::EventReader;
