// Tabletkbd Input Layer - Kernel Event Records
// Fixed-width input_event decoding and switch classification

/// EV_SW event type code from input-event-codes.h
pub const EV_SW: u16 = 0x05;

/// SW_TABLET_MODE switch code from input-event-codes.h
pub const SW_TABLET_MODE: u16 = 0x01;

/// Size in bytes of one kernel `struct input_event` on 64-bit Linux.
pub const EVENT_SIZE: usize = 24;

/// Raw input event as laid out by the kernel on a 64-bit target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputEvent {
    /// Event timestamp (seconds)
    pub time_sec: i64,

    /// Event timestamp (microseconds)
    pub time_usec: i64,

    /// Event type (EV_SW = 0x05)
    pub event_type: u16,

    /// Event code within the type
    pub code: u16,

    /// Event value (for switches: 1 = engaged, 0 = released)
    pub value: i32,
}

/// Physical position reported by the tablet-mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchPosition {
    /// Folded into tablet configuration; keyboard should be blocked
    Tablet,
    /// Regular clamshell use; keyboard should work
    Laptop,
}

impl RawInputEvent {
    pub fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            time_sec: 0,
            time_usec: 0,
            event_type,
            code,
            value,
        }
    }

    /// Decode one record from exactly `EVENT_SIZE` native-endian bytes.
    pub fn from_bytes(buf: &[u8; EVENT_SIZE]) -> Self {
        let mut sec = [0u8; 8];
        let mut usec = [0u8; 8];
        let mut ty = [0u8; 2];
        let mut code = [0u8; 2];
        let mut value = [0u8; 4];
        sec.copy_from_slice(&buf[0..8]);
        usec.copy_from_slice(&buf[8..16]);
        ty.copy_from_slice(&buf[16..18]);
        code.copy_from_slice(&buf[18..20]);
        value.copy_from_slice(&buf[20..24]);

        Self {
            time_sec: i64::from_ne_bytes(sec),
            time_usec: i64::from_ne_bytes(usec),
            event_type: u16::from_ne_bytes(ty),
            code: u16::from_ne_bytes(code),
            value: i32::from_ne_bytes(value),
        }
    }

    /// Encode into the kernel layout. Used to build synthetic streams.
    pub fn to_bytes(&self) -> [u8; EVENT_SIZE] {
        let mut buf = [0u8; EVENT_SIZE];
        buf[0..8].copy_from_slice(&self.time_sec.to_ne_bytes());
        buf[8..16].copy_from_slice(&self.time_usec.to_ne_bytes());
        buf[16..18].copy_from_slice(&self.event_type.to_ne_bytes());
        buf[18..20].copy_from_slice(&self.code.to_ne_bytes());
        buf[20..24].copy_from_slice(&self.value.to_ne_bytes());
        buf
    }

    /// Check if this is a tablet-mode switch event
    pub fn is_tablet_switch(&self) -> bool {
        self.event_type == EV_SW && self.code == SW_TABLET_MODE
    }

    /// Classify a tablet-mode switch event.
    ///
    /// Returns `None` for every other event class. A value of 1 means tablet
    /// mode; any other value is treated as laptop mode.
    pub fn switch_position(&self) -> Option<SwitchPosition> {
        if !self.is_tablet_switch() {
            return None;
        }
        if self.value == 1 {
            Some(SwitchPosition::Tablet)
        } else {
            Some(SwitchPosition::Laptop)
        }
    }
}
