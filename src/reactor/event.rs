use bitflags::bitflags;
use std::os::fd::RawFd;

/// Opaque identity of a pollable resource. The instance never owns or closes it.
pub type RawHandle = RawFd;

bitflags! {
    /// Event mask and trigger flags, bit-compatible with the C header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Events: u32 {
        /// Readable.
        const IN = 1 << 0;
        /// Writable.
        const OUT = 1 << 1;
        /// Hang-up. Always reported.
        const HUP = 1 << 2;
        /// Error. Always reported.
        const ERR = 1 << 6;
        /// Edge-triggered.
        const ET = 1 << 8;
        /// One-shot.
        const ONESHOT = 1 << 9;
    }
}

impl Events {
    /// Bits reported whether or not they were requested.
    pub const ALWAYS_REPORTED: Events = Events::HUP.union(Events::ERR);

    /// Bits that describe readiness, as opposed to trigger flags.
    pub const READINESS: Events = Events::IN
        .union(Events::OUT)
        .union(Events::HUP)
        .union(Events::ERR);

    /// Interest with the trigger flags stripped.
    pub fn readiness(self) -> Events {
        self & Events::READINESS
    }

    /// Trigger mode selected by the `ET` and `ONESHOT` flags.
    pub fn trigger(self) -> TriggerMode {
        match (self.contains(Events::ET), self.contains(Events::ONESHOT)) {
            (false, false) => TriggerMode::Level,
            (false, true) => TriggerMode::Oneshot,
            (true, false) => TriggerMode::Edge,
            (true, true) => TriggerMode::EdgeOneshot,
        }
    }
}

/// How a registration keeps reporting once it became ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerMode {
    /// Reported on every wait while the condition holds.
    Level,

    /// Reported once when it becomes ready, then silent until the registration is modified.
    Edge,

    /// Reported once, then silent until the registration is modified.
    Oneshot,

    /// Edge-triggered and one-shot.
    EdgeOneshot,
}

impl TriggerMode {
    /// Whether the registration is re-armed automatically after being reported.
    pub fn rearms(self) -> bool {
        matches!(self, TriggerMode::Level)
    }
}

/// User data carried by a registration and handed back with every event.
///
/// Stored by value; the instance never dereferences a [`Payload::Ptr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Payload {
    /// Pointer-sized value.
    Ptr(usize),
    /// Small signed integer, usually a descriptor.
    Fd(i32),
    /// 32-bit value.
    U32(u32),
    /// 64-bit value.
    U64(u64),
    /// OS handle.
    Handle(RawHandle),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::U64(0)
    }
}

/// An interest registration on input and a ready event on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Event {
    /// Requested mask and trigger flags, or the reported readiness.
    pub events: Events,

    /// User payload.
    pub data: Payload,
}

impl Event {
    pub fn new(events: Events, data: Payload) -> Self {
        Self { events, data }
    }

    /// An event with no interest bits.
    pub fn none(data: Payload) -> Self {
        Self::new(Events::empty(), data)
    }

    pub fn readable(data: Payload) -> Self {
        Self::new(Events::IN, data)
    }

    pub fn writable(data: Payload) -> Self {
        Self::new(Events::OUT, data)
    }

    fn with(mut self, bits: Events, value: bool) -> Self {
        self.events.set(bits, value);
        self
    }

    pub fn with_readable(self, value: bool) -> Self {
        self.with(Events::IN, value)
    }

    pub fn with_writable(self, value: bool) -> Self {
        self.with(Events::OUT, value)
    }

    pub fn with_edge(self, value: bool) -> Self {
        self.with(Events::ET, value)
    }

    pub fn with_oneshot(self, value: bool) -> Self {
        self.with(Events::ONESHOT, value)
    }

    pub fn is_readable(&self) -> bool {
        self.events.contains(Events::IN)
    }

    pub fn is_writable(&self) -> bool {
        self.events.contains(Events::OUT)
    }

    pub fn is_hangup(&self) -> bool {
        self.events.contains(Events::HUP)
    }

    pub fn is_error(&self) -> bool {
        self.events.contains(Events::ERR)
    }
}
