use std::os::fd::RawFd;

/// What happened on a descriptor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Not applicable / uninitialized.
    #[default]
    Na,
    /// The descriptor has data available for reading.
    Read,
    /// Reserved: write readiness. No backend currently delivers it.
    Writable,
    /// The descriptor reported an error condition.
    Error,
    /// The peer closed or the descriptor hung up.
    Hangup,
}

/// A readiness notification delivered to a fiber.
///
/// Produced by the reactor when a backend reports a descriptor ready and
/// passed into [`Fiber::resume`](crate::Fiber::resume); the parked body
/// receives it as the return value of [`Yielder::wait`](crate::Yielder::wait).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,

    /// The descriptor it happened on.
    pub fd: RawFd,
}

impl Event {
    pub fn new(kind: EventKind, fd: RawFd) -> Event {
        Event { kind, fd }
    }
}
