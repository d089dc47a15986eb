//! Readiness backends.
//!
//! A [`Backend`] is the mechanism behind a reactor that actually watches
//! descriptors: it is told when a descriptor gains its first subscriber or
//! loses its last one, and it produces one batch of readiness reports per
//! [`poll`](Backend::poll) call. Two realizations ship:
//!
//! - [`EpollBackend`]: level-triggered `epoll` with a kernel registration
//!   per watched descriptor.
//! - [`ScanBackend`]: a `poll(2)` array scan rebuilt lazily from a sparse
//!   descriptor set.

use std::os::fd::RawFd;

use crate::time::Time;

#[cfg(target_os = "linux")]
mod epoll;
mod scan;

#[cfg(target_os = "linux")]
pub use epoll::{EpollBackend, DEFAULT_EVENT_CAPACITY};
pub use scan::ScanBackend;

/// Subscription transitions reported to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOp {
    /// The descriptor gained its first subscriber.
    Added,
    /// The descriptor lost its last subscriber.
    Removed,
}

/// One descriptor's readiness flags out of a single poll batch.
///
/// The flags are independent; more than one may be set at once.
#[derive(Debug, Clone, Copy)]
pub struct Readiness {
    pub fd: RawFd,
    pub readable: bool,
    pub error: bool,
    pub hangup: bool,
}

/// The readiness-reporting mechanism behind a [`Reactor`](crate::Reactor).
pub trait Backend {
    /// Reacts to a subscriber-count transition on `fd`.
    fn socket_ops(&mut self, fd: RawFd, op: SocketOp);

    /// Blocks up to `timeout` and appends one batch of readiness reports,
    /// in the order the mechanism produced them.
    ///
    /// A negative timeout blocks indefinitely, zero returns immediately,
    /// positive values are truncated to whole milliseconds. Returns `false`
    /// only on a fatal multiplexer-level error.
    fn poll(&mut self, ready: &mut Vec<Readiness>, timeout: Time) -> bool;
}

/// Converts a reactor timeout to the millisecond form poll syscalls take.
pub(crate) fn timeout_ms(timeout: Time) -> i32 {
    if timeout < Time::zero() {
        -1
    } else {
        timeout.as_millis().clamp(0, i32::MAX as i64) as i32
    }
}
