//! The subscription-and-dispatch core.
//!
//! A [`Reactor`] couples three things:
//! - a dual-keyed subscription store relating descriptors to fibers,
//! - a slot store owning the fibers themselves,
//! - a readiness [`Backend`](poller::Backend) reporting which descriptors
//!   have something to deliver.
//!
//! Driving a reactor is a plain loop:
//!
//! ```rust,ignore
//! let mut reactor = EpollReactor::new(Time::millis(500))?;
//! let mut fiber = Fiber::new(|cx| loop {
//!     let event = cx.wait();
//!     // handle event.fd ...
//! });
//! fiber.start(64 * 1024)?;
//! let id = reactor.adopt(fiber);
//! reactor.monitor(fd, id);
//! while reactor.active() {
//!     reactor.work();
//! }
//! ```

mod core;
pub mod event;
pub mod poller;
mod subs;

pub use self::core::{Handle, Reactor};
pub use self::event::{Event, EventKind};
pub use self::poller::{Backend, Readiness, ScanBackend, SocketOp};

#[cfg(target_os = "linux")]
pub use self::poller::EpollBackend;

/// Reactor over the level-triggered kernel-registered multiplexer.
#[cfg(target_os = "linux")]
pub type EpollReactor = Reactor<EpollBackend>;

/// Reactor over the `poll(2)` array-scan multiplexer.
pub type PollReactor = Reactor<ScanBackend>;
