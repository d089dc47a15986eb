//! # Filament
//!
//! **Filament** is a single-threaded event-driven runtime: user logic is
//! written as stackful light threads ([`Fiber`]s) that cooperatively yield
//! while awaiting readiness on file descriptors, and a [`Reactor`]
//! multiplexes that readiness and resumes the right fibers when it occurs.
//!
//! The core is deliberately small:
//!
//! - A **reactor** keeping a bidirectional subscription relation between
//!   descriptors and fibers, with two readiness backends: level-triggered
//!   `epoll` ([`EpollReactor`]) and a portable `poll(2)` array scan
//!   ([`PollReactor`]).
//! - **Fibers** with owned stacks and a strict `wait`/`resume` handoff;
//!   a fiber cancels itself by returning from its body, which removes it
//!   from every subscription it held.
//! - A generational slot store ([`utils::slab`]) that owns the fibers and
//!   recycles slots, keeping the dispatch path free of allocation.
//! - A nanosecond [`Time`] type used for timeouts, timers and telemetry.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use filament::{EpollReactor, Fiber, Time};
//! use filament::net::TimerFd;
//!
//! let timer = TimerFd::new()?;
//! timer.start(Time::millis(100))?;
//!
//! let mut reactor = EpollReactor::new(Time::millis(500))?;
//! let mut worker = Fiber::new(move |cx| {
//!     for tick in 0..10 {
//!         let event = cx.wait();
//!         let _ = timer.check();
//!         println!("tick {tick} on fd {}", event.fd);
//!     }
//! });
//! worker.start(64 * 1024)?;
//!
//! let id = reactor.adopt(worker);
//! reactor.monitor(timer.fd(), id);
//! while reactor.active() {
//!     reactor.work();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`reactor`]: subscription store, dispatch, readiness backends
//! - [`fiber`]: the stackful coroutine primitive
//! - [`time`]: nanosecond instants and intervals
//! - [`net`]: timer/event descriptors and socket setup for drivers
//! - [`stats`]: histogram and sliding-rate telemetry
//! - [`utils`]: the generational slot store

mod error;

pub mod fiber;
pub mod net;
pub mod reactor;
pub mod stats;
pub mod time;
pub mod utils;

pub use error::{Error, Result};
pub use fiber::{Fiber, FiberId, Yielder};
pub use reactor::{Backend, Event, EventKind, Handle, PollReactor, Reactor};
pub use time::{CalendarTime, Clock, Time};

#[cfg(target_os = "linux")]
pub use reactor::EpollReactor;
