//! Thin OS wrappers used by the demos and end-to-end tests.
//!
//! Nothing here is part of the dispatch core: these are the collaborators
//! the reactor is driven with, such as pollable timer descriptors, eventfd
//! counters, and datagram/stream socket setup. All descriptors are created
//! non-blocking, since anything a fiber blocks on blocks the whole reactor.

#[cfg(target_os = "linux")]
mod eventfd;
mod socket;
#[cfg(target_os = "linux")]
mod timer;

#[cfg(target_os = "linux")]
pub use eventfd::EventFd;
pub use socket::{
    bind, join_multicast, set_nonblocking, sockaddr_in, tcp_socket, udp_socket,
};
#[cfg(target_os = "linux")]
pub use timer::TimerFd;
