//! Linux `epoll`-based readiness backend.
//!
//! Responsibilities:
//! - Register a descriptor with the kernel when it gains its first
//!   subscriber, level-triggered for readability, read-side hangup, urgent
//!   data and errors.
//! - Deregister when the last subscriber leaves, tolerating descriptors
//!   the kernel already forgot (closed elsewhere).
//! - Block for one batch of events in a fixed-capacity buffer.
//!
//! Registration failures are diagnostics, not failures of `work()`: a bad
//! descriptor will surface as an error event on the next poll.

use std::io;
use std::os::fd::RawFd;

use libc::{
    epoll_create1, epoll_ctl, epoll_event, epoll_wait, EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLPRI,
    EPOLLRDHUP, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL,
};

use super::{timeout_ms, Backend, Readiness, SocketOp};
use crate::error::{Error, Result};
use crate::time::Time;

/// Default capacity of the event buffer handed to `epoll_wait`.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Level-triggered kernel-registered multiplexer.
pub struct EpollBackend {
    /// The epoll instance descriptor.
    epoll: RawFd,

    /// Reusable buffer filled by `epoll_wait`.
    events: Vec<epoll_event>,
}

impl EpollBackend {
    /// Creates the epoll instance with an event buffer of `max_events`.
    pub fn new(max_events: usize) -> Result<EpollBackend> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(Error::Backend(io::Error::last_os_error()));
        }
        Ok(EpollBackend {
            epoll,
            events: Vec::with_capacity(max_events.max(1)),
        })
    }
}

impl Backend for EpollBackend {
    fn socket_ops(&mut self, fd: RawFd, op: SocketOp) {
        if self.epoll < 0 {
            return;
        }
        match op {
            SocketOp::Added => {
                let mut event = epoll_event {
                    events: (EPOLLIN | EPOLLRDHUP | EPOLLPRI | EPOLLERR) as u32,
                    u64: fd as u64,
                };
                let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_ADD, fd, &mut event) };
                if rc != 0 {
                    tracing::warn!(
                        fd,
                        error = %io::Error::last_os_error(),
                        "epoll registration failed"
                    );
                }
            }
            SocketOp::Removed => {
                let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
                if rc != 0 {
                    let err = io::Error::last_os_error();
                    // The descriptor may have been closed before the last
                    // subscriber left; the kernel then already dropped it.
                    let raw = err.raw_os_error();
                    if raw != Some(libc::ENOENT) && raw != Some(libc::EBADF) {
                        tracing::warn!(fd, error = %err, "epoll deregistration failed");
                    }
                }
            }
        }
    }

    fn poll(&mut self, ready: &mut Vec<Readiness>, timeout: Time) -> bool {
        if self.epoll < 0 {
            return false;
        }

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms(timeout),
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return true;
            }
            tracing::error!(error = %err, "epoll_wait failed");
            return false;
        }
        unsafe {
            self.events.set_len(n as usize);
        }

        for event in &self.events {
            let bits = event.events;
            ready.push(Readiness {
                fd: event.u64 as RawFd,
                readable: bits & (EPOLLIN | EPOLLPRI) as u32 != 0,
                error: bits & EPOLLERR as u32 != 0,
                hangup: bits & (EPOLLHUP | EPOLLRDHUP) as u32 != 0,
            });
        }
        true
    }
}

impl Drop for EpollBackend {
    fn drop(&mut self) {
        if self.epoll >= 0 {
            unsafe {
                libc::close(self.epoll);
            }
        }
    }
}
