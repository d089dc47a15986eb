//! `poll(2)` array-scan readiness backend.
//!
//! Kept for portability and for systems without a kernel-registered
//! multiplexer; it is not expected to be competitive at scale. Subscription
//! changes only touch a sparse descriptor set and mark the dense poll
//! array dirty; the array is rebuilt at most once per [`poll`](Backend::poll)
//! call, so a burst of `monitor` calls costs a single rebuild.

use std::collections::BTreeSet;
use std::io;
use std::os::fd::RawFd;

use super::{timeout_ms, Backend, Readiness, SocketOp};
use crate::time::Time;

/// Array-scan multiplexer with deferred rebuild.
pub struct ScanBackend {
    /// Every descriptor currently watched.
    sockets: BTreeSet<RawFd>,

    /// Dense array handed to `poll(2)`, rebuilt from `sockets` when dirty.
    fds: Vec<libc::pollfd>,

    /// Set when `fds` no longer reflects `sockets`.
    dirty: bool,

    /// How many times the dense array has been rebuilt.
    rebuilds: u64,
}

impl ScanBackend {
    pub fn new() -> ScanBackend {
        ScanBackend {
            sockets: BTreeSet::new(),
            fds: Vec::new(),
            dirty: false,
            rebuilds: 0,
        }
    }

    /// Number of dense-array rebuilds so far. Diagnostic.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    fn rebuild(&mut self) {
        self.fds.clear();
        self.fds.extend(self.sockets.iter().map(|&fd| libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        }));
        self.dirty = false;
        self.rebuilds += 1;
    }
}

impl Default for ScanBackend {
    fn default() -> ScanBackend {
        ScanBackend::new()
    }
}

impl Backend for ScanBackend {
    fn socket_ops(&mut self, fd: RawFd, op: SocketOp) {
        match op {
            SocketOp::Added => {
                self.sockets.insert(fd);
            }
            SocketOp::Removed => {
                self.sockets.remove(&fd);
            }
        }
        self.dirty = true;
    }

    fn poll(&mut self, ready: &mut Vec<Readiness>, timeout: Time) -> bool {
        if self.dirty {
            self.rebuild();
        }
        if self.fds.is_empty() {
            return true;
        }

        let n = unsafe {
            libc::poll(
                self.fds.as_mut_ptr(),
                self.fds.len() as libc::nfds_t,
                timeout_ms(timeout),
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return true;
            }
            tracing::error!(error = %err, "poll failed");
            return false;
        }
        if n == 0 {
            return true;
        }

        for pfd in &self.fds {
            let readable = pfd.revents & libc::POLLIN != 0;
            let error = pfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0;
            if readable || error {
                ready.push(Readiness {
                    fd: pfd.fd,
                    readable,
                    error,
                    hangup: false,
                });
            }
        }
        true
    }
}
