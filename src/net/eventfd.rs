use std::io;
use std::os::fd::RawFd;

use crate::error::{Error, Result};

/// A pollable counter descriptor.
///
/// Wraps an `eventfd`: adding to the counter makes the descriptor
/// readable, which makes it a convenient wake source for reactor tests
/// and cross-fiber nudging.
pub struct EventFd {
    fd: RawFd,
}

impl EventFd {
    /// Creates a non-blocking eventfd with a zero counter.
    pub fn new() -> Result<EventFd> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(Error::Socket(io::Error::last_os_error()));
        }
        Ok(EventFd { fd })
    }

    /// Adds `n` to the counter, waking any poller watching the descriptor.
    pub fn add(&self, n: u64) -> io::Result<()> {
        let bytes = n.to_ne_bytes();
        let rc = unsafe {
            libc::write(
                self.fd,
                bytes.as_ptr() as *const libc::c_void,
                bytes.len(),
            )
        };
        if rc != bytes.len() as isize {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Reads and clears the counter without blocking. Returns 0 when the
    /// counter is already empty.
    pub fn take(&self) -> io::Result<u64> {
        let mut count: u64 = 0;
        let n = unsafe {
            libc::read(
                self.fd,
                &mut count as *mut u64 as *mut libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                return Ok(0);
            }
            return Err(err);
        }
        Ok(count)
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for EventFd {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
