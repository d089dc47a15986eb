use std::io;
use std::os::fd::RawFd;

use crate::error::{Error, Result};
use crate::time::Time;

/// A pollable timer descriptor.
///
/// Wraps a `timerfd`, a kernel facility that makes a file descriptor
/// readable at a requested cadence, so timers ride the same reactor as
/// sockets instead of a parallel scheduler. The descriptor never changes
/// over the life of the object and can be monitored right after creation.
pub struct TimerFd {
    fd: RawFd,
}

fn as_timespec(interval: Time) -> libc::timespec {
    let secs = interval.as_secs();
    let nanos = (interval - Time::secs(secs)).as_nanos();
    libc::timespec {
        tv_sec: secs as libc::time_t,
        tv_nsec: nanos as libc::c_long,
    }
}

impl TimerFd {
    /// Creates a stopped, non-blocking timer descriptor.
    pub fn new() -> Result<TimerFd> {
        let fd = unsafe {
            libc::timerfd_create(libc::CLOCK_MONOTONIC, libc::TFD_NONBLOCK | libc::TFD_CLOEXEC)
        };
        if fd < 0 {
            return Err(Error::Timer(io::Error::last_os_error()));
        }
        Ok(TimerFd { fd })
    }

    /// Fires repeatedly every `interval`, starting one `interval` from now.
    pub fn start(&self, interval: Time) -> Result<()> {
        self.arm(interval, interval, false)
    }

    /// Fires repeatedly every `interval` after `delay`. With `absolute`,
    /// `delay` names a point on the monotonic clock instead of an offset.
    pub fn start_delayed(&self, delay: Time, interval: Time, absolute: bool) -> Result<()> {
        self.arm(delay, interval, absolute)
    }

    /// Fires once, `delay` from now.
    pub fn one_shot(&self, delay: Time) -> Result<()> {
        self.arm(delay, Time::zero(), false)
    }

    /// Disarms the timer.
    pub fn stop(&self) -> Result<()> {
        self.arm(Time::zero(), Time::zero(), false)
    }

    fn arm(&self, delay: Time, interval: Time, absolute: bool) -> Result<()> {
        let spec = libc::itimerspec {
            it_interval: as_timespec(interval),
            it_value: as_timespec(delay),
        };
        let flags = if absolute { libc::TFD_TIMER_ABSTIME } else { 0 };
        let rc = unsafe { libc::timerfd_settime(self.fd, flags, &spec, std::ptr::null_mut()) };
        if rc != 0 {
            return Err(Error::Timer(io::Error::last_os_error()));
        }
        Ok(())
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Reads and clears the pending expiration count without blocking.
    /// Returns 0 when no expiration is pending.
    pub fn check(&self) -> io::Result<u64> {
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
}

impl Drop for TimerFd {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
