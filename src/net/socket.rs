//! Socket setup helpers.
//!
//! Creation, binding and option plumbing for the descriptors the demos
//! monitor. Reading and writing stay in user code: the reactor only
//! reports readiness.

use std::io;
use std::net::Ipv4Addr;
use std::os::fd::RawFd;

use crate::error::{Error, Result};

fn socket_err<T>() -> Result<T> {
    Err(Error::Socket(io::Error::last_os_error()))
}

/// Creates a UDP socket.
pub fn udp_socket() -> Result<RawFd> {
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return socket_err();
    }
    Ok(fd)
}

/// Creates a TCP socket with `SO_REUSEADDR` set.
pub fn tcp_socket() -> Result<RawFd> {
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0) };
    if fd < 0 {
        return socket_err();
    }
    let one: libc::c_int = 1;
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &one as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        let err = Error::Socket(io::Error::last_os_error());
        unsafe {
            libc::close(fd);
        }
        return Err(err);
    }
    Ok(fd)
}

/// Builds an IPv4 socket address.
pub fn sockaddr_in(addr: Ipv4Addr, port: u16) -> libc::sockaddr_in {
    let mut out: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    out.sin_family = libc::AF_INET as libc::sa_family_t;
    out.sin_port = port.to_be();
    out.sin_addr = libc::in_addr {
        s_addr: u32::from(addr).to_be(),
    };
    out
}

/// Binds `fd` to `addr:port`.
pub fn bind(fd: RawFd, addr: Ipv4Addr, port: u16) -> Result<()> {
    let sa = sockaddr_in(addr, port);
    let rc = unsafe {
        libc::bind(
            fd,
            &sa as *const libc::sockaddr_in as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return socket_err();
    }
    Ok(())
}

/// Puts `fd` into non-blocking mode.
pub fn set_nonblocking(fd: RawFd) -> Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return socket_err();
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc != 0 {
        return socket_err();
    }
    Ok(())
}

/// Joins `fd` to the multicast `group` on `interface`, or on all
/// interfaces when `interface` is `None`.
pub fn join_multicast(fd: RawFd, group: Ipv4Addr, interface: Option<Ipv4Addr>) -> Result<()> {
    let mreq = libc::ip_mreq {
        imr_multiaddr: libc::in_addr {
            s_addr: u32::from(group).to_be(),
        },
        imr_interface: libc::in_addr {
            s_addr: u32::from(interface.unwrap_or(Ipv4Addr::UNSPECIFIED)).to_be(),
        },
    };
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::IPPROTO_IP,
            libc::IP_ADD_MEMBERSHIP,
            &mreq as *const libc::ip_mreq as *const libc::c_void,
            std::mem::size_of::<libc::ip_mreq>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return socket_err();
    }
    Ok(())
}
