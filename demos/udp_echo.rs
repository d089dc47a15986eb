//! UDP echo driver: one fiber owns a datagram socket and echoes every
//! datagram back to its sender. A second fiber answers a periodic timer
//! and prints a liveness line, sharing the same reactor.
//!
//! Run with `cargo run --example udp_echo`, then e.g.
//! `echo hi | nc -u 127.0.0.1 9123`.

use std::net::Ipv4Addr;

use filament::net::{bind, set_nonblocking, udp_socket, TimerFd};
use filament::{EpollReactor, EventKind, Fiber, Time};

const STACK: usize = 64 * 1024;
const PORT: u16 = 9123;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let socket = udp_socket().expect("udp socket");
    set_nonblocking(socket).expect("nonblocking");
    bind(socket, Ipv4Addr::LOCALHOST, PORT).expect("bind");
    println!("echoing datagrams on 127.0.0.1:{PORT}");

    let mut echo = Fiber::new(move |cx| loop {
        let event = cx.wait();
        if event.kind != EventKind::Read {
            println!("socket reported {:?}, shutting down", event.kind);
            break;
        }
        // Drain every datagram the readiness covered.
        loop {
            let mut buf = [0u8; 2048];
            let mut peer: libc::sockaddr_in = unsafe { std::mem::zeroed() };
            let mut peer_len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
            let n = unsafe {
                libc::recvfrom(
                    event.fd,
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                    0,
                    &mut peer as *mut libc::sockaddr_in as *mut libc::sockaddr,
                    &mut peer_len,
                )
            };
            if n < 0 {
                break;
            }
            unsafe {
                libc::sendto(
                    event.fd,
                    buf.as_ptr() as *const libc::c_void,
                    n as usize,
                    0,
                    &peer as *const libc::sockaddr_in as *const libc::sockaddr,
                    peer_len,
                );
            }
            println!("echoed {n} bytes");
        }
    });
    echo.start(STACK).expect("fiber start");

    let heartbeat_timer = TimerFd::new().expect("timerfd");
    heartbeat_timer.start(Time::secs(5)).expect("arm timer");
    let heartbeat_fd = heartbeat_timer.fd();
    let mut heartbeat = Fiber::new(move |cx| loop {
        cx.wait();
        let _ = heartbeat_timer.check();
        println!("still listening on 127.0.0.1:{PORT}");
    });
    heartbeat.start(STACK).expect("fiber start");

    let mut reactor = EpollReactor::new(Time::secs(1)).expect("reactor");
    let echo_id = reactor.adopt(echo);
    let heartbeat_id = reactor.adopt(heartbeat);
    reactor.monitor(socket, echo_id);
    reactor.monitor(heartbeat_fd, heartbeat_id);

    while reactor.active() {
        reactor.work();
    }

    unsafe {
        libc::close(socket);
    }
}
