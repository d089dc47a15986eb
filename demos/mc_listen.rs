//! Multicast listener: joins a group on a UDP socket and prints a running
//! datagram rate computed with the sliding-window counter.
//!
//! Run with `cargo run --example mc_listen -- [group] [port]`
//! (defaults to 239.255.0.1:9124).

use std::net::Ipv4Addr;

use filament::net::{bind, join_multicast, set_nonblocking, udp_socket};
use filament::stats::RateCounter;
use filament::{Clock, EpollReactor, EventKind, Fiber, Time};

const STACK: usize = 64 * 1024;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let group: Ipv4Addr = args
        .next()
        .map(|arg| arg.parse().expect("multicast group address"))
        .unwrap_or(Ipv4Addr::new(239, 255, 0, 1));
    let port: u16 = args
        .next()
        .map(|arg| arg.parse().expect("port"))
        .unwrap_or(9124);

    let socket = udp_socket().expect("udp socket");
    set_nonblocking(socket).expect("nonblocking");
    bind(socket, Ipv4Addr::UNSPECIFIED, port).expect("bind");
    join_multicast(socket, group, None).expect("multicast join");
    println!("listening on {group}:{port}");

    let mut listener = Fiber::new(move |cx| {
        let mut rate = RateCounter::new(Time::secs(1), Time::millis(100));
        loop {
            let event = cx.wait();
            if event.kind != EventKind::Read {
                println!("socket reported {:?}, shutting down", event.kind);
                break;
            }
            loop {
                let mut buf = [0u8; 65536];
                let n = unsafe {
                    libc::recv(event.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0)
                };
                if n < 0 {
                    break;
                }
                rate.advance(Time::now(Clock::Monotonic));
                rate.add(1);
                println!("{n} bytes, {}/s over the last second", rate.count());
            }
        }
    });
    listener.start(STACK).expect("fiber start");

    let mut reactor = EpollReactor::new(Time::secs(1)).expect("reactor");
    let id = reactor.adopt(listener);
    reactor.monitor(socket, id);

    while reactor.active() {
        reactor.work();
    }

    unsafe {
        libc::close(socket);
    }
}
