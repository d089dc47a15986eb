#![cfg(target_os = "linux")]

//! End-to-end scenarios over the epoll backend with real descriptors.

use std::os::fd::RawFd;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use filament::net::EventFd;
use filament::{EpollReactor, Event, EventKind, Fiber, Time};

const STACK: usize = 64 * 1024;

fn looping_recorder(log: Arc<Mutex<Vec<Event>>>) -> Fiber {
    let mut fiber = Fiber::new(move |cx| loop {
        let event = cx.wait();
        log.lock().unwrap().push(event);
    });
    fiber.start(STACK).unwrap();
    fiber
}

#[test]
fn fresh_reactor_is_inactive() {
    let reactor = EpollReactor::new(Time::millis(1)).unwrap();
    assert!(!reactor.active());
}

#[test]
fn custom_event_buffer_capacities() {
    for capacity in [16, 256, 1024] {
        let reactor = EpollReactor::with_capacity(Time::millis(1), capacity).unwrap();
        assert!(!reactor.active());
    }
}

#[test]
fn work_without_subscriptions_times_out() {
    let mut reactor = EpollReactor::new(Time::millis(1)).unwrap();
    assert!(reactor.work());
    assert!(!reactor.active());
}

#[test]
fn nonblocking_timeout_returns_immediately() {
    let mut reactor = EpollReactor::new(Time::zero()).unwrap();
    let start = std::time::Instant::now();
    assert!(reactor.work());
    assert!(start.elapsed() < std::time::Duration::from_millis(100));
}

#[test]
fn eventfd_write_dispatches_one_read() {
    let mut reactor = EpollReactor::new(Time::millis(100)).unwrap();
    let efd = EventFd::new().unwrap();
    let fd = efd.fd();

    let log = Arc::new(Mutex::new(Vec::new()));
    let id = reactor.adopt(looping_recorder(log.clone()));
    reactor.monitor(fd, id);

    efd.add(1).unwrap();
    assert!(reactor.work());

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].kind, EventKind::Read);
    assert_eq!(log[0].fd, fd);
}

#[test]
fn two_subscribers_both_receive_the_event() {
    let mut reactor = EpollReactor::new(Time::millis(100)).unwrap();
    let efd = EventFd::new().unwrap();
    let fd = efd.fd();

    let log_a = Arc::new(Mutex::new(Vec::new()));
    let log_b = Arc::new(Mutex::new(Vec::new()));
    let a = reactor.adopt(looping_recorder(log_a.clone()));
    let b = reactor.adopt(looping_recorder(log_b.clone()));
    reactor.monitor(fd, a);
    reactor.monitor(fd, b);

    efd.add(1).unwrap();
    assert!(reactor.work());

    for log in [&log_a, &log_b] {
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, EventKind::Read);
        assert_eq!(log[0].fd, fd);
    }
}

#[test]
fn multiple_descriptors_fan_in_to_one_fiber() {
    let mut reactor = EpollReactor::new(Time::millis(100)).unwrap();
    let efds: Vec<EventFd> = (0..3).map(|_| EventFd::new().unwrap()).collect();

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let mut fiber = Fiber::new(move |cx| loop {
        cx.wait();
        h.fetch_add(1, Ordering::SeqCst);
    });
    fiber.start(STACK).unwrap();
    let id = reactor.adopt(fiber);

    for efd in &efds {
        reactor.monitor(efd.fd(), id);
        efd.add(1).unwrap();
    }
    assert!(reactor.work());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[test]
fn duplicate_monitor_dispatches_once() {
    let mut reactor = EpollReactor::new(Time::millis(100)).unwrap();
    let efd = EventFd::new().unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let id = reactor.adopt(looping_recorder(log.clone()));
    reactor.monitor(efd.fd(), id);
    reactor.monitor(efd.fd(), id);
    assert_eq!(reactor.subscriptions(), 1);

    efd.add(1).unwrap();
    assert!(reactor.work());
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn remove_socket_deactivates() {
    let mut reactor = EpollReactor::new(Time::millis(1)).unwrap();
    let efd = EventFd::new().unwrap();
    let id = reactor.adopt({
        let mut fiber = Fiber::new(|cx| loop {
            cx.wait();
        });
        fiber.start(STACK).unwrap();
        fiber
    });
    reactor.monitor(efd.fd(), id);
    assert!(reactor.active());

    reactor.remove_socket(efd.fd());
    assert!(!reactor.active());

    // A write after removal must not wake anyone.
    efd.add(1).unwrap();
    assert!(reactor.work());
}

#[test]
fn hangup_cascade_unsubscribes_the_descriptor() {
    let mut reactor = EpollReactor::new(Time::millis(100)).unwrap();

    // A pipe whose write end is closed reports a read-side hangup.
    let mut ends: [RawFd; 2] = [-1, -1];
    let rc = unsafe { libc::pipe(ends.as_mut_ptr()) };
    assert_eq!(rc, 0);
    let (read_end, write_end) = (ends[0], ends[1]);

    let log = Arc::new(Mutex::new(Vec::new()));
    let id = reactor.adopt(looping_recorder(log.clone()));
    reactor.monitor(read_end, id);
    assert!(reactor.active());

    unsafe {
        libc::close(write_end);
    }
    assert!(reactor.work());

    let seen = log.lock().unwrap().clone();
    assert!(!seen.is_empty());
    assert!(seen
        .iter()
        .any(|event| matches!(event.kind, EventKind::Hangup | EventKind::Error)));
    assert!(!reactor.active());

    unsafe {
        libc::close(read_end);
    }
}

#[test]
fn completion_drains_the_reactor() {
    let mut reactor = EpollReactor::new(Time::millis(100)).unwrap();
    let efd = EventFd::new().unwrap();

    let mut fiber = Fiber::new(|cx| {
        cx.wait();
    });
    fiber.start(STACK).unwrap();
    let id = reactor.adopt(fiber);
    reactor.monitor(efd.fd(), id);

    efd.add(1).unwrap();
    assert!(reactor.work());
    assert!(!reactor.active());
    assert_eq!(reactor.fibers(), 0);
}
