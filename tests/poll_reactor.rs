#![cfg(target_os = "linux")]

//! Scenarios specific to the array-scan backend: deferred rebuild and the
//! bad-descriptor error path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use filament::net::EventFd;
use filament::{EventKind, Fiber, PollReactor, Time};

const STACK: usize = 64 * 1024;

fn counting_fiber(counter: Arc<AtomicUsize>) -> Fiber {
    let mut fiber = Fiber::new(move |cx| loop {
        cx.wait();
        counter.fetch_add(1, Ordering::SeqCst);
    });
    fiber.start(STACK).unwrap();
    fiber
}

#[test]
fn fresh_reactor_is_inactive() {
    let reactor = PollReactor::new(Time::millis(1));
    assert!(!reactor.active());
    assert_eq!(reactor.rebuilds(), 0);
}

#[test]
fn work_without_subscriptions_returns() {
    let mut reactor = PollReactor::new(Time::millis(1));
    assert!(reactor.work());
    assert!(!reactor.active());
    // Nothing was ever monitored, so the dense array never went dirty.
    assert_eq!(reactor.rebuilds(), 0);
}

#[test]
fn three_monitors_cost_one_rebuild() {
    let mut reactor = PollReactor::new(Time::millis(100));
    let efds: Vec<EventFd> = (0..3).map(|_| EventFd::new().unwrap()).collect();

    let hits = Arc::new(AtomicUsize::new(0));
    let id = reactor.adopt(counting_fiber(hits.clone()));
    for efd in &efds {
        reactor.monitor(efd.fd(), id);
        efd.add(1).unwrap();
    }
    assert_eq!(reactor.rebuilds(), 0);

    assert!(reactor.work());

    // One batched rebuild, and every descriptor was observed on it.
    assert_eq!(reactor.rebuilds(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    // A quiet follow-up pass does not rebuild again.
    for efd in &efds {
        efd.take().unwrap();
    }
    assert!(reactor.work());
    assert_eq!(reactor.rebuilds(), 1);
}

#[test]
fn eventfd_write_dispatches_read() {
    let mut reactor = PollReactor::new(Time::millis(100));
    let efd = EventFd::new().unwrap();
    let fd = efd.fd();

    let log = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    let mut fiber = Fiber::new(move |cx| loop {
        let event = cx.wait();
        l.lock().unwrap().push(event);
    });
    fiber.start(STACK).unwrap();
    let id = reactor.adopt(fiber);
    reactor.monitor(fd, id);

    efd.add(1).unwrap();
    assert!(reactor.work());

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].kind, EventKind::Read);
    assert_eq!(log[0].fd, fd);
}

#[test]
fn closed_descriptor_surfaces_error_and_cascades() {
    let mut reactor = PollReactor::new(Time::millis(100));

    let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK) };
    assert!(fd >= 0);

    let log = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    let mut fiber = Fiber::new(move |cx| loop {
        let event = cx.wait();
        l.lock().unwrap().push(event);
    });
    fiber.start(STACK).unwrap();
    let id = reactor.adopt(fiber);
    reactor.monitor(fd, id);
    assert!(reactor.active());

    // Close it behind the reactor's back: the scan sees POLLNVAL.
    unsafe {
        libc::close(fd);
    }
    assert!(reactor.work());

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].kind, EventKind::Error);
    assert_eq!(seen[0].fd, fd);
    assert!(!reactor.active());
    assert_eq!(reactor.fibers(), 0);
}

#[test]
fn remove_socket_marks_dirty_once_more() {
    let mut reactor = PollReactor::new(Time::millis(1));
    let efd = EventFd::new().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let id = reactor.adopt(counting_fiber(hits.clone()));

    reactor.monitor(efd.fd(), id);
    assert!(reactor.work());
    assert_eq!(reactor.rebuilds(), 1);

    reactor.remove_socket(efd.fd());
    assert!(!reactor.active());
    assert!(reactor.work());
    assert_eq!(reactor.rebuilds(), 2);
}
