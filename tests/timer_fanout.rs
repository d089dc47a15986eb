#![cfg(target_os = "linux")]

//! Scenario: a periodic timer descriptor wakes one fiber ten times; the
//! fiber then returns and the reactor drains itself.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use filament::net::TimerFd;
use filament::{EpollReactor, Fiber, PollReactor, Time};

const STACK: usize = 64 * 1024;

#[test]
fn ten_wakeups_then_automatic_removal() {
    let timer = TimerFd::new().unwrap();
    timer.start(Time::millis(100)).unwrap();
    let fd = timer.fd();

    let mut reactor = EpollReactor::new(Time::millis(500)).unwrap();
    let wakeups = Arc::new(AtomicUsize::new(0));
    let w = wakeups.clone();

    let mut worker = Fiber::new(move |cx| {
        for _ in 0..10 {
            let event = cx.wait();
            // Drain the expiration count so the level-triggered backend
            // does not re-report the same tick.
            let _ = timer.check();
            assert_eq!(event.fd, fd);
            w.fetch_add(1, Ordering::SeqCst);
        }
    });
    worker.start(STACK).unwrap();

    let id = reactor.adopt(worker);
    reactor.monitor(fd, id);

    let mut passes = 0;
    while reactor.active() {
        assert!(reactor.work());
        passes += 1;
        assert!(passes < 100, "reactor failed to drain");
    }

    assert_eq!(wakeups.load(Ordering::SeqCst), 10);
    assert!(!reactor.active());
    assert_eq!(reactor.fibers(), 0);
}

#[test]
fn scan_backend_drives_timers_too() {
    let timer = TimerFd::new().unwrap();
    timer.start(Time::millis(20)).unwrap();
    let fd = timer.fd();

    let mut reactor = PollReactor::new(Time::millis(200));
    let wakeups = Arc::new(AtomicUsize::new(0));
    let w = wakeups.clone();

    let mut worker = Fiber::new(move |cx| {
        for _ in 0..5 {
            cx.wait();
            let _ = timer.check();
            w.fetch_add(1, Ordering::SeqCst);
        }
    });
    worker.start(STACK).unwrap();

    let id = reactor.adopt(worker);
    reactor.monitor(fd, id);

    while reactor.active() {
        assert!(reactor.work());
    }
    assert_eq!(wakeups.load(Ordering::SeqCst), 5);
}

#[test]
fn one_shot_fires_once() {
    let timer = TimerFd::new().unwrap();
    timer.one_shot(Time::millis(10)).unwrap();
    let fd = timer.fd();

    let mut reactor = EpollReactor::new(Time::millis(200)).unwrap();
    let wakeups = Arc::new(AtomicUsize::new(0));
    let w = wakeups.clone();

    let mut worker = Fiber::new(move |cx| {
        let event = cx.wait();
        assert_eq!(event.fd, fd);
        let fired = timer.check().unwrap();
        assert_eq!(fired, 1);
        w.fetch_add(1, Ordering::SeqCst);
    });
    worker.start(STACK).unwrap();

    let id = reactor.adopt(worker);
    reactor.monitor(fd, id);

    while reactor.active() {
        assert!(reactor.work());
    }
    assert_eq!(wakeups.load(Ordering::SeqCst), 1);
}
