//! Timer fan-out over both backends: periodic timer descriptors waking
//! fleets of fibers until every fiber has counted its ticks and returned.
//!
//! Run with `cargo run --example timers`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use filament::net::TimerFd;
use filament::{EpollReactor, Fiber, PollReactor, Time};

const STACK: usize = 64 * 1024;

fn worker(id: usize, ticks: usize, timers: Arc<Vec<TimerFd>>, total: Arc<AtomicUsize>) -> Fiber {
    let mut fiber = Fiber::new(move |cx| {
        for tick in 0..ticks {
            let event = cx.wait();
            for timer in timers.iter().filter(|timer| timer.fd() == event.fd) {
                let _ = timer.check();
            }
            total.fetch_add(1, Ordering::SeqCst);
            println!("worker {id}  fd {}  tick {tick}", event.fd);
        }
        println!("worker {id} done");
    });
    fiber.start(STACK).expect("fiber start");
    fiber
}

fn epoll_scene() {
    println!("--------- epoll, one timer, one worker");
    let timers = Arc::new(vec![TimerFd::new().expect("timerfd")]);
    timers[0].start(Time::millis(100)).expect("arm timer");

    let mut reactor = EpollReactor::new(Time::millis(500)).expect("reactor");
    let total = Arc::new(AtomicUsize::new(0));
    let id = reactor.adopt(worker(0, 10, timers.clone(), total.clone()));
    reactor.monitor(timers[0].fd(), id);

    while reactor.active() {
        reactor.work();
    }
    println!("epoll scene delivered {} ticks", total.load(Ordering::SeqCst));
}

fn poll_scene() {
    println!("--------- poll, one timer, one worker");
    let timers = Arc::new(vec![TimerFd::new().expect("timerfd")]);
    timers[0].start(Time::millis(100)).expect("arm timer");

    let mut reactor = PollReactor::new(Time::millis(500));
    let total = Arc::new(AtomicUsize::new(0));
    let id = reactor.adopt(worker(0, 10, timers.clone(), total.clone()));
    reactor.monitor(timers[0].fd(), id);

    while reactor.active() {
        reactor.work();
    }
    println!(
        "poll scene delivered {} ticks over {} rebuilds",
        total.load(Ordering::SeqCst),
        reactor.rebuilds()
    );
}

fn fleet_scene() {
    println!("--------- epoll, five timers, fifteen workers");
    let timers: Arc<Vec<TimerFd>> = Arc::new(
        (0..5)
            .map(|_| {
                let timer = TimerFd::new().expect("timerfd");
                timer.start(Time::millis(100)).expect("arm timer");
                timer
            })
            .collect(),
    );

    let mut reactor = EpollReactor::new(Time::millis(500)).expect("reactor");
    let total = Arc::new(AtomicUsize::new(0));
    for n in 0..15 {
        let id = reactor.adopt(worker(n, 10, timers.clone(), total.clone()));
        for timer in timers.iter() {
            reactor.monitor(timer.fd(), id);
        }
    }

    while reactor.active() {
        reactor.work();
    }
    println!("fleet scene delivered {} ticks", total.load(Ordering::SeqCst));
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    epoll_scene();
    poll_scene();
    fleet_scene();
}
