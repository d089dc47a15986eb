//! Context-switch benchmark: ping-pongs a fiber a million times and
//! reports the round-trip cost through the histogram.
//!
//! Run with `cargo run --release --example switch_rate`.

use filament::stats::Histogram;
use filament::{Clock, Event, EventKind, Fiber, Time};

const STACK: usize = 64 * 1024;
const ROUNDS: usize = 1_000_000;
const BATCH: usize = 1000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut fiber = Fiber::new(|cx| loop {
        cx.wait();
    });
    fiber.start(STACK).expect("fiber start");

    // Bins span 0..50 µs per batched round trip.
    let mut histogram: Histogram<100> = Histogram::new(0.0, 50_000.0);
    let event = Event::new(EventKind::Read, 0);

    let begin = Time::now(Clock::Monotonic);
    let mut batch_start = begin;
    for round in 1..=ROUNDS {
        fiber.resume(&event);
        if round % BATCH == 0 {
            let now = Time::now(Clock::Monotonic);
            let per_switch = (now - batch_start).as_nanos() as f64 / BATCH as f64;
            histogram.add(per_switch);
            batch_start = now;
        }
    }
    let elapsed = Time::now(Clock::Monotonic) - begin;

    let stats = histogram.summary();
    println!("{ROUNDS} round trips in {} ms", elapsed.as_millis());
    println!(
        "per switch: median {:.0} ns, average {:.0} ns, min {:.0} ns, max {:.0} ns",
        stats.median,
        stats.average,
        histogram.min_seen(),
        histogram.max_seen()
    );
    println!(
        "rate: {:.0} switches/s",
        ROUNDS as f64 / (elapsed.as_nanos() as f64 / 1e9)
    );
}
