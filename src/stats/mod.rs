//! Telemetry helpers: a fixed-bin histogram and a sliding-window rate
//! counter. Both are fixed-size after construction so they can sit on the
//! hot path of a dispatch loop.

mod histogram;
mod rate;

pub use histogram::{Histogram, Stats};
pub use rate::RateCounter;
