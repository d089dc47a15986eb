use crate::time::Time;

/// A sliding-window event counter.
///
/// The window is a ring of buckets, each `precision` wide. [`add`]
/// counts into the current bucket; [`advance`] moves the window to a new
/// time, expiring buckets that fell out of it. The running total is the
/// event count over the last `window` of time, accurate to one bucket.
///
/// [`add`]: RateCounter::add
/// [`advance`]: RateCounter::advance
#[derive(Debug, Clone)]
pub struct RateCounter {
    slots: Vec<u64>,
    precision: Time,
    last_index: u64,
    cursor: usize,
    total: u64,
}

impl RateCounter {
    /// A counter expiring events older than `window`, bucketed by
    /// `precision`.
    ///
    /// # Panics
    ///
    /// Panics when `precision` is not positive or exceeds `window`.
    pub fn new(window: Time, precision: Time) -> RateCounter {
        assert!(precision > Time::zero(), "precision must be positive");
        let buckets = window.as_nanos() / precision.as_nanos();
        assert!(buckets > 0, "window must cover at least one bucket");
        RateCounter {
            slots: vec![0; buckets as usize],
            precision,
            last_index: 0,
            cursor: 0,
            total: 0,
        }
    }

    /// Counts `events` into the current bucket.
    pub fn add(&mut self, events: u64) {
        self.slots[self.cursor] += events;
        self.total += events;
    }

    /// Moves the window to `now`, expiring buckets it slid past. Moving
    /// backwards is a no-op.
    pub fn advance(&mut self, now: Time) {
        let index = (now.as_nanos() / self.precision.as_nanos()) as u64;
        if index <= self.last_index {
            return;
        }
        let len = self.slots.len() as u64;
        if index > self.last_index + len {
            // The whole window slid past; nothing survives.
            self.total = 0;
            self.slots.fill(0);
        } else {
            for j in self.last_index + 1..=index {
                let slot = (j % len) as usize;
                self.total -= self.slots[slot];
                self.slots[slot] = 0;
            }
        }
        self.last_index = index;
        self.cursor = (index % len) as usize;
    }

    /// Events counted within the current window.
    pub fn count(&self) -> u64 {
        self.total
    }
}
