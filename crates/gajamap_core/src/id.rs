//! Time-seeded identifier generator for trips and items.
//!
//! # Invariants
//! - Ids returned by one generator are strictly increasing, even when the
//!   clock does not advance (or goes backwards) between calls.
//! - After `observe(id)`, every later id is greater than `id`.

use chrono::Utc;

/// Millisecond clock source. Injectable so tests stay deterministic.
pub type Clock = fn() -> i64;

fn system_clock() -> i64 {
    Utc::now().timestamp_millis()
}

/// Issues unique ids that still read as creation timestamps.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    last: i64,
    clock: Clock,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::with_clock(system_clock)
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self { last: 0, clock }
    }

    /// Returns the clock value, bumped past the last issued id if needed.
    pub fn next_id(&mut self) -> i64 {
        let now = (self.clock)();
        let id = if now > self.last { now } else { self.last + 1 };
        self.last = id;
        id
    }

    /// Raises the floor so later ids never collide with `id`.
    pub fn observe(&mut self, id: i64) {
        self.last = self.last.max(id);
    }
}
