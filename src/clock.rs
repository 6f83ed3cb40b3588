// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Clock sources for register timestamps.
//!
//! # Lamport Clock
//!
//! A monotonic counter. Local writes tick it; remote timestamps raise it,
//! so the next local write dominates every write this replica has seen.
//!
//! # Wall Clock
//!
//! Milliseconds since the Unix epoch, clamped so that it never runs behind
//! the largest timestamp observed. A replica whose wall clock lags still
//! produces writes that win against what it has already applied.
//!
//! Complexity: every operation is O(1).

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// A source of write timestamps.
pub trait Clock {
    /// Return a timestamp for a new local write.
    fn now(&mut self) -> u64;

    /// Account for a timestamp carried by a write from elsewhere.
    fn observe(&mut self, remote: u64);
}

/// A Lamport clock for ordering writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LamportClock {
    time: u64,
}

impl LamportClock {
    /// Create a new clock starting at 0.
    pub fn new() -> LamportClock {
        return LamportClock { time: 0 };
    }

    /// Get the current time.
    #[inline]
    pub fn time(&self) -> u64 {
        return self.time;
    }

    /// Increment the clock for a local event.
    /// Returns the new time. Stops at `u64::MAX`.
    #[inline]
    pub fn tick(&mut self) -> u64 {
        self.time = self.time.saturating_add(1);
        return self.time;
    }
}

impl Clock for LamportClock {
    fn now(&mut self) -> u64 {
        return self.tick();
    }

    fn observe(&mut self, remote: u64) {
        self.time = self.time.max(remote);
    }
}

/// A wall clock in milliseconds, never behind what it has observed.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock {
    floor: u64,
}

impl WallClock {
    pub fn new() -> WallClock {
        return WallClock { floor: 0 };
    }

    fn millis() -> u64 {
        return SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
    }
}

impl Clock for WallClock {
    fn now(&mut self) -> u64 {
        let time = Self::millis().max(self.floor.saturating_add(1));
        self.floor = time;
        return time;
    }

    fn observe(&mut self, remote: u64) {
        self.floor = self.floor.max(remote);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lamport_tick() {
        let mut clock = LamportClock::new();
        assert_eq!(clock.time(), 0);

        assert_eq!(clock.now(), 1);
        assert_eq!(clock.now(), 2);
        assert_eq!(clock.time(), 2);
    }

    #[test]
    fn lamport_observe() {
        let mut clock = LamportClock::new();
        clock.tick();

        clock.observe(5);
        assert_eq!(clock.now(), 6);

        // An older remote time leaves the clock alone
        clock.observe(3);
        assert_eq!(clock.now(), 7);
    }

    #[test]
    fn lamport_stops_at_the_ceiling() {
        let mut clock = LamportClock::new();
        clock.observe(u64::MAX);
        assert_eq!(clock.now(), u64::MAX);
        assert_eq!(clock.now(), u64::MAX);
    }

    #[test]
    fn wall_clock_is_monotonic() {
        let mut clock = WallClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b > a);
    }

    #[test]
    fn wall_clock_respects_observed_future() {
        let mut clock = WallClock::new();
        let far = u64::MAX / 2;
        clock.observe(far);
        assert_eq!(clock.now(), far + 1);

        clock.observe(u64::MAX);
        assert_eq!(clock.now(), u64::MAX);
    }
}
