//! Simulation time model.
//!
//! # Design
//!
//! Time is a monotonically increasing `Tick` counter measured in simulated
//! milliseconds.  Everything that "waits" does so by registering an event at
//! an absolute `Tick`; there is no wall-clock anywhere in the engine, so a
//! replay of the same command log advances through the identical sequence of
//! ticks.
//!
//! Using an integer millisecond as the canonical unit means all schedule
//! arithmetic is exact (no floating-point drift) and comparisons are O(1).

use std::fmt;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation time in milliseconds.
///
/// Stored as `u64`: at 1 ms resolution a u64 lasts ~585 million years of
/// simulated time.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `ms` milliseconds after `self`.
    #[inline]
    pub fn offset(self, ms: u64) -> Tick {
        Tick(self.0 + ms)
    }

    /// Milliseconds elapsed from `earlier` to `self`.
    ///
    /// Saturates at zero if `earlier` is in the future.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── GameClock ─────────────────────────────────────────────────────────────────

/// Tracks the current simulation time.
///
/// The clock never moves backwards: [`advance_to`](Self::advance_to) panics
/// on regression because a backwards step would mean the event timeline was
/// drained out of order — an engine defect, not a data problem.
#[derive(Clone, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct GameClock {
    now: Tick,
}

impl GameClock {
    pub fn new() -> Self {
        Self { now: Tick::ZERO }
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Move the clock forward to `tick`.
    pub fn advance_to(&mut self, tick: Tick) {
        assert!(tick >= self.now, "clock moved backwards: {} -> {}", self.now, tick);
        self.now = tick;
    }

    /// Break the current time into (hours, minutes, seconds) for logging.
    pub fn hms(&self) -> (u64, u32, u32) {
        let total_secs = self.now.0 / 1_000;
        let hours = total_secs / 3_600;
        let minutes = ((total_secs % 3_600) / 60) as u32;
        let seconds = (total_secs % 60) as u32;
        (hours, minutes, seconds)
    }
}

impl fmt::Display for GameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = self.hms();
        write!(f, "{} ({:02}:{:02}:{:02})", self.now, h, m, s)
    }
}
