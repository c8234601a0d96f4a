use std::fmt;

use chrono::{DateTime, Utc};

/// A simple clock abstraction for deterministic timestamps in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

//
// ─── ELAPSED ──────────────────────────────────────────────────────────────────
//

/// Whole seconds spent playing, counted one tick at a time.
///
/// Tick counting is the source of truth; nothing here looks at wall-clock time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Elapsed(u32);

impl Elapsed {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    #[must_use]
    pub fn secs(self) -> u32 {
        self.0
    }

    /// Advance by one tick (one second).
    pub fn tick(&mut self) {
        self.0 = self.0.saturating_add(1);
    }
}

/// Formats as `MM:SS`; minutes keep growing past 99 instead of wrapping.
impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_stands_still() {
        let clock = Clock::fixed(fixed_now());
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().timestamp(), FIXED_TEST_TIMESTAMP);
    }

    #[test]
    fn elapsed_formats_minutes_and_seconds() {
        assert_eq!(Elapsed::ZERO.to_string(), "00:00");
        assert_eq!(Elapsed::from_secs(65).to_string(), "01:05");
        assert_eq!(Elapsed::from_secs(6_000).to_string(), "100:00");
    }

    #[test]
    fn elapsed_tick_saturates() {
        let mut elapsed = Elapsed::from_secs(u32::MAX);
        elapsed.tick();
        assert_eq!(elapsed.secs(), u32::MAX);

        let mut elapsed = Elapsed::ZERO;
        elapsed.tick();
        elapsed.tick();
        assert_eq!(elapsed.secs(), 2);
    }
}
