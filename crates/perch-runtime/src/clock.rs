#![forbid(unsafe_code)]

//! Host-advanced monotonic clock.

use web_time::Duration;

/// Monotonic clock driven entirely by the host.
///
/// Nothing in Perch reads wall-clock time; the host calls [`set`](Self::set)
/// or [`advance`](Self::advance) and then asks the controller to run due work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Current monotonic time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Set current monotonic time. Moving backwards is ignored.
    pub fn set(&mut self, now: Duration) {
        if now > self.now {
            self.now = now;
        }
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}
