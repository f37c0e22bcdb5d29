#![forbid(unsafe_code)]

//! Hover-intent dismissal.
//!
//! Leaving a hover region does not close its overlay immediately; it arms a
//! timer. Re-entering the region (or a sibling region sharing the intent)
//! before the timer fires cancels it.

use perch_runtime::{TimerId, TimerQueue};
use web_time::Duration;

use crate::overlay::OverlayKind;

/// Regions with delayed dismissal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoverRegion {
    /// The `...` trigger and the hidden-tools flyout.
    HiddenTools,
    /// The reply button, reply options and the reply context box.
    Reply,
}

impl HoverRegion {
    /// Overlays closed when the region's timer fires.
    pub const fn dismisses(self) -> &'static [OverlayKind] {
        match self {
            Self::HiddenTools => &[OverlayKind::HiddenTools],
            Self::Reply => &[OverlayKind::ReplyOptions],
        }
    }
}

/// Pending dismissal timer for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverIntent {
    region: HoverRegion,
    delay: Duration,
    pending: Option<TimerId>,
}

impl HoverIntent {
    #[must_use]
    pub const fn new(region: HoverRegion, delay: Duration) -> Self {
        Self {
            region,
            delay,
            pending: None,
        }
    }

    #[must_use]
    pub const fn region(&self) -> HoverRegion {
        self.region
    }

    #[must_use]
    pub const fn pending(&self) -> Option<TimerId> {
        self.pending
    }

    /// Pointer entered: cancel any pending dismissal.
    pub fn enter<T>(&mut self, timers: &mut TimerQueue<T>) -> bool {
        match self.pending.take() {
            Some(id) => timers.cancel(id),
            None => false,
        }
    }

    /// Pointer left: (re)arm the dismissal timer.
    pub fn leave<T>(&mut self, timers: &mut TimerQueue<T>, owner: u64, now: Duration, payload: T) {
        self.enter(timers);
        self.pending = Some(timers.schedule_owned(owner, now, self.delay, payload));
    }

    /// Called when timer `id` fires. Returns `true` if it is this intent's
    /// live timer, in which case the region should be dismissed.
    pub fn fire(&mut self, id: TimerId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn leave_then_fire_dismisses() {
        let mut timers = TimerQueue::new();
        let mut intent = HoverIntent::new(HoverRegion::Reply, ms(1000));
        intent.leave(&mut timers, 1, ms(0), "reply");
        assert_eq!(timers.pop_due(ms(999)), None);
        let (id, _) = timers.pop_due(ms(1000)).unwrap();
        assert!(intent.fire(id));
        assert_eq!(intent.pending(), None);
    }

    #[test]
    fn reenter_cancels() {
        let mut timers = TimerQueue::new();
        let mut intent = HoverIntent::new(HoverRegion::HiddenTools, ms(1000));
        intent.leave(&mut timers, 1, ms(0), ());
        assert!(intent.enter(&mut timers));
        assert!(timers.is_empty());
    }

    #[test]
    fn repeated_leave_keeps_one_timer() {
        let mut timers = TimerQueue::new();
        let mut intent = HoverIntent::new(HoverRegion::HiddenTools, ms(1000));
        intent.leave(&mut timers, 1, ms(0), ());
        intent.leave(&mut timers, 1, ms(500), ());
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_due(), Some(ms(1500)));
    }

    #[test]
    fn stale_id_is_ignored() {
        let mut timers: TimerQueue<()> = TimerQueue::new();
        let mut intent = HoverIntent::new(HoverRegion::Reply, ms(10));
        let stale = timers.schedule(ms(0), ms(0), ());
        intent.leave(&mut timers, 1, ms(0), ());
        assert!(!intent.fire(stale));
        assert!(intent.pending().is_some());
    }
}
