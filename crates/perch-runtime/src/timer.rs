#![forbid(unsafe_code)]

//! Deferred work keyed by owner.
//!
//! Every suspension point in Perch (zero-delay deferrals, the keyboard
//! selection settle, hover-intent dismissal) is a [`TimerQueue`] entry. Timers
//! fire in `(due, id)` order, so two zero-delay timers scheduled back to back
//! run in scheduling order. Removing a panel cancels everything it owns with
//! [`TimerQueue::cancel_owner`].

use std::collections::BTreeMap;

use web_time::Duration;

/// Handle returned by [`TimerQueue::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    owner: Option<u64>,
    payload: T,
}

/// Ordered queue of pending timers carrying payloads of type `T`.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: BTreeMap<(Duration, u64), Entry<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }

    /// Schedule `payload` to fire at `now + delay`.
    pub fn schedule(&mut self, now: Duration, delay: Duration, payload: T) -> TimerId {
        self.insert(now.saturating_add(delay), None, payload)
    }

    /// Schedule a timer owned by `owner` (typically a panel id).
    pub fn schedule_owned(
        &mut self,
        owner: u64,
        now: Duration,
        delay: Duration,
        payload: T,
    ) -> TimerId {
        self.insert(now.saturating_add(delay), Some(owner), payload)
    }

    fn insert(&mut self, due: Duration, owner: Option<u64>, payload: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert((due, id), Entry { owner, payload });
        TimerId(id)
    }

    /// Cancel one timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.entries.keys().find(|(_, k)| *k == id.0).copied();
        key.is_some_and(|key| self.entries.remove(&key).is_some())
    }

    /// Cancel every timer owned by `owner`; returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.owner != Some(owner));
        before - self.entries.len()
    }

    /// Pop the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, T)> {
        let (&(due, id), _) = self.entries.first_key_value()?;
        if due > now {
            return None;
        }
        self.entries
            .remove(&(due, id))
            .map(|entry| (TimerId(id), entry.payload))
    }

    /// Due time of the earliest pending timer.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.keys().any(|(_, k)| *k == id.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_in_due_then_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(ms(0), ms(100), "settle");
        q.schedule(ms(0), ms(0), "first");
        q.schedule(ms(0), ms(0), "second");

        assert_eq!(q.pop_due(ms(0)).map(|(_, p)| p), Some("first"));
        assert_eq!(q.pop_due(ms(0)).map(|(_, p)| p), Some("second"));
        assert_eq!(q.pop_due(ms(99)), None);
        assert_eq!(q.pop_due(ms(100)).map(|(_, p)| p), Some("settle"));
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut q = TimerQueue::new();
        let id = q.schedule(ms(0), ms(10), ());
        assert!(q.is_pending(id));
        assert!(q.cancel(id));
        assert!(!q.cancel(id));
        assert_eq!(q.pop_due(ms(10)), None);
    }

    #[test]
    fn cancel_owner_only_drops_owned() {
        let mut q = TimerQueue::new();
        q.schedule_owned(1, ms(0), ms(5), 'a');
        q.schedule_owned(1, ms(0), ms(6), 'b');
        q.schedule_owned(2, ms(0), ms(7), 'c');
        q.schedule(ms(0), ms(8), 'd');
        assert_eq!(q.cancel_owner(1), 2);
        assert_eq!(q.len(), 2);
        assert_eq!(q.next_due(), Some(ms(7)));
    }
}
