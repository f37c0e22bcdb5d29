//! Timer queue ordering under random schedules.

use perch_runtime::TimerQueue;
use proptest::prelude::*;
use web_time::Duration;

proptest! {
    #[test]
    fn drained_timers_are_sorted_by_due_then_id(
        delays in prop::collection::vec(0u64..50, 1..40),
        cancel_mask in prop::collection::vec(any::<bool>(), 40),
    ) {
        let mut q = TimerQueue::new();
        let mut ids = Vec::new();
        for (i, d) in delays.iter().enumerate() {
            ids.push(q.schedule(Duration::ZERO, Duration::from_millis(*d), (i, *d)));
        }
        let mut cancelled = 0;
        for (id, cancel) in ids.iter().zip(&cancel_mask) {
            if *cancel && q.cancel(*id) {
                cancelled += 1;
            }
        }

        let mut fired = Vec::new();
        while let Some((id, payload)) = q.pop_due(Duration::from_millis(50)) {
            fired.push((payload.1, id));
        }
        prop_assert_eq!(fired.len() + cancelled, delays.len());
        let mut sorted = fired.clone();
        sorted.sort();
        prop_assert_eq!(fired, sorted);
    }
}
