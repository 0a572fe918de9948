// Compositor to target timestamp reconciliation
//
// The compositor stamps its events with milliseconds from its own
// monotonic clock. The target wants tick counts. The two clocks have
// unrelated epochs, so we track the offset between them and nudge it
// whenever the compositor appears to be ahead of us.
//
// Austin Shafer - 2020
use utils::timing;

/// How far ahead of our clock a compositor stamp may land before we
/// stop treating it as drift
const MAX_FORWARD_SKEW: u32 = 10000;

/// A source of target tick counts
pub trait Clock: Send {
    fn tick_count(&self) -> u32;
}

/// The real monotonic tick count
pub struct TickClock;

impl Clock for TickClock {
    fn tick_count(&self) -> u32 {
        timing::get_tick_count()
    }
}

pub struct TimestampReconciler {
    /// compositor time - target time. Unset until the first nonzero
    /// compositor stamp arrives.
    tr_adjust: Option<u32>,
    tr_clock: Box<dyn Clock>,
}

impl TimestampReconciler {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            tr_adjust: None,
            tr_clock: clock,
        }
    }

    pub fn adjust(&self) -> Option<u32> {
        self.tr_adjust
    }

    /// Turn a compositor timestamp into a target tick count
    ///
    /// All arithmetic wraps, both clocks being 32-bit millisecond
    /// counters.
    pub fn reconcile(&mut self, time: u32) -> u32 {
        let now = self.tr_clock.tick_count();

        let adjust = match self.tr_adjust {
            Some(a) => a,
            None => {
                if time != 0 {
                    self.tr_adjust = Some(time.wrapping_sub(now));
                }
                return now;
            }
        };

        let mut candidate = time.wrapping_sub(adjust);
        if time != 0 && candidate > now && candidate - now < MAX_FORWARD_SKEW {
            // we are behind the compositor, pull the offset forward
            self.tr_adjust = Some(adjust.wrapping_add(candidate - now));
            candidate = now;
        }

        return candidate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// A clock the test moves by hand
    struct FakeClock(Arc<AtomicU32>);

    impl Clock for FakeClock {
        fn tick_count(&self) -> u32 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn reconciler(start: u32) -> (TimestampReconciler, Arc<AtomicU32>) {
        let ticks = Arc::new(AtomicU32::new(start));
        (
            TimestampReconciler::new(Box::new(FakeClock(ticks.clone()))),
            ticks,
        )
    }

    #[test]
    fn first_stamp_sets_adjust() {
        let (mut tr, _) = reconciler(5000);

        assert_eq!(tr.reconcile(123456), 5000);
        assert_eq!(tr.adjust(), Some(123456 - 5000));
    }

    #[test]
    fn zero_stamp_does_not_initialize() {
        let (mut tr, _) = reconciler(700);

        assert_eq!(tr.reconcile(0), 700);
        assert_eq!(tr.adjust(), None);
    }

    #[test]
    fn increasing_stamps_give_non_decreasing_ticks() {
        let (mut tr, ticks) = reconciler(1_000);
        let mut last = 0;

        // the compositor clock runs a little faster than ours
        for i in 0..200u32 {
            ticks.store(1_000 + i * 9, Ordering::SeqCst);
            let out = tr.reconcile(40_000 + i * 10);
            assert!(out >= last, "{} went backwards from {}", out, last);
            last = out;
        }
    }

    #[test]
    fn forward_drift_is_clamped() {
        let (mut tr, ticks) = reconciler(1_000);
        tr.reconcile(10_000);

        ticks.store(1_100, Ordering::SeqCst);
        // 50ms ahead of where our clock says we are
        assert_eq!(tr.reconcile(10_150), 1_100);
        assert_eq!(tr.adjust(), Some(10_150 - 1_100));

        // large jumps are passed through unchanged
        assert_eq!(tr.reconcile(10_150 + 20_000), 1_100 + 20_000);
    }

    #[test]
    fn wraps_around() {
        let (mut tr, ticks) = reconciler(u32::MAX - 10);
        tr.reconcile(100);

        ticks.store(5, Ordering::SeqCst);
        assert_eq!(tr.reconcile(116), 5);
    }
}
