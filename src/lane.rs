use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One of the two lanes of a [`TwoLaneQueue`](crate::TwoLaneQueue).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LaneKind {
    Fast,
    Slow,
}

impl LaneKind {
    /// Label used when reporting depth gauges.
    pub fn as_str(&self) -> &'static str {
        match self {
            LaneKind::Fast => "fast",
            LaneKind::Slow => "slow",
        }
    }
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides which lane an item belongs in.
///
/// The queue asks on every push and touch, and calls `on_dequeue` once an item has been
/// popped. Implementations are shared with callers outside the queue, so they must be safe to
/// use from several threads at once.
pub trait Lane<T>: Send + Sync {
    /// `true` if `item` currently belongs in the slow lane. Items the lane knows nothing about
    /// are slow.
    fn should_defer(&self, item: &T) -> bool;

    /// The item left the queue. Any per-item state that should not outlive this enqueueing is
    /// dropped here; calling it for an unknown item is a no-op.
    fn on_dequeue(&self, item: &T);

    fn classify(&self, item: &T) -> LaneKind {
        if self.should_defer(item) {
            LaneKind::Slow
        } else {
            LaneKind::Fast
        }
    }
}

/// Slow unless explicitly fast-tracked.
///
/// A mark set with [`mark_fast`](StaticLane::mark_fast) lasts until the item is popped or the
/// mark is cleared. Marking does not move an item that is already queued, the owner of the
/// queue has to [`touch`](crate::TwoLaneQueue::touch) it.
#[derive(Debug)]
pub struct StaticLane<T> {
    fast: Mutex<HashSet<T>>,
}

impl<T: Hash + Eq> StaticLane<T> {
    pub fn new() -> Self {
        Self {
            fast: Mutex::new(HashSet::new()),
        }
    }

    pub fn mark_fast(&self, item: T) {
        self.lock().insert(item);
    }

    pub fn clear_fast(&self, item: &T) {
        self.lock().remove(item);
    }

    pub fn is_fast(&self, item: &T) -> bool {
        self.lock().contains(item)
    }

    // Every mutation is a single insert or remove, so the set is consistent even if a holder
    // panicked.
    fn lock(&self) -> MutexGuard<'_, HashSet<T>> {
        self.fast.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Hash + Eq> Default for StaticLane<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Lane<T> for StaticLane<T>
where
    T: Hash + Eq + Send,
{
    fn should_defer(&self, item: &T) -> bool {
        !self.is_fast(item)
    }

    fn on_dequeue(&self, item: &T) {
        self.clear_fast(item);
    }
}

/// Stateless lane driven by a predicate; the predicate returns `true` for slow items.
pub struct FnLane<F> {
    defer: F,
}

impl<F> FnLane<F> {
    pub fn new(defer: F) -> Self {
        Self { defer }
    }
}

impl<T, F> Lane<T> for FnLane<F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn should_defer(&self, item: &T) -> bool {
        (self.defer)(item)
    }

    fn on_dequeue(&self, _item: &T) {}
}

impl<F> fmt::Debug for FnLane<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLane").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_items_are_slow() {
        let lane = StaticLane::<u32>::new();
        assert!(lane.should_defer(&7));
        assert_eq!(lane.classify(&7), LaneKind::Slow);
    }

    #[test]
    fn marks_apply_until_cleared() {
        let lane = StaticLane::new();
        lane.mark_fast("deploy");
        assert!(!lane.should_defer(&"deploy"));
        assert_eq!(lane.classify(&"deploy"), LaneKind::Fast);
        assert!(lane.should_defer(&"build"));

        lane.clear_fast(&"deploy");
        assert!(lane.should_defer(&"deploy"));
        // Clearing again is fine.
        lane.clear_fast(&"deploy");
        assert!(!lane.is_fast(&"deploy"));
    }

    #[test]
    fn dequeue_drops_the_mark() {
        let lane = StaticLane::new();
        lane.mark_fast(1);
        lane.on_dequeue(&1);
        assert!(lane.should_defer(&1));
        lane.on_dequeue(&2);
        assert!(lane.should_defer(&2));
    }

    #[test]
    fn fn_lane_follows_its_predicate() {
        let lane = FnLane::new(|n: &u32| n % 2 == 0);
        assert_eq!(lane.classify(&2), LaneKind::Slow);
        assert_eq!(lane.classify(&3), LaneKind::Fast);
        lane.on_dequeue(&3);
        assert_eq!(lane.classify(&3), LaneKind::Fast);
    }

    #[test]
    fn labels() {
        assert_eq!(LaneKind::Fast.to_string(), "fast");
        assert_eq!(LaneKind::Slow.as_str(), "slow");
    }
}
