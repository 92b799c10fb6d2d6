pub mod lane;
pub mod metrics;
mod sequence;
mod two_lane;

pub use crate::lane::{FnLane, Lane, LaneKind, StaticLane};
pub use crate::metrics::{register_metrics, DepthObserver, GaugeObserver, NoopObserver};
pub use crate::two_lane::{Error, TwoLaneQueue};

/// Ordered storage behind a work queue.
///
/// Implementations are not expected to lock; the owning work queue serialises every call.
pub trait Queue {
    type Err;
    type Item;

    fn push(&mut self, item: Self::Item) -> Result<(), Self::Err>;
    fn pop(&mut self) -> Option<Self::Item>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
