use crate::lane::{Lane, LaneKind};
use crate::metrics::{DepthObserver, NoopObserver};
use crate::sequence::{Sequence, Slot};
use crate::Queue;
use indexmap::IndexMap;
use std::hash::Hash;
use std::sync::Arc;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Item is already queued in the {lane} lane")]
    AlreadyQueued { lane: LaneKind },
}

/// One lane: items in FIFO order plus an index from item to its handle.
#[derive(Debug)]
struct Track<T> {
    order: Sequence<T>,
    index: IndexMap<T, Slot>,
}

impl<T: Hash + Eq + Clone> Track<T> {
    fn new() -> Self {
        Self {
            order: Sequence::new(),
            index: IndexMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn contains(&self, item: &T) -> bool {
        self.index.contains_key(item)
    }

    fn push_back(&mut self, item: T) {
        let slot = self.order.push_back(item.clone());
        self.index.insert(item, slot);
    }

    fn pop_front(&mut self) -> Option<T> {
        let item = self.order.pop_front()?;
        self.index.swap_remove(&item);
        Some(item)
    }

    fn remove(&mut self, item: &T) -> Option<T> {
        let slot = self.index.swap_remove(item)?;
        self.order.remove(slot)
    }

    fn position(&self, item: &T) -> Option<usize> {
        if !self.contains(item) {
            return None;
        }
        self.order.iter().position(|queued| queued == item)
    }
}

/// FIFO queue split into a fast and a slow lane.
///
/// Every pushed item is placed in the lane its [`Lane`] picks, and `pop` drains the fast lane
/// before it looks at the slow one. Slow items wait for as long as there is fast work.
///
/// The queue does no locking of its own. Callers must serialise access, typically by holding
/// it behind an `Arc<Mutex<_>>`; only the lane is meant to be shared freely.
pub struct TwoLaneQueue<T, L> {
    name: String,
    fast: Track<T>,
    slow: Track<T>,
    lane: Arc<L>,
    observer: Arc<dyn DepthObserver>,
}

impl<T, L> TwoLaneQueue<T, L>
where
    T: Hash + Eq + Clone,
    L: Lane<T>,
{
    /// Create a queue that does not report its depth anywhere.
    pub fn new<N: Into<String>>(name: N, lane: Arc<L>) -> Self {
        Self::with_observer(name, lane, Arc::new(NoopObserver))
    }

    pub fn with_observer<N: Into<String>>(
        name: N,
        lane: Arc<L>,
        observer: Arc<dyn DepthObserver>,
    ) -> Self {
        Self {
            name: name.into(),
            fast: Track::new(),
            slow: Track::new(),
            lane,
            observer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lane(&self) -> &Arc<L> {
        &self.lane
    }

    /// Move `item` into the lane the classifier currently picks for it.
    ///
    /// Returns the lane the item moved to, or `None` if it is not queued or already sits in the
    /// right lane. A moved item goes to the back of its new lane.
    pub fn touch(&mut self, item: &T) -> Option<LaneKind> {
        let target = self.lane.classify(item);
        let (from, to) = match target {
            LaneKind::Slow => (&mut self.fast, &mut self.slow),
            LaneKind::Fast => (&mut self.slow, &mut self.fast),
        };
        let item = from.remove(item)?;
        to.push_back(item);

        log::debug!("Moved item to the {} lane of queue {:?}", target, self.name);
        self.report();
        Some(target)
    }

    pub fn lane_of(&self, item: &T) -> Option<LaneKind> {
        if self.fast.contains(item) {
            Some(LaneKind::Fast)
        } else if self.slow.contains(item) {
            Some(LaneKind::Slow)
        } else {
            None
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.lane_of(item).is_some()
    }

    pub fn lane_len(&self, lane: LaneKind) -> usize {
        match lane {
            LaneKind::Fast => self.fast.len(),
            LaneKind::Slow => self.slow.len(),
        }
    }

    /// Zero-based position of `item` in dequeue order, counting the whole fast lane before the
    /// slow one. Walks the item's lane, so this is linear in its length.
    pub fn position(&self, item: &T) -> Option<usize> {
        match self.lane_of(item)? {
            LaneKind::Fast => self.fast.position(item),
            LaneKind::Slow => self.slow.position(item).map(|pos| pos + self.fast.len()),
        }
    }

    /// Items in the order they would be popped.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.fast.order.iter().chain(self.slow.order.iter())
    }

    fn report(&self) {
        self.observer
            .set_depth(&self.name, LaneKind::Slow, self.slow.len());
        self.observer
            .set_depth(&self.name, LaneKind::Fast, self.fast.len());
    }
}

impl<T, L> Queue for TwoLaneQueue<T, L>
where
    T: Hash + Eq + Clone,
    L: Lane<T>,
{
    type Err = Error;
    type Item = T;

    /// Append `item` to the back of the lane it is classified into. Pushing an item that is
    /// already queued is refused and leaves the queue untouched.
    fn push(&mut self, item: T) -> Result<(), Error> {
        if let Some(lane) = self.lane_of(&item) {
            log::warn!("Refusing to queue an item twice in queue {:?}", self.name);
            return Err(Error::AlreadyQueued { lane });
        }

        let target = self.lane.classify(&item);
        match target {
            LaneKind::Fast => self.fast.push_back(item),
            LaneKind::Slow => self.slow.push_back(item),
        }
        log::trace!("Queued item in the {} lane of queue {:?}", target, self.name);
        self.report();
        Ok(())
    }

    /// Take the oldest fast item, or the oldest slow item if the fast lane is empty.
    fn pop(&mut self) -> Option<T> {
        let (item, from) = match self.fast.pop_front() {
            Some(item) => (item, LaneKind::Fast),
            None => (self.slow.pop_front()?, LaneKind::Slow),
        };
        log::trace!("Dequeued item from the {} lane of queue {:?}", from, self.name);
        self.report();
        self.lane.on_dequeue(&item);
        Some(item)
    }

    fn len(&self) -> usize {
        self.fast.len() + self.slow.len()
    }
}

impl<T, L> std::fmt::Debug for TwoLaneQueue<T, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoLaneQueue")
            .field("name", &self.name)
            .field("fast", &self.fast.order.len())
            .field("slow", &self.slow.order.len())
            .finish()
    }
}
