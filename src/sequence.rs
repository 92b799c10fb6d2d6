/// Stable handle to an entry of a [`Sequence`].
///
/// A handle stays valid until its entry is removed; the slot may then be
/// reused by a later `push_back`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slot(u32);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<Slot>,
    next: Option<Slot>,
}

/// FIFO sequence with O(1) append, pop-front and removal by handle.
///
/// Nodes live in a `Vec` and link to each other by index, freed slots are
/// recycled through a free list.
#[derive(Debug)]
pub struct Sequence<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<u32>,
    head: Option<Slot>,
    tail: Option<Slot>,
    len: usize,
}

impl<T> Sequence<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push_back(&mut self, value: T) -> Slot {
        let node = Node {
            value,
            prev: self.tail,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(free) => {
                self.slots[free as usize] = Some(node);
                Slot(free)
            }
            None => {
                let slot = Slot(self.slots.len() as u32);
                self.slots.push(Some(node));
                slot
            }
        };

        match self.tail {
            Some(tail) => self.link_mut(tail).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.len += 1;
        slot
    }

    #[cfg(test)]
    pub fn front(&self) -> Option<&T> {
        self.head.and_then(|slot| self.get(slot))
    }

    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        self.remove(head)
    }

    /// Unlink the entry at `slot`. Returns `None` if the slot is vacant.
    pub fn remove(&mut self, slot: Slot) -> Option<T> {
        let node = self.slots.get_mut(slot.0 as usize)?.take()?;

        match node.prev {
            Some(prev) => self.link_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.link_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }

        self.free.push(slot.0);
        self.len -= 1;
        Some(node.value)
    }

    #[cfg(test)]
    pub fn get(&self, slot: Slot) -> Option<&T> {
        self.slots
            .get(slot.0 as usize)?
            .as_ref()
            .map(|node| &node.value)
    }

    /// Iterate front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            sequence: self,
            current: self.head,
        }
    }

    // Links always point at occupied slots, anything else is a bug in this module.
    fn link_mut(&mut self, slot: Slot) -> &mut Node<T> {
        match self.slots[slot.0 as usize].as_mut() {
            Some(node) => node,
            None => unreachable!("sequence link points at vacant slot {:?}", slot),
        }
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, T> {
    sequence: &'a Sequence<T>,
    current: Option<Slot>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.current?;
        let node = self.sequence.slots[slot.0 as usize].as_ref()?;
        self.current = node.next;
        Some(&node.value)
    }
}
