//! Recency List Module
//!
//! Arena-backed doubly linked list ordering a shard's entries by last touch.

/// Sentinel index meaning "no slot".
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Slot<T> {
    item: Option<T>,
    prev: usize,
    next: usize,
}

// == Recency List ==
/// Orders items by recency of use.
///
/// Items live in a dense `Vec` of slots linked through `prev`/`next` indices;
/// reclaimed slots go on a freelist and are reused by the next push.
/// - Front = least recently used (next eviction candidate)
/// - Back = most recently used
///
/// Slot indices returned by [`push_back`](Self::push_back) stay valid until
/// the item is removed.
#[derive(Debug)]
pub struct RecencyList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecencyList<T> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    // == Push Back ==
    /// Appends an item as the most recently used and returns its slot index.
    pub fn push_back(&mut self, item: T) -> usize {
        let slot = Slot {
            item: Some(item),
            prev: self.tail,
            next: NIL,
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };

        if self.tail != NIL {
            self.slots[self.tail].next = idx;
        } else {
            self.head = idx;
        }
        self.tail = idx;
        self.len += 1;
        idx
    }

    // == Move To Back ==
    /// Marks the item at `idx` as most recently used.
    ///
    /// Does nothing if `idx` is not a live slot.
    pub fn move_to_back(&mut self, idx: usize) {
        if !self.is_live(idx) || idx == self.tail {
            return;
        }
        self.unlink(idx);

        let slot = &mut self.slots[idx];
        slot.prev = self.tail;
        slot.next = NIL;

        // List is non-empty here: idx was live and not the tail.
        self.slots[self.tail].next = idx;
        self.tail = idx;
    }

    // == Remove ==
    /// Removes the item at `idx`, returning it and recycling the slot.
    pub fn remove(&mut self, idx: usize) -> Option<T> {
        if !self.is_live(idx) {
            return None;
        }
        self.unlink(idx);
        self.len -= 1;
        self.free.push(idx);

        let slot = &mut self.slots[idx];
        slot.prev = NIL;
        slot.next = NIL;
        slot.item.take()
    }

    // == Pop Front ==
    /// Removes and returns the least recently used item.
    pub fn pop_front(&mut self) -> Option<T> {
        match self.front() {
            Some(idx) => self.remove(idx),
            None => None,
        }
    }

    // == Front ==
    /// Returns the slot index of the least recently used item.
    pub fn front(&self) -> Option<usize> {
        (self.head != NIL).then_some(self.head)
    }

    // == Accessors ==
    /// Returns a reference to the item at `idx`.
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.slots.get(idx).and_then(|slot| slot.item.as_ref())
    }

    /// Returns a mutable reference to the item at `idx`.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.slots.get_mut(idx).and_then(|slot| slot.item.as_mut())
    }

    /// Iterates `(slot index, item)` from least to most recently used.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    // == Length ==
    /// Returns the number of items in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn is_live(&self, idx: usize) -> bool {
        self.slots
            .get(idx)
            .map(|slot| slot.item.is_some())
            .unwrap_or(false)
    }

    // Detaches idx from its neighbours, leaving its own links stale.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = &self.slots[idx];
            (slot.prev, slot.next)
        };

        if prev != NIL {
            self.slots[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.slots[next].prev = prev;
        } else {
            self.tail = prev;
        }
    }
}

/// Front-to-back iterator over a [`RecencyList`].
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    cursor: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let idx = self.cursor;
        let slot = &self.list.slots[idx];
        self.cursor = slot.next;
        slot.item.as_ref().map(|item| (idx, item))
    }
}
