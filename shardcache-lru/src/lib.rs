//! A size-bounded LRU store with byte-accounted eviction.
//!
//! Not internally synchronized — callers serialize externally (see
//! `shardcache-core`, which wraps this behind a single mutex covering both
//! `get` and `add`, the way the design calls for: `get` mutates the
//! recency list, so a reader-writer lock would not help).
//!
//! The teacher workspace (`foyer-memory::cache`) builds its eviction layer
//! on `unsafe` intrusive handles shared through an object pool, because it
//! supports a family of pluggable eviction policies at very high
//! throughput. This store only ever needs LRU and has no concurrency of its
//! own to optimize around, so it is a plain safe slab instead: a
//! `HashMap<String, usize>` index over a `Vec<Slot<V>>`, linked by index
//! rather than pointer. Same shape as Go's `container/list` + map, just
//! without raw pointers.

use hashbrown::HashMap;

/// Anything an [`Lru`] can hold must know its own byte weight so the store
/// can account for `len(key) + value.len()` per the charge formula.
pub trait Weighted {
    /// Byte cost of the value half of an entry.
    fn weight(&self) -> usize;
}

impl Weighted for Vec<u8> {
    fn weight(&self) -> usize {
        self.len()
    }
}

impl Weighted for shardcache_common::ByteView {
    fn weight(&self) -> usize {
        self.len()
    }
}

struct Slot<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A size-bounded, byte-accounted least-recently-used store.
///
/// `cap == 0` disables eviction entirely. A single `add` whose own charge
/// exceeds the cap evicts every other entry and is itself kept until the
/// *next* `add` evicts it — the eviction loop condition is `charge > cap`,
/// checked only after insertion, matching the original Go behavior.
pub struct Lru<V> {
    cap: usize,
    charge: usize,
    index: HashMap<String, usize>,
    slots: Vec<Option<Slot<V>>>,
    free: Vec<usize>,
    head: Option<usize>, // least recently used
    tail: Option<usize>, // most recently used
    on_evict: Option<Box<dyn FnMut(&str, &V) + Send>>,
}

impl<V> Lru<V>
where
    V: Weighted,
{
    /// Creates an empty store. `cap == 0` means unbounded.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            charge: 0,
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            on_evict: None,
        }
    }

    /// Registers a callback invoked with `(key, value)` whenever an entry
    /// is evicted to stay under the cap.
    pub fn with_evict_callback(mut self, cb: impl FnMut(&str, &V) + Send + 'static) -> Self {
        self.on_evict = Some(Box::new(cb));
        self
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total charge (sum of `len(key) + value.weight()` over all entries).
    pub fn charge(&self) -> usize {
        self.charge
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.move_to_back(idx);
        self.slots[idx].as_ref().map(|s| &s.value)
    }

    /// Inserts or replaces `key`. On replace, the entry is promoted to MRU
    /// and the total charge is adjusted by the difference in weight. On
    /// insert, the entry lands at MRU and eviction runs while `cap > 0 &&
    /// charge > cap`.
    pub fn add(&mut self, key: String, value: V) {
        if let Some(&idx) = self.index.get(&key) {
            let old_weight = self.slots[idx].as_ref().unwrap().value.weight();
            let new_weight = value.weight();
            self.slots[idx].as_mut().unwrap().value = value;
            self.charge = self.charge + new_weight - old_weight;
            self.move_to_back(idx);
        } else {
            let weight = key.len() + value.weight();
            let idx = self.alloc_slot(key, value);
            self.push_back(idx);
            self.charge += weight;
        }
        self.evict_to_cap();
    }

    /// Evicts from the front (oldest) while over cap, but never evicts the
    /// entry this `add` call just touched: that entry sits at the back, so
    /// once it is the only one left (`head == tail`) the loop stops even
    /// though charge may still exceed cap. A single oversized `add` thus
    /// evicts everything else and is itself evicted only by a later `add`.
    fn evict_to_cap(&mut self) {
        while self.cap != 0 && self.charge > self.cap && self.head != self.tail {
            let Some(idx) = self.head else { break };
            self.remove_slot(idx);
        }
    }

    fn alloc_slot(&mut self, key: String, value: V) -> usize {
        let slot = Slot { key, value, prev: None, next: None };
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(slot);
            idx
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }

    fn push_back(&mut self, idx: usize) {
        let prev_tail = self.tail;
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.prev = prev_tail;
            slot.next = None;
        }
        if let Some(t) = prev_tail {
            self.slots[t].as_mut().unwrap().next = Some(idx);
        } else {
            self.head = Some(idx);
        }
        self.tail = Some(idx);
        self.index.insert(self.slots[idx].as_ref().unwrap().key.clone(), idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slots[idx].as_ref().unwrap();
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slots[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn move_to_back(&mut self, idx: usize) {
        if self.tail == Some(idx) {
            return;
        }
        self.unlink(idx);
        let slot = self.slots[idx].as_mut().unwrap();
        slot.prev = self.tail;
        slot.next = None;
        if let Some(t) = self.tail {
            self.slots[t].as_mut().unwrap().next = Some(idx);
        } else {
            self.head = Some(idx);
        }
        self.tail = Some(idx);
    }

    /// Removes the least-recently-used entry, firing the eviction callback
    /// if one is configured.
    fn remove_slot(&mut self, idx: usize) {
        self.unlink(idx);
        let slot = self.slots[idx].take().unwrap();
        self.index.remove(&slot.key);
        self.charge -= slot.key.len() + slot.value.weight();
        self.free.push(idx);
        tracing::trace!(key = %slot.key, charge = self.charge, "lru evicted entry");
        if let Some(cb) = self.on_evict.as_mut() {
            cb(&slot.key, &slot.value);
        }
    }

    /// Removes `key` unconditionally, independent of the cap. Not part of
    /// the original spec's contract, but useful for cache invalidation by
    /// embedders that don't need full TTL semantics.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let idx = self.index.get(key).copied()?;
        self.unlink(idx);
        let slot = self.slots[idx].take().unwrap();
        self.index.remove(key);
        self.charge -= slot.key.len() + slot.value.weight();
        self.free.push(idx);
        Some(slot.value)
    }
}
