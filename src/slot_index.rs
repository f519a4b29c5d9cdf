//! SlotIndex: bucket routing and slot lifecycle over flat `u32` arrays.
//!
//! The index owns two arrays: `buckets`, holding the head slot of each
//! bucket's chain, and `links`, parallel to the owner's data columns, holding
//! the next slot of each chain. Free slots thread a second list through the
//! same `links` array. The index never sees keys or values; callers hash,
//! compare and clear cells themselves.

const NIL: u32 = u32::MAX;

#[inline]
fn to_slot(raw: u32) -> Option<usize> {
    (raw != NIL).then_some(raw as usize)
}

#[inline]
fn to_raw(slot: usize) -> u32 {
    debug_assert!(slot < NIL as usize, "slot {slot} out of range");
    slot as u32
}

#[derive(Debug, Clone)]
pub struct SlotIndex {
    buckets: Vec<u32>,
    links: Vec<u32>,
    len: usize,
    high_water: usize,
    free_head: u32,
}

impl SlotIndex {
    /// Creates an index with `bucket_count` buckets and room for `capacity`
    /// slots.
    pub fn new(bucket_count: usize, capacity: usize) -> Self {
        assert!(bucket_count > 0, "slot index needs at least one bucket");
        Self {
            buckets: vec![NIL; bucket_count],
            links: vec![NIL; capacity],
            len: 0,
            high_water: 0,
            free_head: NIL,
        }
    }

    /// Number of linked (live) slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the highest slot ever handed out since the last reset.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn capacity(&self) -> usize {
        self.links.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Maps a hash to its bucket. The sign bit is masked off first so the
    /// routing matches for hashes produced from signed 32-bit values.
    #[inline]
    pub fn bucket_of(&self, hash: u32) -> usize {
        (hash & 0x7fff_ffff) as usize % self.buckets.len()
    }

    #[inline]
    pub fn head_of(&self, hash: u32) -> Option<usize> {
        self.head(self.bucket_of(hash))
    }

    #[inline]
    pub fn head(&self, bucket: usize) -> Option<usize> {
        to_slot(self.buckets[bucket])
    }

    #[inline]
    pub fn next(&self, slot: usize) -> Option<usize> {
        to_slot(self.links[slot])
    }

    /// Iterates the slots chained under `bucket`, head first.
    pub fn chain(&self, bucket: usize) -> Chain<'_> {
        Chain {
            index: self,
            cur: self.head(bucket),
        }
    }

    /// Allocates a slot and splices it after `predecessor`, or in front of
    /// the bucket's head when `predecessor` is `None`.
    ///
    /// Freed slots are reused before the high-water mark advances. Panics if
    /// every slot is in use; callers grow the index before that point.
    pub fn link(&mut self, bucket: usize, predecessor: Option<usize>) -> usize {
        let slot = match to_slot(self.free_head) {
            Some(free) => {
                self.free_head = self.links[free];
                free
            }
            None => {
                assert!(
                    self.high_water < self.links.len(),
                    "slot index exhausted at {} slots",
                    self.links.len()
                );
                self.high_water += 1;
                self.high_water - 1
            }
        };
        match predecessor {
            Some(pred) => {
                self.links[slot] = self.links[pred];
                self.links[pred] = to_raw(slot);
            }
            None => {
                self.links[slot] = self.buckets[bucket];
                self.buckets[bucket] = to_raw(slot);
            }
        }
        self.len += 1;
        slot
    }

    /// Detaches `slot` from its chain given its immediate predecessor.
    ///
    /// The slot is neither reusable nor cleared afterward; the caller
    /// either `reclaim`s it or closes the gap with `close_gap`.
    pub fn unlink(&mut self, bucket: usize, predecessor: Option<usize>, slot: usize) {
        let next = self.links[slot];
        match predecessor {
            Some(pred) => {
                debug_assert_eq!(to_slot(self.links[pred]), Some(slot));
                self.links[pred] = next;
            }
            None => {
                debug_assert_eq!(self.head(bucket), Some(slot));
                self.buckets[bucket] = next;
            }
        }
        self.links[slot] = NIL;
        self.len -= 1;
    }

    /// Finds the chain predecessor of `slot` in `bucket`.
    ///
    /// Returns `None` when the slot is not chained there at all, and
    /// `Some(None)` when it is the bucket head.
    pub fn predecessor_of(&self, bucket: usize, slot: usize) -> Option<Option<usize>> {
        let mut pred = None;
        for cur in self.chain(bucket) {
            if cur == slot {
                return Some(pred);
            }
            pred = Some(cur);
        }
        None
    }

    /// Returns an unlinked slot to the pool. A trailing slot lowers the
    /// high-water mark; any other slot joins the free list.
    pub fn reclaim(&mut self, slot: usize) {
        debug_assert!(slot < self.high_water);
        if slot + 1 == self.high_water {
            self.high_water -= 1;
        } else {
            self.links[slot] = self.free_head;
            self.free_head = to_raw(slot);
        }
    }

    /// Removes an unlinked slot by shifting every later slot down by one,
    /// renumbering all references to them. Used by ordered stores, which
    /// never hold free slots.
    pub fn close_gap(&mut self, slot: usize) {
        debug_assert!(slot < self.high_water);
        debug_assert_eq!(self.free_head, NIL, "ordered index holds free slots");
        let gap = to_raw(slot);
        let shift = |raw: &mut u32| {
            if *raw != NIL && *raw > gap {
                *raw -= 1;
            }
        };
        self.buckets.iter_mut().for_each(shift);
        self.links[..self.high_water].iter_mut().for_each(shift);
        self.links.copy_within(slot + 1..self.high_water, slot);
        self.high_water -= 1;
        self.links[self.high_water] = NIL;
    }

    /// Replaces both arrays, dropping all linkage. The caller reinserts.
    pub fn resize_buckets(&mut self, bucket_count: usize, capacity: usize) {
        assert!(bucket_count > 0, "slot index needs at least one bucket");
        self.buckets = vec![NIL; bucket_count];
        self.links = vec![NIL; capacity];
        self.len = 0;
        self.high_water = 0;
        self.free_head = NIL;
    }

    /// Empties the index, keeping its allocation.
    pub fn reset(&mut self) {
        self.buckets.fill(NIL);
        self.links.fill(NIL);
        self.len = 0;
        self.high_water = 0;
        self.free_head = NIL;
    }
}

/// Iterator over one bucket's chain.
pub struct Chain<'a> {
    index: &'a SlotIndex,
    cur: Option<usize>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        let slot = self.cur?;
        self.cur = self.index.next(slot);
        Some(slot)
    }
}
