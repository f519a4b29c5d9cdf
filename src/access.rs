//! Access stamps for approximate-LRU eviction.
//!
//! Every live slot carries a non-zero stamp; zero marks a free slot. Stamps
//! and the shared counter are atomics so read-only lookups (`&self`) can
//! bump them while the store is shared. Only the stamps are synchronized:
//! every structural operation still needs `&mut` access to the store.
//!
//! Renormalization needs `&mut` too, so it runs at the start of the next
//! insert, removal or cursor removal. Lookups alone never renormalize: a
//! long read-only run can push stamps past [`ACCESS_MAX`] and, in the
//! extreme, pin them at `u32::MAX`, where rank selection stops telling
//! entries apart until the next mutating call.

use core::sync::atomic::{AtomicU32, Ordering};

/// Counter ceiling. Crossing it triggers renormalization, which leaves
/// `2^20` of headroom below `i32::MAX` for bumps that land before the next
/// mutating call.
pub const ACCESS_MAX: u32 = i32::MAX as u32 - (1 << 20);

/// Histogram resolution used by rank selection.
const RANK_SEGMENTS: u64 = 256;

/// How touching an entry moves its stamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessOrder {
    /// A touch stamps the slot with the next value of the shared counter.
    Recency,
    /// A touch increments the slot's own tally.
    Frequency,
}

#[derive(Debug)]
pub(crate) struct AccessTable {
    stamps: Vec<AtomicU32>,
    /// Highest stamp handed out (recency) or observed (frequency).
    counter: AtomicU32,
    /// Lowest stamp still considered by rank selection.
    floor: u32,
    order: AccessOrder,
}

#[inline]
fn clamp(stamp: u64) -> u32 {
    stamp.min(u64::from(u32::MAX)) as u32
}

fn zeroed(len: usize) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

impl AccessTable {
    pub fn new(order: AccessOrder, len: usize) -> Self {
        Self {
            stamps: zeroed(len),
            counter: AtomicU32::new(0),
            floor: 0,
            order,
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub fn floor(&self) -> u32 {
        self.floor
    }

    pub fn set_floor(&mut self, floor: u32) {
        self.floor = floor;
    }

    #[inline]
    pub fn get(&self, slot: usize) -> u32 {
        self.stamps[slot].load(Ordering::Relaxed)
    }

    /// Overwrites a stamp; zero is bumped to one so the slot stays live.
    pub fn set(&self, slot: usize, stamp: u32) {
        let stamp = stamp.max(1);
        self.stamps[slot].store(stamp, Ordering::Relaxed);
        self.counter.fetch_max(stamp, Ordering::Relaxed);
    }

    fn next_count(&self) -> u32 {
        let prev = self
            .counter
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_add(1))
            })
            .unwrap_or_else(|c| c);
        prev.saturating_add(1)
    }

    /// Stamps a freshly linked slot.
    pub fn stamp_new(&self, slot: usize) {
        let stamp = match self.order {
            AccessOrder::Recency => self.next_count(),
            AccessOrder::Frequency => {
                self.counter.fetch_max(1, Ordering::Relaxed);
                1
            }
        };
        self.stamps[slot].store(stamp, Ordering::Relaxed);
    }

    /// Records a hit on a live slot.
    #[inline]
    pub fn touch(&self, slot: usize) {
        match self.order {
            AccessOrder::Recency => {
                let stamp = self.next_count();
                self.stamps[slot].store(stamp, Ordering::Relaxed);
            }
            AccessOrder::Frequency => {
                let prev = self.stamps[slot]
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
                        Some(s.saturating_add(1))
                    })
                    .unwrap_or_else(|s| s);
                self.counter
                    .fetch_max(prev.saturating_add(1), Ordering::Relaxed);
            }
        }
    }

    pub fn clear(&mut self, slot: usize) {
        *self.stamps[slot].get_mut() = 0;
    }

    /// Moves a stamp to a lower slot during compaction.
    pub fn move_stamp(&mut self, from: usize, to: usize) {
        let stamp = core::mem::take(self.stamps[from].get_mut());
        *self.stamps[to].get_mut() = stamp;
    }

    /// Shifts stamps `slot + 1..high_water` down by one.
    pub fn close_gap(&mut self, slot: usize, high_water: usize) {
        for i in slot..high_water - 1 {
            let next = *self.stamps[i + 1].get_mut();
            *self.stamps[i].get_mut() = next;
        }
        *self.stamps[high_water - 1].get_mut() = 0;
    }

    /// Grows or truncates to `len` slots. Truncated slots must be free.
    pub fn resize(&mut self, len: usize) {
        self.stamps.resize_with(len, || AtomicU32::new(0));
    }

    /// Zeroes every stamp along with the counter and floor.
    pub fn reset(&mut self) {
        self.stamps.iter_mut().for_each(|s| *s.get_mut() = 0);
        *self.counter.get_mut() = 0;
        self.floor = 0;
    }

    pub fn needs_renormalize(&self) -> bool {
        self.counter() >= ACCESS_MAX
    }

    /// Compresses every live stamp to `(stamp >> 2) + 1` and recomputes the
    /// counter and floor from the result. Relative order is preserved up to
    /// ties.
    pub fn renormalize(&mut self) {
        let mut min = u32::MAX;
        let mut max = 0;
        for stamp in self.stamps.iter_mut().map(AtomicU32::get_mut) {
            if *stamp == 0 {
                continue;
            }
            *stamp = (*stamp >> 2) + 1;
            min = min.min(*stamp);
            max = max.max(*stamp);
        }
        log::trace!("access stamps renormalized into {min}..={max}");
        *self.counter.get_mut() = max;
        self.floor = if max == 0 { 0 } else { min };
    }

    fn live_stamps(&self) -> impl Iterator<Item = u32> + '_ {
        self.stamps
            .iter()
            .map(|s| s.load(Ordering::Relaxed))
            .filter(|&s| s != 0)
    }

    /// Picks a stamp ceiling `T` so that about `target` live slots have a
    /// stamp below `T`, within `margin`.
    ///
    /// The search narrows a 256-segment histogram over `[floor, counter]`
    /// instead of sorting. Stamps under the floor always count as below.
    pub fn ceiling_for(&self, target: usize, margin: usize) -> u32 {
        let mut low = u64::from(self.floor.max(1));
        let mut high = u64::from(self.counter()) + 1;
        let mut below = self.live_stamps().filter(|&s| u64::from(s) < low).count();
        if below + margin >= target {
            return clamp(low);
        }
        let mut counts = [0usize; RANK_SEGMENTS as usize];
        loop {
            let width = high.saturating_sub(low);
            if width <= 1 {
                let within = self
                    .live_stamps()
                    .filter(|&s| u64::from(s) >= low && u64::from(s) < high)
                    .count();
                if below + within <= target {
                    return clamp(high);
                }
                // Closer of the two boundaries, preferring to keep entries.
                return if target - below <= below + within - target {
                    clamp(low)
                } else {
                    clamp(high)
                };
            }
            let seg = width.div_ceil(RANK_SEGMENTS);
            counts.fill(0);
            for s in self.live_stamps().map(u64::from) {
                if s >= low && s < high {
                    counts[((s - low) / seg) as usize] += 1;
                }
            }
            let mut running = below;
            let mut found = None;
            for (i, &n) in counts.iter().enumerate() {
                if running + n >= target {
                    found = Some((i as u64, n));
                    break;
                }
                running += n;
            }
            let Some((i, n)) = found else {
                return clamp(high);
            };
            let start = low + i * seg;
            let end = (start + seg).min(high);
            if target - running <= margin {
                return clamp(start);
            }
            if running + n - target <= margin {
                return clamp(end);
            }
            below = running;
            low = start;
            high = end;
        }
    }
}
