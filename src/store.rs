//! AssociativeStore: parallel key/value/access columns over a SlotIndex.

use crate::access::AccessTable;
use crate::columns::{KeyColumn, ValueColumn};
use crate::comparator::{HashEq, KeyComparator};
use crate::config::{PurgePolicy, StoreConfig, MIN_CAPACITY};
use crate::cursor::Cursor;
use crate::epoch::{DebugEpoch, EpochMark};
use crate::error::{ConfigError, Result, StoreError};
use crate::slot_index::SlotIndex;
use core::borrow::Borrow;

enum Probe {
    Hit {
        bucket: usize,
        pred: Option<usize>,
        slot: usize,
    },
    Miss {
        bucket: usize,
        tail: Option<usize>,
    },
}

/// Position of a key's run of entries within its bucket chain.
struct Run {
    bucket: usize,
    first: Option<usize>,
    last: Option<usize>,
    tail: Option<usize>,
}

/// Generic chained hash table over flat columns.
///
/// `KC` and `VC` fix the key and value representation, `C` the key
/// equivalence. The store is not internally synchronized; lookups through
/// `&self` may bump access stamps, which are atomics, and nothing else.
pub struct AssociativeStore<KC, VC, C = HashEq> {
    index: SlotIndex,
    keys: KC,
    values: VC,
    access: Option<AccessTable>,
    /// `true` for every entry of a multi-value run except the first.
    siblings: Option<Vec<bool>>,
    comparator: C,
    config: StoreConfig,
    /// Slot holding the integer key `0`, which its column reads as empty.
    zero_key: Option<usize>,
    epoch: DebugEpoch,
}

impl<KC, VC, C> Default for AssociativeStore<KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
    C: KeyComparator<KC::Key> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<KC, VC, C> AssociativeStore<KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
    C: KeyComparator<KC::Key> + Default,
{
    pub fn new() -> Self {
        Self::build(StoreConfig::default(), C::default())
    }
}

impl<KC, VC, C> AssociativeStore<KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
{
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of slots; also the occupancy at which the next new key
    /// triggers growth or purging.
    pub fn capacity(&self) -> usize {
        self.index.capacity()
    }

    pub fn threshold(&self) -> usize {
        self.index.capacity()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    pub(crate) fn is_ordered(&self) -> bool {
        self.config.is_ordered()
    }

    pub(crate) fn epoch_mark(&self) -> EpochMark {
        self.epoch.mark()
    }

    pub(crate) fn epoch(&self) -> &DebugEpoch {
        &self.epoch
    }

    #[inline]
    pub(crate) fn is_live(&self, slot: usize) -> bool {
        self.keys.is_occupied(slot) || self.zero_key == Some(slot)
    }

    #[inline]
    fn is_sibling(&self, slot: usize) -> bool {
        self.siblings.as_ref().map(|f| f[slot]).unwrap_or(false)
    }

    /// First live slot at or after `from`; `distinct` skips non-first members
    /// of multi-value runs.
    pub(crate) fn next_live(&self, from: usize, distinct: bool) -> Option<usize> {
        (from..self.index.high_water())
            .find(|&slot| self.is_live(slot) && !(distinct && self.is_sibling(slot)))
    }

    /// Next member of the run containing `slot`.
    pub(crate) fn next_sibling(&self, slot: usize) -> Option<usize> {
        self.index.next(slot).filter(|&n| self.is_sibling(n))
    }

    pub(crate) fn key_at(&self, slot: usize) -> Option<&KC::Key> {
        self.is_live(slot).then(|| self.keys.get(slot)).flatten()
    }

    pub(crate) fn value_at(&self, slot: usize) -> Option<&VC::Value> {
        self.is_live(slot).then(|| self.values.get(slot)).flatten()
    }

    pub(crate) fn replace_value_at(&mut self, slot: usize, value: VC::Value) -> Option<VC::Value> {
        if !self.is_live(slot) {
            return None;
        }
        self.values.replace(slot, value)
    }

    pub(crate) fn stamp_at(&self, slot: usize) -> Option<u32> {
        let access = self.access.as_ref()?;
        self.is_live(slot).then(|| access.get(slot))
    }

    pub(crate) fn set_stamp_at(&self, slot: usize, stamp: u32) -> bool {
        match &self.access {
            Some(access) if self.is_live(slot) => {
                access.set(slot, stamp);
                true
            }
            _ => false,
        }
    }

    #[inline]
    fn touch(&self, slot: usize) {
        if let Some(access) = &self.access {
            access.touch(slot);
        }
    }

    /// Iterates live entries in slot order.
    pub fn iter(&self) -> Iter<'_, KC, VC, C> {
        Iter {
            store: self,
            pos: 0,
            distinct: false,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &KC::Key> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &VC::Value> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Each key once, skipping later members of multi-value runs.
    pub fn distinct_keys(&self) -> impl Iterator<Item = &KC::Key> + '_ {
        Iter {
            store: self,
            pos: 0,
            distinct: true,
        }
        .map(|(k, _)| k)
    }

    /// Key at `position` in iteration order. Ordered stores answer directly
    /// from the slot.
    pub fn get_index(&self, position: usize) -> Option<&KC::Key> {
        if self.is_ordered() {
            return (position < self.len())
                .then(|| self.keys.get(position))
                .flatten();
        }
        self.keys().nth(position)
    }

    pub fn contains_value(&self, value: &VC::Value) -> bool
    where
        VC::Value: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    pub fn key_cursor(&self) -> Cursor {
        Cursor::keys(self.epoch.mark())
    }

    pub fn value_cursor(&self) -> Cursor {
        Cursor::values(self.epoch.mark())
    }

    pub fn distinct_key_cursor(&self) -> Cursor {
        Cursor::distinct_keys(self.epoch.mark())
    }

    /// Compresses access stamps now rather than waiting for the counter to
    /// reach its ceiling.
    pub fn renormalize_access(&mut self) {
        if let Some(access) = &mut self.access {
            access.renormalize();
        }
    }

    /// Stamp ceiling below which about `count` entries fall, within `margin`.
    pub fn access_ceiling(&self, count: usize, margin: usize) -> Option<u32> {
        self.access
            .as_ref()
            .map(|access| access.ceiling_for(count, margin))
    }

    /// Renormalizes the access stamps once the counter reaches
    /// [`crate::ACCESS_MAX`]. Runs at the top of every mutating entry point.
    pub(crate) fn maintain_access(&mut self) {
        if let Some(access) = &mut self.access {
            if access.needs_renormalize() {
                access.renormalize();
            }
        }
    }
}

impl<KC, VC, C> AssociativeStore<KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
    C: KeyComparator<KC::Key>,
{
    pub fn with_config(config: StoreConfig, comparator: C) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, comparator))
    }

    /// Builds from a configuration known to be valid.
    pub(crate) fn build(config: StoreConfig, comparator: C) -> Self {
        debug_assert!(config.validate().is_ok());
        let capacity = config.effective_capacity();
        Self {
            index: SlotIndex::new(capacity, capacity),
            keys: KC::with_len(capacity),
            values: VC::with_len(capacity),
            access: config
                .access_order()
                .map(|order| AccessTable::new(order, capacity)),
            siblings: config.is_multi_value().then(|| vec![false; capacity]),
            comparator,
            config,
            zero_key: None,
            epoch: DebugEpoch::new(),
        }
    }

    #[inline]
    fn hash_of<Q>(&self, q: &Q) -> u32
    where
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        <C as KeyComparator<Q>>::hash(&self.comparator, q)
    }

    #[inline]
    fn key_matches<Q>(&self, slot: usize, q: &Q) -> bool
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.keys
            .get(slot)
            .map(|k| <C as KeyComparator<Q>>::eq(&self.comparator, Borrow::<Q>::borrow(k), q))
            .unwrap_or(false)
    }

    fn probe<Q>(&self, q: &Q) -> Probe
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        let bucket = self.index.bucket_of(self.hash_of(q));
        let mut pred = None;
        for slot in self.index.chain(bucket) {
            if self.key_matches(slot, q) {
                return Probe::Hit { bucket, pred, slot };
            }
            pred = Some(slot);
        }
        Probe::Miss { bucket, tail: pred }
    }

    fn find<Q>(&self, q: &Q) -> Option<usize>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        match self.probe(q) {
            Probe::Hit { slot, .. } => Some(slot),
            Probe::Miss { .. } => None,
        }
    }

    fn locate_run<Q>(&self, q: &Q) -> Run
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        let bucket = self.index.bucket_of(self.hash_of(q));
        let mut run = Run {
            bucket,
            first: None,
            last: None,
            tail: None,
        };
        for slot in self.index.chain(bucket) {
            if self.key_matches(slot, q) {
                run.first.get_or_insert(slot);
                run.last = Some(slot);
            }
            run.tail = Some(slot);
        }
        run
    }

    fn run_from(&self, first: Option<usize>) -> impl Iterator<Item = usize> + '_ {
        core::iter::successors(first, move |&slot| self.next_sibling(slot))
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&VC::Value>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        let slot = self.find(q)?;
        self.touch(slot);
        self.values.get(slot)
    }

    /// Like `get`, without touching the access stamp.
    pub fn peek<Q>(&self, q: &Q) -> Option<&VC::Value>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.find(q).and_then(|slot| self.values.get(slot))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut VC::Value>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        let slot = self.find(q)?;
        self.touch(slot);
        self.values.get_mut(slot)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.find(q).is_some()
    }

    /// Position of `q` in iteration order.
    pub fn index_of<Q>(&self, q: &Q) -> Option<usize>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        let slot = self.find(q)?;
        if self.is_ordered() {
            return Some(slot);
        }
        Some((0..slot).filter(|&s| self.is_live(s)).count())
    }

    pub fn access_stamp<Q>(&self, q: &Q) -> Option<u32>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.find(q).and_then(|slot| self.stamp_at(slot))
    }

    /// Inserts or overwrites. Returns the previous value for an existing
    /// key.
    ///
    /// A new key arriving at the threshold first grows the store, or once
    /// the capacity ceiling is reached applies the purge policy; under
    /// `NoPurge` that fails with [`StoreError::Exhausted`].
    ///
    /// Panics on a multi-value store, which takes
    /// [`AssociativeStore::upsert_multi`] instead.
    pub fn upsert(&mut self, key: KC::Key, value: VC::Value) -> Result<Option<VC::Value>> {
        assert!(
            self.siblings.is_none(),
            "single-value upsert on a multi-value store"
        );
        self.maintain_access();
        let (bucket, tail) = match self.probe(&key) {
            Probe::Hit { slot, .. } => {
                self.touch(slot);
                return Ok(self.values.replace(slot, value));
            }
            Probe::Miss { bucket, tail } => (bucket, tail),
        };
        let (bucket, tail) = if self.len() >= self.threshold() {
            self.make_room()?;
            let run = self.locate_run(&key);
            (run.bucket, run.tail)
        } else {
            (bucket, tail)
        };
        self.place(bucket, tail, key, value, false);
        Ok(None)
    }

    /// Removes the first entry for `q`. Absent keys are a no-op.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<VC::Value>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.maintain_access();
        let Probe::Hit { bucket, pred, slot } = self.probe(q) else {
            return None;
        };
        let value = self.release(bucket, pred, slot);
        self.shrink_if_empty();
        value
    }

    fn assert_multi(&self) {
        assert!(
            self.siblings.is_some(),
            "multi-value operation on a single-value store"
        );
    }

    /// Adds `value` under `key` next to any existing entries for the key.
    ///
    /// An identical `(key, value)` pair is not duplicated; the value is
    /// handed back as `Ok(Some(value))` instead.
    pub fn upsert_multi(&mut self, key: KC::Key, value: VC::Value) -> Result<Option<VC::Value>>
    where
        VC::Value: PartialEq,
    {
        self.assert_multi();
        self.maintain_access();
        let run = self.locate_run(&key);
        let duplicate = self
            .run_from(run.first)
            .find(|&slot| self.values.get(slot) == Some(&value));
        if let Some(slot) = duplicate {
            self.touch(slot);
            return Ok(Some(value));
        }
        if run.first.is_some() && KC::is_zero(&key) {
            return Err(StoreError::ZeroKeyConflict);
        }
        let run = if self.len() >= self.threshold() {
            self.make_room()?;
            self.locate_run(&key)
        } else {
            run
        };
        match run.last {
            Some(last) => self.place(run.bucket, Some(last), key, value, true),
            None => self.place(run.bucket, run.tail, key, value, false),
        };
        Ok(None)
    }

    /// Removes every entry for `q`, returning how many were removed.
    pub fn remove_by_key<Q>(&mut self, q: &Q) -> usize
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.maintain_access();
        let Some(first) = self.find(q) else {
            return 0;
        };
        let removed = self.remove_run(first);
        self.shrink_if_empty();
        removed
    }

    /// Removes the first entry for `q` whose value equals `value`; siblings
    /// stay.
    pub fn remove_by_key_value<Q>(&mut self, q: &Q, value: &VC::Value) -> Option<VC::Value>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
        VC::Value: PartialEq,
    {
        self.maintain_access();
        let first = self.find(q)?;
        let slot = self
            .run_from(Some(first))
            .find(|&slot| self.values.get(slot) == Some(value))?;
        let removed = self.remove_at(slot);
        self.shrink_if_empty();
        removed
    }

    /// Number of entries stored under `q`.
    pub fn value_count<Q>(&self, q: &Q) -> usize
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.run_from(self.find(q)).count()
    }

    /// Every value stored under `q`, first entry of the run first.
    pub fn values_for<Q>(&self, q: &Q) -> ValuesFor<'_, KC, VC, C>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        ValuesFor {
            store: self,
            next: self.find(q),
        }
    }

    pub fn values_cursor_for<Q>(&self, q: &Q) -> Cursor
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        Cursor::values_for(self.find(q), self.epoch.mark())
    }

    /// Drops every entry and resets access bookkeeping. Auto-shrinking
    /// stores return to their initial capacity.
    pub fn clear(&mut self) {
        let dropped = self.len();
        self.index.reset();
        self.keys.clear();
        self.values.clear();
        if let Some(access) = &mut self.access {
            access.reset();
        }
        if let Some(flags) = &mut self.siblings {
            flags.fill(false);
        }
        self.zero_key = None;
        self.epoch.bump();
        log::debug!("store cleared, {dropped} entries dropped");
        self.shrink_if_empty();
    }

    /// Rebuilds the index at `new_capacity` slots, compacting live entries
    /// into the lowest slots in their current order. Access stamps move with
    /// their entries. `new_capacity` is capped at the configured ceiling;
    /// the call is ignored when that is below `len()`.
    pub fn rehash(&mut self, new_capacity: usize) {
        let mut new_capacity = new_capacity.max(MIN_CAPACITY);
        let ceiling = self.config.ceiling();
        if ceiling != 0 {
            new_capacity = new_capacity.min(ceiling);
        }
        if new_capacity < self.len() {
            log::debug!(
                "rehash to {new_capacity} ignored with {} live entries",
                self.len()
            );
            return;
        }
        let old_capacity = self.capacity();
        let high_water = self.index.high_water();
        let old_zero = self.zero_key.take();
        self.index.resize_buckets(new_capacity, new_capacity);

        for slot in 0..high_water {
            if !(self.keys.is_occupied(slot) || old_zero == Some(slot)) {
                continue;
            }
            let Some(key) = self.keys.get(slot) else {
                continue;
            };
            let bucket = self.index.bucket_of(self.hash_of(key));
            let (pred, sibling) = self.rechain_point(bucket, slot);
            let target = self.index.link(bucket, pred);
            debug_assert!(target <= slot, "compaction moved slot {slot} up to {target}");
            if target != slot {
                self.keys.swap(slot, target);
                self.values.swap(slot, target);
                if let Some(access) = &mut self.access {
                    access.move_stamp(slot, target);
                }
            }
            if let Some(flags) = &mut self.siblings {
                flags[slot] = false;
                flags[target] = sibling;
            }
            if old_zero == Some(slot) {
                self.zero_key = Some(target);
            }
        }

        self.keys.resize(new_capacity);
        self.values.resize(new_capacity);
        if let Some(access) = &mut self.access {
            access.resize(new_capacity);
        }
        if let Some(flags) = &mut self.siblings {
            flags.resize(new_capacity, false);
        }
        self.epoch.bump();
        log::debug!(
            "rehashed from {old_capacity} to {new_capacity} slots, {} live",
            self.len()
        );
    }

    /// Where the entry at old `slot` rejoins `bucket` during a rehash:
    /// after the last equal key in a multi-value store, else at the tail.
    fn rechain_point(&self, bucket: usize, slot: usize) -> (Option<usize>, bool) {
        let Some(key) = self.keys.get(slot) else {
            return (None, false);
        };
        let multi = self.siblings.is_some();
        let mut tail = None;
        let mut last_equal = None;
        for s in self.index.chain(bucket) {
            if multi
                && self
                    .keys
                    .get(s)
                    .map(|k| self.comparator.eq(k, key))
                    .unwrap_or(false)
            {
                last_equal = Some(s);
            }
            tail = Some(s);
        }
        match last_equal {
            Some(s) => (Some(s), true),
            None => (tail, false),
        }
    }

    fn place(
        &mut self,
        bucket: usize,
        pred: Option<usize>,
        key: KC::Key,
        value: VC::Value,
        sibling: bool,
    ) -> usize {
        let slot = self.index.link(bucket, pred);
        if KC::is_zero(&key) {
            debug_assert!(self.zero_key.is_none(), "second zero key");
            self.zero_key = Some(slot);
        }
        self.keys.put(slot, key);
        self.values.put(slot, value);
        if let Some(access) = &self.access {
            access.stamp_new(slot);
        }
        if let Some(flags) = &mut self.siblings {
            flags[slot] = sibling;
        }
        self.epoch.bump();
        slot
    }

    /// Frees room for one new key: grow while below the ceiling, else
    /// apply the purge policy.
    fn make_room(&mut self) -> Result<()> {
        let ceiling = self.config.ceiling();
        let threshold = self.threshold();
        if ceiling == 0 || ceiling > threshold {
            let mut target = threshold.saturating_mul(2);
            if ceiling != 0 {
                target = target.min(ceiling);
            }
            self.rehash(target);
            return Ok(());
        }
        match self.config.policy() {
            PurgePolicy::NoPurge => {
                log::debug!("store exhausted at {threshold} entries");
                Err(StoreError::Exhausted)
            }
            PurgePolicy::PurgeAll => {
                self.clear();
                Ok(())
            }
            PurgePolicy::PurgeHalf => {
                self.purge_half();
                Ok(())
            }
        }
    }

    /// Evicts roughly the least recently touched half of the entries,
    /// falling back to a full clear when too many survive.
    fn purge_half(&mut self) {
        let threshold = self.threshold();
        let target = threshold >> 1;
        let margin = (threshold >> 8).max(64.min(threshold >> 2));
        let Some(ceiling) = self.access_ceiling(target, margin) else {
            self.clear();
            return;
        };
        let before = self.len();
        let mut slot = 0;
        while slot < self.index.high_water() {
            let stale = self
                .stamp_at(slot)
                .map(|stamp| stamp < ceiling)
                .unwrap_or(false);
            if stale {
                self.remove_at(slot);
                if self.is_ordered() {
                    // The gap closed; `slot` now holds the next entry.
                    continue;
                }
            }
            slot += 1;
        }
        if let Some(access) = &mut self.access {
            access.set_floor(ceiling);
        }
        log::debug!(
            "purged {} of {before} entries below access stamp {ceiling}",
            before - self.len()
        );
        // At least one slot must come free for the pending insert.
        if self.len() > threshold.saturating_sub(margin.max(1)) {
            log::debug!("partial purge kept {} entries, clearing", self.len());
            self.clear();
        }
    }

    /// Unlinks and empties `slot`, then reclaims it or, in ordered stores,
    /// closes the gap.
    fn release(&mut self, bucket: usize, pred: Option<usize>, slot: usize) -> Option<VC::Value> {
        let next = self.index.next(slot);
        self.index.unlink(bucket, pred, slot);
        let _key = self.keys.take(slot);
        let value = self.values.take(slot);
        if self.zero_key == Some(slot) {
            self.zero_key = None;
        }
        if let Some(access) = &mut self.access {
            access.clear(slot);
        }
        if let Some(flags) = &mut self.siblings {
            let was_sibling = core::mem::replace(&mut flags[slot], false);
            // The run's second entry becomes its first.
            if let (false, Some(n)) = (was_sibling, next) {
                flags[n] = false;
            }
        }
        if self.is_ordered() {
            self.close_gap(slot);
        } else {
            self.index.reclaim(slot);
        }
        self.epoch.bump();
        value
    }

    fn close_gap(&mut self, slot: usize) {
        let high_water = self.index.high_water();
        self.index.close_gap(slot);
        self.keys.close_gap(slot, high_water);
        self.values.close_gap(slot, high_water);
        if let Some(access) = &mut self.access {
            access.close_gap(slot, high_water);
        }
        if let Some(flags) = &mut self.siblings {
            flags[slot..high_water].rotate_left(1);
        }
        if let Some(z) = self.zero_key {
            if z > slot {
                self.zero_key = Some(z - 1);
            }
        }
    }

    /// Removes the live entry at `slot`, locating its chain predecessor by
    /// rehashing its key.
    pub(crate) fn remove_at(&mut self, slot: usize) -> Option<VC::Value> {
        if !self.is_live(slot) {
            return None;
        }
        let key = self.keys.get(slot)?;
        let bucket = self.index.bucket_of(self.hash_of(key));
        let Some(pred) = self.index.predecessor_of(bucket, slot) else {
            panic!("slot {slot} is missing from its bucket chain");
        };
        self.release(bucket, pred, slot)
    }

    /// Removes the run starting at `slot` and returns its length.
    pub(crate) fn remove_run(&mut self, slot: usize) -> usize {
        let mut removed = 0;
        while let Some(next) = self.next_sibling(slot) {
            self.remove_at(next);
            removed += 1;
        }
        if self.remove_at(slot).is_some() {
            removed += 1;
        }
        removed
    }

    pub(crate) fn shrink_if_empty(&mut self) {
        let initial = self.config.effective_capacity();
        if self.config.shrinks_when_empty() && self.is_empty() && self.capacity() != initial {
            self.rehash(initial);
        }
    }
}

/// Iterator over live `(key, value)` entries in slot order.
pub struct Iter<'a, KC, VC, C> {
    store: &'a AssociativeStore<KC, VC, C>,
    pos: usize,
    distinct: bool,
}

impl<'a, KC, VC, C> Iterator for Iter<'a, KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
{
    type Item = (&'a KC::Key, &'a VC::Value);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.store.next_live(self.pos, self.distinct)?;
        self.pos = slot + 1;
        Some((self.store.keys.get(slot)?, self.store.values.get(slot)?))
    }
}

/// Iterator over the values stored under one key.
pub struct ValuesFor<'a, KC, VC, C> {
    store: &'a AssociativeStore<KC, VC, C>,
    next: Option<usize>,
}

impl<'a, KC, VC, C> Iterator for ValuesFor<'a, KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
{
    type Item = &'a VC::Value;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        self.next = self.store.next_sibling(slot);
        self.store.values.get(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessOrder, ACCESS_MAX};
    use crate::columns::{
        IntKeys, IntValues, LongKeys, LongValues, NoValues, ObjectKeys, ObjectValues, PairValues,
    };
    use crate::comparator::IntIdentity;
    use core::fmt::Debug;
    use test_log::test;

    type IntObj = AssociativeStore<IntKeys, ObjectValues<&'static str>, IntIdentity>;
    type StrMulti = AssociativeStore<ObjectKeys<String>, IntValues>;

    fn int_obj(config: StoreConfig) -> IntObj {
        AssociativeStore::with_config(config, IntIdentity).unwrap()
    }

    fn multi() -> StrMulti {
        AssociativeStore::with_config(StoreConfig::new(4).multi_value(true), HashEq::default())
            .unwrap()
    }

    /// Invariant: Keys 1..=4 in a capacity-4 store survive a removal and the
    /// growth triggered by the next new key.
    #[test]
    fn capacity_four_scenario() {
        let mut s = int_obj(StoreConfig::new(4));
        for (k, v) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
            assert_eq!(s.upsert(k, v), Ok(None));
        }
        assert_eq!(s.get(&2), Some(&"b"));
        assert_eq!(s.remove(&2), Some("b"));
        assert_eq!(s.get(&2), None);
        assert_eq!(s.len(), 3);

        s.upsert(5, "e").unwrap();
        s.upsert(6, "f").unwrap();
        assert!(s.capacity() > 4);
        for (k, v) in [(1, "a"), (3, "c"), (4, "d"), (5, "e"), (6, "f")] {
            assert_eq!(s.get(&k), Some(&v));
        }
    }

    /// Invariant: Upserting an existing key overwrites in place and returns
    /// the previous value without changing `len`.
    #[test]
    fn upsert_overwrites() {
        let mut s = int_obj(StoreConfig::new(4));
        assert_eq!(s.upsert(7, "x"), Ok(None));
        assert_eq!(s.upsert(7, "y"), Ok(Some("x")));
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(&7), Some(&"y"));
    }

    /// Invariant: Removing an absent key is a no-op, repeatedly.
    #[test]
    fn remove_absent_is_noop() {
        let mut s = int_obj(StoreConfig::new(4));
        s.upsert(1, "a").unwrap();
        assert_eq!(s.remove(&9), None);
        assert_eq!(s.remove(&9), None);
        assert_eq!(s.len(), 1);
    }

    /// Invariant: The integer key `0` is stored, found, removed and stored
    /// again, and survives rehashing.
    #[test]
    fn zero_key_round_trip() {
        let mut s: AssociativeStore<LongKeys, IntValues, IntIdentity> =
            AssociativeStore::with_config(StoreConfig::new(3), IntIdentity).unwrap();
        s.upsert(0, 10).unwrap();
        s.upsert(5, 50).unwrap();
        assert_eq!(s.get(&0), Some(&10));
        assert_eq!(s.keys().copied().collect::<Vec<_>>(), vec![0, 5]);

        s.rehash(12);
        assert_eq!(s.get(&0), Some(&10));
        assert_eq!(s.remove(&0), Some(10));
        assert!(!s.contains_key(&0));
        assert_eq!(s.keys().count(), 1);
        assert_eq!(s.upsert(0, 11), Ok(None));
        assert_eq!(s.get(&0), Some(&11));
    }

    /// Invariant: Multi-value runs hold distinct values per key; identical
    /// pairs are not duplicated; key and key-value removal behave per run.
    #[test]
    fn multi_value_runs() {
        let mut s = multi();
        assert_eq!(s.upsert_multi("x".to_string(), 1), Ok(None));
        assert_eq!(s.upsert_multi("x".to_string(), 2), Ok(None));
        assert_eq!(s.upsert_multi("x".to_string(), 1), Ok(Some(1)));
        assert_eq!(s.values_for("x").count(), 2);
        assert_eq!(s.value_count("x"), 2);
        assert_eq!(s.len(), 2);

        assert_eq!(s.remove_by_key_value("x", &1), Some(1));
        assert_eq!(s.values_for("x").copied().collect::<Vec<_>>(), vec![2]);
        assert_eq!(s.remove_by_key("x"), 1);
        assert_eq!(s.values_for("x").count(), 0);
        assert!(s.is_empty());
    }

    /// Invariant: Runs stay contiguous and ordered across growth, and the
    /// distinct-key view lists each key once.
    #[test]
    fn multi_value_runs_survive_rehash() {
        let mut s = multi();
        for i in 0..6 {
            s.upsert_multi(format!("k{}", i % 3), i).unwrap();
        }
        assert!(s.capacity() >= 6);
        for k in 0..3 {
            let vals: Vec<_> = s.values_for(&format!("k{k}")).copied().collect();
            assert_eq!(vals, vec![k, k + 3]);
        }
        let mut distinct: Vec<_> = s.distinct_keys().cloned().collect();
        distinct.sort();
        assert_eq!(distinct, vec!["k0", "k1", "k2"]);
    }

    /// Invariant: Removing a run's first entry promotes the next one, so the
    /// key still appears in the distinct view.
    #[test]
    fn removing_run_head_promotes_sibling() {
        let mut s = multi();
        s.upsert_multi("a".to_string(), 1).unwrap();
        s.upsert_multi("a".to_string(), 2).unwrap();
        assert_eq!(s.remove("a"), Some(1));
        assert_eq!(s.distinct_keys().count(), 1);
        assert_eq!(s.values_for("a").copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn multi_zero_key_conflict() {
        let mut s: AssociativeStore<IntKeys, IntValues, IntIdentity> =
            AssociativeStore::with_config(StoreConfig::new(4).multi_value(true), IntIdentity)
                .unwrap();
        s.upsert_multi(0, 1).unwrap();
        assert_eq!(s.upsert_multi(0, 1), Ok(Some(1)));
        assert_eq!(s.upsert_multi(0, 2), Err(StoreError::ZeroKeyConflict));
        s.upsert_multi(3, 1).unwrap();
        s.upsert_multi(3, 2).unwrap();
        assert_eq!(s.value_count(&3), 2);
    }

    #[test]
    #[should_panic(expected = "multi-value operation")]
    fn multi_on_single_value_store_panics() {
        let mut s: StrMulti = AssociativeStore::new();
        let _ = s.upsert_multi("a".to_string(), 1);
    }

    /// Invariant: A multi-value store only takes `upsert_multi`, so a plain
    /// upsert can never leave two equal values under one key.
    #[test]
    #[should_panic(expected = "single-value upsert")]
    fn single_upsert_on_multi_store_panics() {
        let mut s = multi();
        s.upsert_multi("k".to_string(), 1).unwrap();
        s.upsert_multi("k".to_string(), 2).unwrap();
        let _ = s.upsert("k".to_string(), 2);
    }

    /// Invariant: Under `NoPurge` at the ceiling, a new key fails while an
    /// existing key still updates.
    #[test]
    fn no_purge_exhausts() {
        let mut s = int_obj(StoreConfig::new(3).max_capacity(3));
        for k in 1..=3 {
            s.upsert(k, "v").unwrap();
        }
        assert_eq!(s.upsert(4, "v"), Err(StoreError::Exhausted));
        assert_eq!(s.upsert(2, "w"), Ok(Some("v")));
        assert_eq!(s.len(), 3);
    }

    /// Invariant: Growth doubles up to the ceiling and never beyond it.
    #[test]
    fn growth_capped_at_ceiling() {
        let mut s = int_obj(StoreConfig::new(4).max_capacity(6));
        for k in 1..=6 {
            s.upsert(k, "v").unwrap();
        }
        assert_eq!(s.capacity(), 6);
        assert_eq!(s.upsert(7, "v"), Err(StoreError::Exhausted));
    }

    #[test]
    fn purge_all_clears_then_inserts() {
        let mut s = int_obj(
            StoreConfig::new(4)
                .max_capacity(4)
                .purge_policy(PurgePolicy::PurgeAll),
        );
        for k in 1..=4 {
            s.upsert(k, "v").unwrap();
        }
        s.upsert(5, "w").unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(&5), Some(&"w"));
    }

    /// Invariant: Partial purge never fails, stays within the ceiling and
    /// keeps recently touched entries over untouched ones.
    #[test]
    fn purge_half_keeps_hot_entries() {
        let mut s = int_obj(
            StoreConfig::new(64)
                .max_capacity(64)
                .purge_policy(PurgePolicy::PurgeHalf)
                .access_tracking(AccessOrder::Recency),
        );
        for k in 1..=64 {
            s.upsert(k, "cold").unwrap();
        }
        for k in 100..300 {
            for hot in 1..=8 {
                assert!(s.get(&hot).is_some(), "hot key {hot} evicted");
            }
            s.upsert(k, "new").unwrap();
            assert!(s.len() <= 64);
        }
        for k in 1..=8 {
            assert!(s.contains_key(&k), "hot key {k} evicted");
        }
    }

    /// Invariant: Rehash compacts gaps while preserving relative order and
    /// carrying access stamps.
    #[test]
    fn rehash_compacts_in_order() {
        let mut s = int_obj(StoreConfig::new(8).access_tracking(AccessOrder::Recency));
        for k in 1..=6 {
            s.upsert(k, "v").unwrap();
        }
        s.remove(&2);
        s.remove(&4);
        s.get(&5);
        let stamp = s.access_stamp(&5);
        s.rehash(8);
        assert_eq!(s.keys().copied().collect::<Vec<_>>(), vec![1, 3, 5, 6]);
        assert_eq!(s.access_stamp(&5), stamp);
        assert_eq!(s.get_index(2), Some(&5));
        assert_eq!(s.index_of(&6), Some(3));
    }

    #[test]
    fn rehash_below_len_is_ignored() {
        let mut s = int_obj(StoreConfig::new(8));
        for k in 1..=6 {
            s.upsert(k, "v").unwrap();
        }
        s.rehash(4);
        assert_eq!(s.capacity(), 8);
        assert_eq!(s.len(), 6);
    }

    /// Invariant: An explicit rehash never lifts capacity past the ceiling,
    /// so later purges still keep `len` within it.
    #[test]
    fn rehash_capped_at_ceiling() {
        let mut s = int_obj(
            StoreConfig::new(8)
                .max_capacity(8)
                .purge_policy(PurgePolicy::PurgeHalf)
                .access_tracking(AccessOrder::Recency),
        );
        s.rehash(100);
        assert_eq!(s.capacity(), 8);
        for k in 1..=200 {
            s.upsert(k, "v").unwrap();
            assert!(s.len() <= 8, "len {} after key {k}", s.len());
            assert_eq!(s.get(&k), Some(&"v"));
        }
    }

    /// Invariant: Emptying an auto-shrinking store restores the initial
    /// capacity; `clear` does the same.
    #[test]
    fn auto_shrink_on_empty() {
        let mut s = int_obj(StoreConfig::new(4).auto_shrink(true));
        for k in 1..=20 {
            s.upsert(k, "v").unwrap();
        }
        assert!(s.capacity() >= 20);
        for k in 1..=20 {
            s.remove(&k);
        }
        assert_eq!(s.capacity(), 4);

        for k in 1..=20 {
            s.upsert(k, "v").unwrap();
        }
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.capacity(), 4);
    }

    /// Invariant: Ordered stores stay packed in insertion order after
    /// removals and answer positional queries from slots.
    #[test]
    fn ordered_store_closes_gaps() {
        let mut s: AssociativeStore<ObjectKeys<&'static str>, NoValues> =
            AssociativeStore::with_config(StoreConfig::new(4).ordered(true), HashEq::default())
                .unwrap();
        for k in ["a", "b", "c", "d", "e"] {
            s.upsert(k, ()).unwrap();
        }
        s.remove(&"b");
        s.remove(&"a");
        assert_eq!(s.keys().copied().collect::<Vec<_>>(), vec!["c", "d", "e"]);
        assert_eq!(s.get_index(0), Some(&"c"));
        assert_eq!(s.index_of(&"e"), Some(2));
        s.upsert("f", ()).unwrap();
        assert_eq!(s.get_index(3), Some(&"f"));
        assert!(s.contains_key(&"d"));
    }

    #[test]
    fn contains_value_scans_live_slots() {
        let mut s = int_obj(StoreConfig::new(4));
        s.upsert(1, "a").unwrap();
        s.upsert(2, "b").unwrap();
        s.remove(&1);
        assert!(!s.contains_value(&"a"));
        assert!(s.contains_value(&"b"));
    }

    /// Invariant: Unset object values are modeled with `Option` and found
    /// by `contains_value(&None)`.
    #[test]
    fn contains_unset_value() {
        let mut s: AssociativeStore<IntKeys, ObjectValues<Option<u8>>, IntIdentity> =
            AssociativeStore::with_config(StoreConfig::new(4), IntIdentity).unwrap();
        s.upsert(1, Some(3)).unwrap();
        assert!(!s.contains_value(&None));
        s.upsert(2, None).unwrap();
        assert!(s.contains_value(&None));
    }

    /// Invariant: `peek` leaves the access stamp alone, `get` moves it.
    #[test]
    fn peek_does_not_touch() {
        let mut s = int_obj(StoreConfig::new(4).access_tracking(AccessOrder::Recency));
        s.upsert(1, "a").unwrap();
        s.upsert(2, "b").unwrap();
        let before = s.access_stamp(&1);
        s.peek(&1);
        assert_eq!(s.access_stamp(&1), before);
        s.get(&1);
        assert!(s.access_stamp(&1) > s.access_stamp(&2));
    }

    /// Invariant: Stamps pushed to the limit by lookups alone are
    /// compressed by the next removal, whether through the store or a
    /// cursor, with their order kept.
    #[test]
    fn removal_renormalizes_saturated_stamps() {
        let mut s = int_obj(StoreConfig::new(8).access_tracking(AccessOrder::Recency));
        for k in 1..=3 {
            s.upsert(k, "v").unwrap();
        }
        assert!(s.set_stamp_at(0, ACCESS_MAX));
        s.get(&2);
        assert!(s.access_stamp(&2) > Some(ACCESS_MAX));

        assert_eq!(s.remove(&99), None);
        let low = (ACCESS_MAX >> 2) + 1;
        assert_eq!(s.access_stamp(&1), Some(low));
        assert!(s.access_stamp(&2) > Some(low));
        assert!(s.access_stamp(&2) < Some(ACCESS_MAX));

        assert!(s.set_stamp_at(0, ACCESS_MAX));
        let mut cursor = s.key_cursor();
        while cursor.has_next(&s) {
            if *cursor.next_key(&s).unwrap() == 3 {
                cursor.remove(&mut s).unwrap();
            }
        }
        assert_eq!(s.access_stamp(&1), Some(low));
        assert_eq!(s.len(), 2);
    }

    fn round_trip<KC, VC, C>(
        comparator: C,
        keys: Vec<KC::Key>,
        value: impl Fn(usize) -> VC::Value,
    ) where
        KC: KeyColumn,
        VC: ValueColumn,
        C: KeyComparator<KC::Key>,
        KC::Key: Clone + Debug,
        VC::Value: PartialEq + Debug,
    {
        let mut s: AssociativeStore<KC, VC, C> =
            AssociativeStore::with_config(StoreConfig::new(3), comparator).unwrap();
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(s.upsert(k.clone(), value(i)), Ok(None), "key {k:?}");
        }
        assert_eq!(s.len(), keys.len());
        assert!(s.capacity() >= keys.len());
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(s.get(k), Some(&value(i)), "key {k:?}");
        }
        s.rehash(keys.len());
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(s.get(k), Some(&value(i)), "key {k:?} after rehash");
        }
    }

    fn int_keys() -> Vec<i32> {
        (-20..20).collect()
    }

    fn long_keys() -> Vec<i64> {
        (-20i64..20).map(|k| k << 33).collect()
    }

    fn object_keys() -> Vec<String> {
        (0..40).map(|k| format!("k{k}")).collect()
    }

    /// Invariant: Every key column paired with every value column returns
    /// what was stored, across growth from capacity 3 and a rehash.
    #[test]
    fn every_column_pairing_round_trips() {
        macro_rules! with_every_value_column {
            ($kc:ty, $comparator:expr, $keys:expr) => {
                round_trip::<$kc, NoValues, _>($comparator, $keys, |_| ());
                round_trip::<$kc, IntValues, _>($comparator, $keys, |i| i as i32 - 7);
                round_trip::<$kc, LongValues, _>($comparator, $keys, |i| (i as i64) << 40);
                round_trip::<$kc, ObjectValues<String>, _>($comparator, $keys, |i| {
                    format!("v{i}")
                });
                round_trip::<$kc, PairValues<String, u8>, _>($comparator, $keys, |i| {
                    (format!("v{i}"), i as u8)
                });
            };
        }
        with_every_value_column!(IntKeys, IntIdentity, int_keys());
        with_every_value_column!(LongKeys, IntIdentity, long_keys());
        with_every_value_column!(ObjectKeys<String>, <HashEq>::default(), object_keys());
    }

    #[test]
    fn store_is_sync_for_sync_contents() {
        fn assert_sync<T: Sync + Send>() {}
        assert_sync::<IntObj>();
        assert_sync::<StrMulti>();
    }
}
