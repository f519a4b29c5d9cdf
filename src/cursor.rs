//! Cursor: the explicit iteration protocol with in-place removal.
//!
//! A cursor does not borrow its store. Like a handle, each call takes the
//! store as an argument, so removal can take `&mut` between advances. Any
//! structural change made through another path while the cursor is live
//! is caught in debug builds.

use crate::columns::{KeyColumn, ValueColumn, ValueKind};
use crate::comparator::KeyComparator;
use crate::epoch::EpochMark;
use crate::error::IterError;
use crate::store::AssociativeStore;

/// What a cursor walks over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorMode {
    /// Every live key, in slot order.
    Keys,
    /// Every live value, in slot order.
    Values,
    /// Each key once; removal deletes all of the key's entries.
    DistinctKeys,
    /// The values stored under one key.
    ValuesForKey,
}

#[derive(Debug)]
pub struct Cursor {
    mode: CursorMode,
    /// Next slot to scan from (scan modes).
    pos: usize,
    /// Next run member (values-for-key mode).
    upcoming: Option<usize>,
    current: Option<usize>,
    mark: EpochMark,
}

impl Cursor {
    fn new(mode: CursorMode, upcoming: Option<usize>, mark: EpochMark) -> Self {
        Self {
            mode,
            pos: 0,
            upcoming,
            current: None,
            mark,
        }
    }

    pub(crate) fn keys(mark: EpochMark) -> Self {
        Self::new(CursorMode::Keys, None, mark)
    }

    pub(crate) fn values(mark: EpochMark) -> Self {
        Self::new(CursorMode::Values, None, mark)
    }

    pub(crate) fn distinct_keys(mark: EpochMark) -> Self {
        Self::new(CursorMode::DistinctKeys, None, mark)
    }

    pub(crate) fn values_for(first: Option<usize>, mark: EpochMark) -> Self {
        Self::new(CursorMode::ValuesForKey, first, mark)
    }

    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    fn yields_keys(&self) -> bool {
        matches!(self.mode, CursorMode::Keys | CursorMode::DistinctKeys)
    }

    pub fn has_next<KC, VC, C>(&self, store: &AssociativeStore<KC, VC, C>) -> bool
    where
        KC: KeyColumn,
        VC: ValueColumn,
    {
        self.mark.check(store.epoch());
        match self.mode {
            CursorMode::ValuesForKey => self.upcoming.is_some(),
            mode => store
                .next_live(self.pos, mode == CursorMode::DistinctKeys)
                .is_some(),
        }
    }

    fn advance<KC, VC, C>(&mut self, store: &AssociativeStore<KC, VC, C>) -> Result<usize, IterError>
    where
        KC: KeyColumn,
        VC: ValueColumn,
    {
        self.mark.check(store.epoch());
        let slot = match self.mode {
            CursorMode::ValuesForKey => {
                let slot = self.upcoming.ok_or(IterError::Exhausted)?;
                self.upcoming = store.next_sibling(slot);
                slot
            }
            mode => {
                let slot = store
                    .next_live(self.pos, mode == CursorMode::DistinctKeys)
                    .ok_or(IterError::Exhausted)?;
                self.pos = slot + 1;
                slot
            }
        };
        self.current = Some(slot);
        Ok(slot)
    }

    /// Advances and returns the next key. Fails with `WrongAccessMode` on
    /// value cursors.
    pub fn next_key<'a, KC, VC, C>(
        &mut self,
        store: &'a AssociativeStore<KC, VC, C>,
    ) -> Result<&'a KC::Key, IterError>
    where
        KC: KeyColumn,
        VC: ValueColumn,
    {
        if !self.yields_keys() {
            return Err(IterError::WrongAccessMode);
        }
        let slot = self.advance(store)?;
        store.key_at(slot).ok_or(IterError::Exhausted)
    }

    /// Advances and returns the next value. Fails with `WrongAccessMode` on
    /// key cursors and on stores without values.
    pub fn next_value<'a, KC, VC, C>(
        &mut self,
        store: &'a AssociativeStore<KC, VC, C>,
    ) -> Result<&'a VC::Value, IterError>
    where
        KC: KeyColumn,
        VC: ValueColumn,
    {
        if self.yields_keys() || VC::KIND == ValueKind::None {
            return Err(IterError::WrongAccessMode);
        }
        let slot = self.advance(store)?;
        store.value_at(slot).ok_or(IterError::Exhausted)
    }

    /// Removes the element returned by the last advance. A distinct-key
    /// cursor removes every entry for that key.
    pub fn remove<KC, VC, C>(&mut self, store: &mut AssociativeStore<KC, VC, C>) -> Result<(), IterError>
    where
        KC: KeyColumn,
        VC: ValueColumn,
        C: KeyComparator<KC::Key>,
    {
        self.mark.check(store.epoch());
        let slot = self.current.take().ok_or(IterError::NoCurrentElement)?;
        store.maintain_access();
        match self.mode {
            CursorMode::DistinctKeys => {
                store.remove_run(slot);
            }
            _ => {
                store.remove_at(slot);
            }
        }
        if store.is_ordered() {
            // Later entries moved down one slot.
            self.pos = slot;
            self.upcoming = self.upcoming.map(|n| if n > slot { n - 1 } else { n });
        }
        store.shrink_if_empty();
        self.mark = store.epoch_mark();
        Ok(())
    }

    /// Replaces the current element's value, returning the old one.
    pub fn set_value<KC, VC, C>(
        &mut self,
        store: &mut AssociativeStore<KC, VC, C>,
        value: VC::Value,
    ) -> Result<VC::Value, IterError>
    where
        KC: KeyColumn,
        VC: ValueColumn,
    {
        if self.yields_keys() || VC::KIND == ValueKind::None {
            return Err(IterError::WrongAccessMode);
        }
        self.mark.check(store.epoch());
        let slot = self.current.ok_or(IterError::NoCurrentElement)?;
        store
            .replace_value_at(slot, value)
            .ok_or(IterError::NoCurrentElement)
    }

    /// Access stamp of the current element. `WrongAccessMode` when the
    /// store does not track access.
    pub fn access_count<KC, VC, C>(&self, store: &AssociativeStore<KC, VC, C>) -> Result<u32, IterError>
    where
        KC: KeyColumn,
        VC: ValueColumn,
    {
        self.mark.check(store.epoch());
        let slot = self.current.ok_or(IterError::NoCurrentElement)?;
        store.stamp_at(slot).ok_or(IterError::WrongAccessMode)
    }

    pub fn set_access_count<KC, VC, C>(
        &self,
        store: &AssociativeStore<KC, VC, C>,
        stamp: u32,
    ) -> Result<(), IterError>
    where
        KC: KeyColumn,
        VC: ValueColumn,
    {
        self.mark.check(store.epoch());
        let slot = self.current.ok_or(IterError::NoCurrentElement)?;
        if store.set_stamp_at(slot, stamp) {
            Ok(())
        } else {
            Err(IterError::WrongAccessMode)
        }
    }
}
