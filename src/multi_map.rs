//! Several values per key, stored as adjacent runs in the bucket chain.

use crate::columns::{IntKeys, KeyColumn, ObjectKeys, ObjectValues, ValueColumn};
use crate::comparator::{HashEq, IntIdentity, KeyComparator};
use crate::config::StoreConfig;
use crate::cursor::Cursor;
use crate::error::{ConfigError, Result};
use crate::store::{AssociativeStore, Iter, ValuesFor};
use core::borrow::Borrow;

pub struct MultiMap<KC, VC, C = HashEq> {
    store: AssociativeStore<KC, VC, C>,
}

pub type ObjectMultiMap<K, V, C = HashEq> = MultiMap<ObjectKeys<K>, ObjectValues<V>, C>;
pub type IntKeyMultiMap<V> = MultiMap<IntKeys, ObjectValues<V>, IntIdentity>;

impl<KC, VC, C> Default for MultiMap<KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
    C: KeyComparator<KC::Key> + Default,
{
    fn default() -> Self {
        Self {
            store: AssociativeStore::build(StoreConfig::default().multi_value(true), C::default()),
        }
    }
}

impl<KC, VC, C> MultiMap<KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
    C: KeyComparator<KC::Key> + Default,
{
    pub fn new() -> Self {
        Self::default()
    }
}

impl<KC, VC, C> MultiMap<KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
    VC::Value: PartialEq,
    C: KeyComparator<KC::Key>,
{
    pub fn with_config(config: StoreConfig, comparator: C) -> core::result::Result<Self, ConfigError> {
        Ok(Self {
            store: AssociativeStore::with_config(config.multi_value(true), comparator)?,
        })
    }

    /// Adds `(key, value)`. Returns `Ok(false)` if the identical pair was
    /// already present.
    pub fn insert(&mut self, key: KC::Key, value: VC::Value) -> Result<bool> {
        Ok(self.store.upsert_multi(key, value)?.is_none())
    }

    /// First value stored under `q`.
    pub fn get<Q>(&self, q: &Q) -> Option<&VC::Value>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.get(q)
    }

    pub fn get_all<Q>(&self, q: &Q) -> ValuesFor<'_, KC, VC, C>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.values_for(q)
    }

    pub fn value_count<Q>(&self, q: &Q) -> usize
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.value_count(q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.contains_key(q)
    }

    pub fn contains_value(&self, value: &VC::Value) -> bool {
        self.store.contains_value(value)
    }

    /// Removes every value under `q`, returning how many there were.
    pub fn remove_all<Q>(&mut self, q: &Q) -> usize
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.remove_by_key(q)
    }

    pub fn remove_value<Q>(&mut self, q: &Q, value: &VC::Value) -> Option<VC::Value>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.remove_by_key_value(q, value)
    }

    /// Number of `(key, value)` entries.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&mut self) {
        self.store.clear()
    }

    pub fn rehash(&mut self, new_capacity: usize) {
        self.store.rehash(new_capacity)
    }

    pub fn iter(&self) -> Iter<'_, KC, VC, C> {
        self.store.iter()
    }

    pub fn distinct_keys(&self) -> impl Iterator<Item = &KC::Key> + '_ {
        self.store.distinct_keys()
    }

    pub fn distinct_key_cursor(&self) -> Cursor {
        self.store.distinct_key_cursor()
    }

    pub fn values_cursor_for<Q>(&self, q: &Q) -> Cursor
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.values_cursor_for(q)
    }

    pub fn store(&self) -> &AssociativeStore<KC, VC, C> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AssociativeStore<KC, VC, C> {
        &mut self.store
    }
}
