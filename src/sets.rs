//! Key-only stores: hash sets and the insertion-ordered set.

use crate::columns::{IntKeys, KeyColumn, LongKeys, NoValues, ObjectKeys};
use crate::comparator::{HashEq, IntIdentity, KeyComparator};
use crate::config::StoreConfig;
use crate::cursor::Cursor;
use crate::error::{ConfigError, Result};
use crate::store::AssociativeStore;
use core::borrow::Borrow;

pub struct Set<KC, C = HashEq> {
    store: AssociativeStore<KC, NoValues, C>,
}

pub type IntSet = Set<IntKeys, IntIdentity>;
pub type LongSet = Set<LongKeys, IntIdentity>;
pub type ObjectSet<K, C = HashEq> = Set<ObjectKeys<K>, C>;

impl<KC, C> Default for Set<KC, C>
where
    KC: KeyColumn,
    C: KeyComparator<KC::Key> + Default,
{
    fn default() -> Self {
        Self {
            store: AssociativeStore::new(),
        }
    }
}

impl<KC, C> Set<KC, C>
where
    KC: KeyColumn,
    C: KeyComparator<KC::Key> + Default,
{
    pub fn new() -> Self {
        Self::default()
    }
}

impl<KC, C> Set<KC, C>
where
    KC: KeyColumn,
    C: KeyComparator<KC::Key>,
{
    pub fn with_config(config: StoreConfig, comparator: C) -> core::result::Result<Self, ConfigError> {
        Ok(Self {
            store: AssociativeStore::with_config(config.multi_value(false), comparator)?,
        })
    }

    /// Returns `true` if `key` was not yet present.
    pub fn insert(&mut self, key: KC::Key) -> Result<bool> {
        Ok(self.store.upsert(key, ())?.is_none())
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.contains_key(q)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.remove(q).is_some()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn clear(&mut self) {
        self.store.clear()
    }

    pub fn rehash(&mut self, new_capacity: usize) {
        self.store.rehash(new_capacity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KC::Key> + '_ {
        self.store.keys()
    }

    pub fn cursor(&self) -> Cursor {
        self.store.key_cursor()
    }

    pub fn store(&self) -> &AssociativeStore<KC, NoValues, C> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AssociativeStore<KC, NoValues, C> {
        &mut self.store
    }
}

/// Object set that iterates in insertion order and answers positional
/// queries. Removal shifts later keys down by one position.
pub struct OrderedSet<K, C = HashEq> {
    store: AssociativeStore<ObjectKeys<K>, NoValues, C>,
}

impl<K, C> Default for OrderedSet<K, C>
where
    C: KeyComparator<K> + Default,
{
    fn default() -> Self {
        Self {
            store: AssociativeStore::build(StoreConfig::default().ordered(true), C::default()),
        }
    }
}

impl<K, C> OrderedSet<K, C>
where
    C: KeyComparator<K> + Default,
{
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, C> OrderedSet<K, C>
where
    C: KeyComparator<K>,
{
    pub fn with_config(config: StoreConfig, comparator: C) -> core::result::Result<Self, ConfigError> {
        Ok(Self {
            store: AssociativeStore::with_config(config.ordered(true), comparator)?,
        })
    }

    /// Appends `key` unless present; an existing key keeps its position.
    pub fn insert(&mut self, key: K) -> Result<bool> {
        Ok(self.store.upsert(key, ())?.is_none())
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.contains_key(q)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.remove(q).is_some()
    }

    pub fn get_index(&self, position: usize) -> Option<&K> {
        self.store.get_index(position)
    }

    pub fn index_of<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.index_of(q)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&mut self) {
        self.store.clear()
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        self.store.keys()
    }

    pub fn cursor(&self) -> Cursor {
        self.store.key_cursor()
    }

    pub fn store(&self) -> &AssociativeStore<ObjectKeys<K>, NoValues, C> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AssociativeStore<ObjectKeys<K>, NoValues, C> {
        &mut self.store
    }
}
