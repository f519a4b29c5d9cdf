//! Single-value maps over `AssociativeStore`.

use crate::columns::{
    IntKeys, IntValues, KeyColumn, LongKeys, LongValues, ObjectKeys, ObjectValues, PairValues,
    ValueColumn,
};
use crate::comparator::{HashEq, IntIdentity, KeyComparator};
use crate::config::StoreConfig;
use crate::cursor::Cursor;
use crate::error::{ConfigError, Result};
use crate::store::{AssociativeStore, Iter};
use core::borrow::Borrow;

/// One value per key.
pub struct Map<KC, VC, C = HashEq> {
    store: AssociativeStore<KC, VC, C>,
}

pub type IntKeyMap<V> = Map<IntKeys, ObjectValues<V>, IntIdentity>;
pub type LongKeyMap<V> = Map<LongKeys, ObjectValues<V>, IntIdentity>;
pub type ObjectMap<K, V, C = HashEq> = Map<ObjectKeys<K>, ObjectValues<V>, C>;
pub type IntKeyIntValueMap = Map<IntKeys, IntValues, IntIdentity>;
pub type IntKeyLongValueMap = Map<IntKeys, LongValues, IntIdentity>;
pub type LongKeyLongValueMap = Map<LongKeys, LongValues, IntIdentity>;
pub type LongKeyIntValueMap = Map<LongKeys, IntValues, IntIdentity>;

impl<KC, VC, C> Default for Map<KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
    C: KeyComparator<KC::Key> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<KC, VC, C> Map<KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
    C: KeyComparator<KC::Key> + Default,
{
    pub fn new() -> Self {
        Self {
            store: AssociativeStore::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> core::result::Result<Self, ConfigError> {
        Self::with_config(StoreConfig::new(capacity), C::default())
    }
}

impl<KC, VC, C> Map<KC, VC, C>
where
    KC: KeyColumn,
    VC: ValueColumn,
    C: KeyComparator<KC::Key>,
{
    /// Multi-value settings in `config` are ignored.
    pub fn with_config(config: StoreConfig, comparator: C) -> core::result::Result<Self, ConfigError> {
        Ok(Self {
            store: AssociativeStore::with_config(config.multi_value(false), comparator)?,
        })
    }

    pub fn insert(&mut self, key: KC::Key, value: VC::Value) -> Result<Option<VC::Value>> {
        self.store.upsert(key, value)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&VC::Value>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.get(q)
    }

    /// Like [`Map::get`] without refreshing the entry's access stamp.
    pub fn peek<Q>(&self, q: &Q) -> Option<&VC::Value>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.peek(q)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut VC::Value>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.get_mut(q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.contains_key(q)
    }

    pub fn contains_value(&self, value: &VC::Value) -> bool
    where
        VC::Value: PartialEq,
    {
        self.store.contains_value(value)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<VC::Value>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.remove(q)
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

    pub fn iter(&self) -> Iter<'_, KC, VC, C> {
        self.store.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &KC::Key> + '_ {
        self.store.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &VC::Value> + '_ {
        self.store.values()
    }

    pub fn key_cursor(&self) -> Cursor {
        self.store.key_cursor()
    }

    pub fn value_cursor(&self) -> Cursor {
        self.store.value_cursor()
    }

    /// The backing store, for driving cursors.
    pub fn store(&self) -> &AssociativeStore<KC, VC, C> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AssociativeStore<KC, VC, C> {
        &mut self.store
    }
}

/// Two associated objects per key.
///
/// Unlike the other maps, an insert refused under `NoPurge` at the capacity
/// ceiling is not an error here: it returns `None` and stores nothing.
pub struct PairMap<KC, V, W, C = HashEq> {
    store: AssociativeStore<KC, PairValues<V, W>, C>,
}

pub type ObjectPairMap<K, V, W, C = HashEq> = PairMap<ObjectKeys<K>, V, W, C>;

impl<KC, V, W, C> Default for PairMap<KC, V, W, C>
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

impl<KC, V, W, C> PairMap<KC, V, W, C>
where
    KC: KeyColumn,
    C: KeyComparator<KC::Key>,
{
    pub fn with_config(config: StoreConfig, comparator: C) -> core::result::Result<Self, ConfigError> {
        Ok(Self {
            store: AssociativeStore::with_config(config.multi_value(false), comparator)?,
        })
    }

    /// Inserts or overwrites both objects. Returns the previous pair, or
    /// `None` for a new key and for an insert refused at the ceiling.
    pub fn insert(&mut self, key: KC::Key, first: V, second: W) -> Option<(V, W)> {
        match self.store.upsert(key, (first, second)) {
            Ok(previous) => previous,
            Err(e) => {
                log::debug!("pair insert dropped: {e}");
                None
            }
        }
    }

    pub fn get<Q>(&self, q: &Q) -> Option<(&V, &W)>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.get(q).map(|(v, w)| (v, w))
    }

    pub fn first<Q>(&self, q: &Q) -> Option<&V>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.get(q).map(|(v, _)| v)
    }

    pub fn second<Q>(&self, q: &Q) -> Option<&W>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.get(q).map(|(_, w)| w)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.contains_key(q)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<(V, W)>
    where
        KC::Key: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.remove(q)
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

    pub fn iter(&self) -> impl Iterator<Item = (&KC::Key, &V, &W)> + '_ {
        self.store.iter().map(|(k, (v, w))| (k, v, w))
    }
}
