//! Bounded object cache with approximate least-recently-used eviction.

use crate::access::AccessOrder;
use crate::columns::{ObjectKeys, ObjectValues};
use crate::comparator::{HashEq, KeyComparator};
use crate::config::{PurgePolicy, StoreConfig, DEFAULT_CAPACITY};
use crate::error::{ConfigError, Result};
use crate::store::{AssociativeStore, Iter};
use core::borrow::Borrow;

/// A map that never grows past `max_capacity` entries. An insert at the
/// limit evicts roughly the least recently used half first.
///
/// Lookups through [`Cache::get`] count as use; [`Cache::peek`] does not.
pub struct Cache<K, V, C = HashEq> {
    store: AssociativeStore<ObjectKeys<K>, ObjectValues<V>, C>,
}

impl<K, V, C> Cache<K, V, C>
where
    C: KeyComparator<K> + Default,
{
    pub fn new(max_capacity: usize) -> core::result::Result<Self, ConfigError> {
        Self::with_comparator(max_capacity, C::default())
    }
}

impl<K, V, C> Cache<K, V, C>
where
    C: KeyComparator<K>,
{
    pub fn with_comparator(
        max_capacity: usize,
        comparator: C,
    ) -> core::result::Result<Self, ConfigError> {
        let config = StoreConfig::new(max_capacity.min(DEFAULT_CAPACITY))
            .max_capacity(max_capacity)
            .purge_policy(PurgePolicy::PurgeHalf)
            .access_tracking(AccessOrder::Recency);
        Ok(Self {
            store: AssociativeStore::with_config(config, comparator)?,
        })
    }

    /// Inserts or overwrites, evicting cold entries when full.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.store.upsert(key, value)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.get(q)
    }

    pub fn peek<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.peek(q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparator<Q>,
    {
        self.store.contains_key(q)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
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

    pub fn max_capacity(&self) -> usize {
        self.store.config().ceiling()
    }

    pub fn clear(&mut self) {
        self.store.clear()
    }

    pub fn iter(&self) -> Iter<'_, ObjectKeys<K>, ObjectValues<V>, C> {
        self.store.iter()
    }

    pub fn store(&self) -> &AssociativeStore<ObjectKeys<K>, ObjectValues<V>, C> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn recently_used_entries_survive_eviction() {
        let mut cache: Cache<u32, String> = Cache::new(32).unwrap();
        for k in 0..32 {
            cache.insert(k, format!("v{k}")).unwrap();
        }
        assert_eq!(cache.store().capacity(), 32);
        for k in 0..4 {
            assert!(cache.get(&k).is_some());
        }
        cache.insert(32, "v32".to_string()).unwrap();

        assert!(cache.len() < 32);
        assert!(cache.contains_key(&32));
        for k in 0..4 {
            assert_eq!(cache.peek(&k).map(String::as_str), Some(format!("v{k}").as_str()));
        }
        assert!(!cache.contains_key(&4));
    }

    /// Invariant: The cache never holds more than its maximum capacity.
    #[test]
    fn len_stays_bounded() {
        let mut cache: Cache<u64, u64> = Cache::new(50).unwrap();
        for k in 0..1_000 {
            cache.insert(k, k * 2).unwrap();
            assert!(cache.len() <= 50);
        }
        assert_eq!(cache.max_capacity(), 50);
        assert_eq!(cache.get(&999), Some(&1998));
    }

    #[test]
    fn tiny_ceiling_rejected() {
        assert!(matches!(
            Cache::<u8, u8>::new(0),
            Err(ConfigError::ZeroCapacity)
        ));
        assert!(matches!(
            Cache::<u8, u8>::new(2),
            Err(ConfigError::CeilingBelowCapacity)
        ));
    }
}
