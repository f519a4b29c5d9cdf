// End-to-end behavior of the typed wrappers and the store through the public
// API.
//
// Core invariants exercised:
// - Growth: a new key at `len == capacity` grows the store; every key stays
//   reachable across growth.
// - Exhaustion: NoPurge at the ceiling fails the insert (PairMap stays
//   silent), PurgeAll starts over with only the new key.
// - Zero key: integer key 0 behaves like any other key.
// - Cursor protocol: exhaustion, removal without a current element, and
//   accessor/mode mismatches each report their own IterError.
use slot_hashmap::columns::{IntKeys, ObjectKeys, ObjectValues};
use slot_hashmap::comparator::{HashEq, IntIdentity};
use slot_hashmap::{
    AccessOrder, AssociativeStore, IntKeyMap, IntSet, IterError, Map, ObjectMap,
    ObjectMultiMap, ObjectPairMap, PairMap, PurgePolicy, StoreConfig, StoreError,
};
use test_log::test;

// Test: the capacity-four walkthrough.
// Assumes: capacity 4, unbounded ceiling.
// Verifies: lookups after removal, no growth below the threshold, growth on
// the insert that meets it.
#[test]
fn capacity_four_walkthrough() {
    let mut m: IntKeyMap<&str> = Map::with_config(StoreConfig::new(4), IntIdentity).unwrap();
    for (k, v) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
        assert_eq!(m.insert(k, v), Ok(None));
    }
    assert_eq!(m.get(&3), Some(&"c"));
    assert_eq!(m.remove(&2), Some("b"));
    assert_eq!(m.get(&2), None);
    assert_eq!(m.len(), 3);

    m.insert(5, "e").unwrap();
    assert_eq!(m.capacity(), 4);
    m.insert(6, "f").unwrap();
    assert_eq!(m.capacity(), 8);
    for (k, v) in [(1, "a"), (3, "c"), (4, "d"), (5, "e"), (6, "f")] {
        assert_eq!(m.get(&k), Some(&v));
    }
}

// Test: multi-value dedupe.
// Verifies: (x,1) twice plus (x,2) stores two values for x.
#[test]
fn multi_value_dedupe() {
    let mut m: ObjectMultiMap<&str, i32> = ObjectMultiMap::new();
    m.insert("x", 1).unwrap();
    m.insert("x", 1).unwrap();
    m.insert("x", 2).unwrap();
    assert_eq!(m.value_count(&"x"), 2);
    let mut values: Vec<i32> = m.get_all(&"x").copied().collect();
    values.sort_unstable();
    assert_eq!(values, vec![1, 2]);
}

// Test: integer key 0 next to colliding keys.
// Verifies: 0 is found, replaced and removed without disturbing keys that
// share its bucket.
#[test]
fn zero_key_round_trip() {
    let mut m: IntKeyMap<u8> = Map::with_config(StoreConfig::new(8), IntIdentity).unwrap();
    m.insert(8, 1).unwrap();
    m.insert(0, 2).unwrap();
    m.insert(16, 3).unwrap();
    assert_eq!(m.get(&0), Some(&2));
    assert_eq!(m.insert(0, 4), Ok(Some(2)));
    assert_eq!(m.iter().count(), 3);
    assert_eq!(m.remove(&0), Some(4));
    assert_eq!(m.get(&8), Some(&1));
    assert_eq!(m.get(&16), Some(&3));
    assert!(!m.contains_key(&0));

    let mut s = IntSet::new();
    assert_eq!(s.insert(0), Ok(true));
    assert!(s.contains(&0));
    assert_eq!(s.len(), 1);
}

// Test: exhaustion at the ceiling.
// Verifies: NoPurge fails without side effects, PurgeAll clears then inserts.
#[test]
fn ceiling_policies() {
    let base = StoreConfig::new(3).max_capacity(3);
    let mut strict: ObjectMap<String, u8> =
        Map::with_config(base.clone(), HashEq::default()).unwrap();
    for k in ["a", "b", "c"] {
        strict.insert(k.to_string(), 0).unwrap();
    }
    assert_eq!(strict.insert("d".to_string(), 0), Err(StoreError::Exhausted));
    assert_eq!(strict.len(), 3);
    assert!(!strict.contains_key("d"));

    let mut purging: ObjectMap<String, u8> = Map::with_config(
        base.purge_policy(PurgePolicy::PurgeAll),
        HashEq::default(),
    )
    .unwrap();
    for k in ["a", "b", "c"] {
        purging.insert(k.to_string(), 0).unwrap();
    }
    assert_eq!(purging.insert("d".to_string(), 1), Ok(None));
    assert_eq!(purging.len(), 1);
    assert_eq!(purging.get("d"), Some(&1));
}

// Test: growth well past the initial capacity.
#[test]
fn growth_keeps_every_key() {
    let mut m: ObjectMap<u64, u64> = Map::with_config(StoreConfig::new(3), HashEq::default())
        .unwrap();
    for k in 0..5_000u64 {
        m.insert(k, k * 3).unwrap();
    }
    assert_eq!(m.len(), 5_000);
    assert!(m.capacity() >= 5_000);
    for k in 0..5_000u64 {
        assert_eq!(m.get(&k), Some(&(k * 3)));
    }
}

// Test: cursor error protocol.
#[test]
fn cursor_error_protocol() {
    let mut m: ObjectMap<&str, i32> = ObjectMap::new();
    m.insert("one", 1).unwrap();

    let mut keys = m.key_cursor();
    assert_eq!(keys.remove(m.store_mut()), Err(IterError::NoCurrentElement));
    assert_eq!(keys.next_value(m.store()), Err(IterError::WrongAccessMode));
    assert_eq!(keys.next_key(m.store()), Ok(&"one"));
    assert!(!keys.has_next(m.store()));
    assert_eq!(keys.next_key(m.store()), Err(IterError::Exhausted));
    keys.remove(m.store_mut()).unwrap();
    assert_eq!(keys.remove(m.store_mut()), Err(IterError::NoCurrentElement));
    assert!(m.is_empty());

    m.insert("two", 2).unwrap();
    let mut values = m.value_cursor();
    assert_eq!(values.access_count(m.store()), Err(IterError::NoCurrentElement));
    assert_eq!(values.next_value(m.store()), Ok(&2));
    assert_eq!(values.access_count(m.store()), Err(IterError::WrongAccessMode));
}

// Test: pair insertion at the ceiling is dropped without an error.
#[test]
fn pair_map_drops_silently() {
    let mut m: ObjectPairMap<u32, &str, u32> =
        PairMap::with_config(StoreConfig::new(3).max_capacity(3), HashEq::default()).unwrap();
    for k in 0..3 {
        assert_eq!(m.insert(k, "x", k), None);
    }
    assert_eq!(m.insert(7, "y", 7), None);
    assert_eq!(m.len(), 3);
    assert_eq!(m.first(&7), None);
    assert_eq!(m.iter().count(), 3);
}

// Test: access stamps through the raw store.
// Verifies: gets refresh recency; peeks do not.
#[test]
fn recency_stamps() {
    let mut s: AssociativeStore<IntKeys, ObjectValues<()>, IntIdentity> =
        AssociativeStore::with_config(
            StoreConfig::new(8).access_tracking(AccessOrder::Recency),
            IntIdentity,
        )
        .unwrap();
    s.upsert(1, ()).unwrap();
    s.upsert(2, ()).unwrap();
    let before = s.access_stamp(&1).unwrap();
    assert!(before < s.access_stamp(&2).unwrap());
    s.peek(&1);
    assert_eq!(s.access_stamp(&1), Some(before));
    s.get(&1);
    assert!(s.access_stamp(&1).unwrap() > s.access_stamp(&2).unwrap());
}

// Test: object keys under a custom identity.
#[test]
fn keyed_by_row_id() {
    #[derive(Debug)]
    struct Row {
        id: i64,
        name: &'static str,
    }
    let by_id = slot_hashmap::comparator::ByLongKey::new(|r: &Row| r.id);
    let mut s: AssociativeStore<ObjectKeys<Row>, ObjectValues<u8>, _> =
        AssociativeStore::with_config(StoreConfig::new(4), by_id).unwrap();
    s.upsert(Row { id: 7, name: "a" }, 1).unwrap();
    let prev = s.upsert(Row { id: 7, name: "b" }, 2).unwrap();
    assert_eq!(prev, Some(1));
    assert_eq!(s.len(), 1);
    assert_eq!(s.keys().next().map(|r| r.name), Some("a"));
}
