#![cfg(test)]

// Property tests for AssociativeStore kept inside the crate so they can reach
// crate-private constructors and column types directly.

use crate::columns::{IntKeys, IntValues, ObjectKeys};
use crate::comparator::{HashEq, IntIdentity, KeyComparator};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::store::AssociativeStore;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so failing cases shrink toward earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum Op {
    Upsert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Rehash(u8),
    SweepOdd,
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Upsert(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(Op::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => any::<u8>().prop_map(Op::Rehash),
            1 => Just(Op::SweepOdd),
            1 => Just(Op::Clear),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

type ObjStore<C> = AssociativeStore<ObjectKeys<Key>, IntValues, C>;

// Applies `ops` to `sut` and a HashMap model, checking parity after each op.
fn drive<C>(mut sut: ObjStore<C>, pool: &[String], ops: Vec<Op>) -> Result<(), TestCaseError>
where
    C: KeyComparator<Key> + KeyComparator<str>,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            Op::Upsert(i, v) => {
                let k = key_from(pool, i);
                let prev = sut.upsert(k.clone(), v).map_err(|e| {
                    TestCaseError::fail(format!("unbounded store refused insert: {e}"))
                })?;
                prop_assert_eq!(prev, model.insert(k, v));
            }
            Op::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
                prop_assert!(!sut.contains_key(&k));
            }
            Op::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.get(k.0.as_str()), model.get(&k));
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            Op::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.wrapping_add(d);
                }
                if let Some(v) = model.get_mut(&k) {
                    *v = v.wrapping_add(d);
                }
            }
            Op::Rehash(extra) => {
                let order: Vec<Key> = sut.keys().cloned().collect();
                sut.rehash(sut.len() + usize::from(extra));
                prop_assert!(sut.capacity() >= sut.len());
                // Compaction keeps the iteration order.
                let after: Vec<Key> = sut.keys().cloned().collect();
                prop_assert_eq!(order, after);
            }
            Op::SweepOdd => {
                let mut cursor = sut.value_cursor();
                while cursor.has_next(&sut) {
                    let odd = cursor
                        .next_value(&sut)
                        .map(|v| v % 2 != 0)
                        .map_err(|e| TestCaseError::fail(format!("advance failed: {e}")))?;
                    if odd {
                        cursor
                            .remove(&mut sut)
                            .map_err(|e| TestCaseError::fail(format!("remove failed: {e}")))?;
                    }
                }
                model.retain(|_, v| *v % 2 == 0);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
            Op::Iterate => {
                let s: BTreeMap<Key, i32> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m: BTreeMap<Key, i32> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s, m);
                prop_assert_eq!(sut.iter().count(), model.len());
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.len() <= sut.capacity());
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - upsert returns the previous value exactly when the model had one.
// - get/contains_key parity, through both owned and borrowed lookups.
// - Growth from a tiny capacity, explicit rehash and cursor removal keep
//   every live entry reachable; rehash keeps iteration order.
// - iter yields each live entry exactly once; len/is_empty parity after
//   each op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut: ObjStore<HashEq> =
            AssociativeStore::with_config(StoreConfig::new(3), HashEq::default()).unwrap();
        drive(sut, &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_auto_shrink((pool, ops) in arb_scenario()) {
        let sut: ObjStore<HashEq> =
            AssociativeStore::with_config(StoreConfig::new(4).auto_shrink(true), HashEq::default())
                .unwrap();
        drive(sut, &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state-machine invariants as above with every key in one
// bucket chain.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut: ObjStore<HashEq<ConstBuildHasher>> =
            AssociativeStore::with_config(StoreConfig::new(3), HashEq::with_hasher(ConstBuildHasher))
                .unwrap();
        drive(sut, &pool, ops)?;
    }
}

#[derive(Clone, Debug)]
enum IntOp {
    Upsert(i32, i32),
    Remove(i32),
    Get(i32),
    Rehash(u8),
}

// Small key range around zero so the zero-key sentinel is hit often; the
// multiples of 16 share a bucket at the default capacity.
fn arb_int_key() -> impl Strategy<Value = i32> {
    prop_oneof![-4i32..=4, Just(16), Just(-16), Just(32), Just(i32::MIN)]
}

fn arb_int_ops() -> impl Strategy<Value = Vec<IntOp>> {
    let op = prop_oneof![
        3 => (arb_int_key(), any::<i32>()).prop_map(|(k, v)| IntOp::Upsert(k, v)),
        2 => arb_int_key().prop_map(IntOp::Remove),
        2 => arb_int_key().prop_map(IntOp::Get),
        1 => any::<u8>().prop_map(IntOp::Rehash),
    ];
    proptest::collection::vec(op, 1..80)
}

// Property: Integer keys, including 0 and i32::MIN, behave like any other
// key: found, replaced, removed and carried across rehash.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_int_keys_with_zero(ops in arb_int_ops()) {
        let mut sut: AssociativeStore<IntKeys, IntValues, IntIdentity> =
            AssociativeStore::with_config(StoreConfig::new(3), IntIdentity).unwrap();
        let mut model: HashMap<i32, i32> = HashMap::new();
        for op in ops {
            match op {
                IntOp::Upsert(k, v) => {
                    prop_assert_eq!(sut.upsert(k, v), Ok(model.insert(k, v)));
                }
                IntOp::Remove(k) => {
                    prop_assert_eq!(sut.remove(&k), model.remove(&k));
                }
                IntOp::Get(k) => {
                    prop_assert_eq!(sut.get(&k), model.get(&k));
                }
                IntOp::Rehash(extra) => {
                    sut.rehash(sut.len() + usize::from(extra));
                }
            }
            let keys: BTreeSet<i32> = sut.keys().copied().collect();
            let m_keys: BTreeSet<i32> = model.keys().copied().collect();
            prop_assert_eq!(keys, m_keys);
            prop_assert_eq!(sut.len(), model.len());
        }
    }
}

#[derive(Clone, Debug)]
enum MultiOp {
    Add(i32, u8),
    RemoveKey(i32),
    RemoveValue(i32, u8),
    Count(i32),
}

fn arb_multi_ops() -> impl Strategy<Value = Vec<MultiOp>> {
    let key = 0i32..6;
    let value = 0u8..4;
    let op = prop_oneof![
        4 => (key.clone(), value.clone()).prop_map(|(k, v)| MultiOp::Add(k, v)),
        1 => key.clone().prop_map(MultiOp::RemoveKey),
        2 => (key.clone(), value).prop_map(|(k, v)| MultiOp::RemoveValue(k, v)),
        1 => key.prop_map(MultiOp::Count),
    ];
    proptest::collection::vec(op, 1..100)
}

// Property: A multi-value store matches a model of per-key value lists:
// identical pairs collapse, removals take exactly the named value, and key 0
// holds at most one entry. Per-key order is not compared since a rehash
// rechains reused slots in slot order.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_multi_value_model(ops in arb_multi_ops()) {
        let mut sut: AssociativeStore<IntKeys, crate::columns::ObjectValues<u8>, IntIdentity> =
            AssociativeStore::with_config(StoreConfig::new(3).multi_value(true), IntIdentity)
                .unwrap();
        let mut model: BTreeMap<i32, Vec<u8>> = BTreeMap::new();
        for op in ops {
            match op {
                MultiOp::Add(k, v) => {
                    let values = model.entry(k).or_default();
                    let res = sut.upsert_multi(k, v);
                    if values.contains(&v) {
                        prop_assert_eq!(res, Ok(Some(v)));
                    } else if k == 0 && !values.is_empty() {
                        prop_assert_eq!(res, Err(StoreError::ZeroKeyConflict));
                    } else {
                        prop_assert_eq!(res, Ok(None));
                        values.push(v);
                    }
                }
                MultiOp::RemoveKey(k) => {
                    let expected = model.remove(&k).map(|v| v.len()).unwrap_or(0);
                    prop_assert_eq!(sut.remove_by_key(&k), expected);
                }
                MultiOp::RemoveValue(k, v) => {
                    let values = model.entry(k).or_default();
                    let pos = values.iter().position(|&x| x == v);
                    let removed = sut.remove_by_key_value(&k, &v);
                    prop_assert_eq!(removed, pos.map(|p| values.remove(p)));
                }
                MultiOp::Count(k) => {
                    let expected = model.get(&k).map(Vec::len).unwrap_or(0);
                    prop_assert_eq!(sut.value_count(&k), expected);
                }
            }
            model.retain(|_, v| !v.is_empty());
            for (k, values) in &model {
                let mut got: Vec<u8> = sut.values_for(k).copied().collect();
                let mut want = values.clone();
                got.sort_unstable();
                want.sort_unstable();
                prop_assert_eq!(got, want);
            }
            prop_assert_eq!(sut.len(), model.values().map(Vec::len).sum::<usize>());
            prop_assert_eq!(sut.distinct_keys().count(), model.len());
        }
    }
}
