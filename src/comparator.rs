//! Key hashing and equality strategies.
//!
//! A store never calls `Hash` or `Eq` on its keys directly; it asks its
//! comparator. Borrowed lookups work when the comparator also implements
//! `KeyComparator<Q>` for the borrowed form, mirroring `K: Borrow<Q>`.

use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

pub trait KeyComparator<K: ?Sized> {
    fn hash(&self, key: &K) -> u32;
    fn eq(&self, a: &K, b: &K) -> bool;
}

#[inline]
fn fold_u64(h: u64) -> u32 {
    (h ^ (h >> 32)) as u32
}

/// Natural identity for integer keys: the hash is the value itself, 64-bit
/// values folded to 32 bits.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntIdentity;

impl KeyComparator<i32> for IntIdentity {
    #[inline]
    fn hash(&self, key: &i32) -> u32 {
        *key as u32
    }
    #[inline]
    fn eq(&self, a: &i32, b: &i32) -> bool {
        a == b
    }
}

impl KeyComparator<i64> for IntIdentity {
    #[inline]
    fn hash(&self, key: &i64) -> u32 {
        fold_u64(*key as u64)
    }
    #[inline]
    fn eq(&self, a: &i64, b: &i64) -> bool {
        a == b
    }
}

/// `Hash + Eq` through a `BuildHasher`, for arbitrary object keys.
#[derive(Clone, Debug, Default)]
pub struct HashEq<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> HashEq<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<Q, S> KeyComparator<Q> for HashEq<S>
where
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &Q) -> u32 {
        fold_u64(self.hasher.hash_one(key))
    }
    #[inline]
    fn eq(&self, a: &Q, b: &Q) -> bool {
        a == b
    }
}

/// Identifies objects by a 64-bit field, e.g. a row id, ignoring the rest of
/// the object.
#[derive(Clone, Copy)]
pub struct ByLongKey<F> {
    extract: F,
}

impl<F> ByLongKey<F> {
    pub fn new(extract: F) -> Self {
        Self { extract }
    }
}

impl<F> core::fmt::Debug for ByLongKey<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ByLongKey")
    }
}

impl<K, F> KeyComparator<K> for ByLongKey<F>
where
    F: Fn(&K) -> i64,
{
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        fold_u64((self.extract)(key) as u64)
    }
    #[inline]
    fn eq(&self, a: &K, b: &K) -> bool {
        (self.extract)(a) == (self.extract)(b)
    }
}

/// ASCII case-insensitive names.
#[derive(Clone, Copy, Debug, Default)]
pub struct CaseInsensitive;

impl KeyComparator<str> for CaseInsensitive {
    fn hash(&self, key: &str) -> u32 {
        key.bytes().fold(0u32, |h, b| {
            h.wrapping_mul(31).wrapping_add(u32::from(b.to_ascii_lowercase()))
        })
    }
    fn eq(&self, a: &str, b: &str) -> bool {
        a.eq_ignore_ascii_case(b)
    }
}

impl KeyComparator<String> for CaseInsensitive {
    fn hash(&self, key: &String) -> u32 {
        <Self as KeyComparator<str>>::hash(self, key)
    }
    fn eq(&self, a: &String, b: &String) -> bool {
        a.eq_ignore_ascii_case(b)
    }
}
