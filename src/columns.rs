//! Flat key and value columns addressed by slot.
//!
//! A store holds exactly one key column and one value column, chosen through
//! its type parameters. Integer key columns cannot tell a stored `0` from an
//! empty cell; the store tracks that one slot itself.

use core::mem;

/// Representation of a value column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    None,
    Int,
    Long,
    Object,
    Pair,
}

pub trait KeyColumn {
    type Key;

    fn with_len(len: usize) -> Self;

    /// True when the cell holds a key other than the empty marker.
    fn is_occupied(&self, slot: usize) -> bool;

    /// True for keys indistinguishable from an empty cell.
    fn is_zero(key: &Self::Key) -> bool;

    fn get(&self, slot: usize) -> Option<&Self::Key>;
    fn put(&mut self, slot: usize, key: Self::Key);
    fn take(&mut self, slot: usize) -> Option<Self::Key>;

    /// Swaps two cells; compaction moves a live cell into an empty one.
    fn swap(&mut self, a: usize, b: usize);

    /// Rotates the empty cell at `slot` to `high_water - 1`.
    fn close_gap(&mut self, slot: usize, high_water: usize);

    /// Grows or truncates. Truncated cells must be empty.
    fn resize(&mut self, len: usize);

    fn clear(&mut self);
}

pub trait ValueColumn {
    type Value;
    const KIND: ValueKind;

    fn with_len(len: usize) -> Self;
    fn get(&self, slot: usize) -> Option<&Self::Value>;
    fn get_mut(&mut self, slot: usize) -> Option<&mut Self::Value>;
    fn put(&mut self, slot: usize, value: Self::Value);
    fn take(&mut self, slot: usize) -> Option<Self::Value>;

    fn replace(&mut self, slot: usize, value: Self::Value) -> Option<Self::Value> {
        let old = self.take(slot);
        self.put(slot, value);
        old
    }

    fn swap(&mut self, a: usize, b: usize);
    fn close_gap(&mut self, slot: usize, high_water: usize);
    fn resize(&mut self, len: usize);
    fn clear(&mut self);
}

macro_rules! integer_key_column {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Default)]
        pub struct $name(Vec<$ty>);

        impl KeyColumn for $name {
            type Key = $ty;

            fn with_len(len: usize) -> Self {
                Self(vec![0; len])
            }
            #[inline]
            fn is_occupied(&self, slot: usize) -> bool {
                self.0[slot] != 0
            }
            #[inline]
            fn is_zero(key: &$ty) -> bool {
                *key == 0
            }
            #[inline]
            fn get(&self, slot: usize) -> Option<&$ty> {
                self.0.get(slot)
            }
            fn put(&mut self, slot: usize, key: $ty) {
                self.0[slot] = key;
            }
            fn take(&mut self, slot: usize) -> Option<$ty> {
                Some(mem::take(&mut self.0[slot]))
            }
            fn swap(&mut self, a: usize, b: usize) {
                self.0.swap(a, b);
            }
            fn close_gap(&mut self, slot: usize, high_water: usize) {
                self.0[slot..high_water].rotate_left(1);
            }
            fn resize(&mut self, len: usize) {
                self.0.resize(len, 0);
            }
            fn clear(&mut self) {
                self.0.fill(0);
            }
        }
    };
}

integer_key_column!(
    /// 32-bit integer keys.
    IntKeys,
    i32
);
integer_key_column!(
    /// 64-bit integer keys.
    LongKeys,
    i64
);

/// Arbitrary owned keys.
#[derive(Clone, Debug)]
pub struct ObjectKeys<K>(Vec<Option<K>>);

impl<K> KeyColumn for ObjectKeys<K> {
    type Key = K;

    fn with_len(len: usize) -> Self {
        Self(core::iter::repeat_with(|| None).take(len).collect())
    }
    #[inline]
    fn is_occupied(&self, slot: usize) -> bool {
        self.0[slot].is_some()
    }
    #[inline]
    fn is_zero(_key: &K) -> bool {
        false
    }
    #[inline]
    fn get(&self, slot: usize) -> Option<&K> {
        self.0.get(slot).and_then(Option::as_ref)
    }
    fn put(&mut self, slot: usize, key: K) {
        self.0[slot] = Some(key);
    }
    fn take(&mut self, slot: usize) -> Option<K> {
        self.0[slot].take()
    }
    fn swap(&mut self, a: usize, b: usize) {
        self.0.swap(a, b);
    }
    fn close_gap(&mut self, slot: usize, high_water: usize) {
        self.0[slot..high_water].rotate_left(1);
    }
    fn resize(&mut self, len: usize) {
        self.0.resize_with(len, || None);
    }
    fn clear(&mut self) {
        self.0.iter_mut().for_each(|k| *k = None);
    }
}

/// Set semantics: no value is stored, every live slot reads as `()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoValues {
    unit: (),
}

impl ValueColumn for NoValues {
    type Value = ();
    const KIND: ValueKind = ValueKind::None;

    fn with_len(_len: usize) -> Self {
        Self::default()
    }
    fn get(&self, _slot: usize) -> Option<&()> {
        Some(&self.unit)
    }
    fn get_mut(&mut self, _slot: usize) -> Option<&mut ()> {
        Some(&mut self.unit)
    }
    fn put(&mut self, _slot: usize, _value: ()) {}
    fn take(&mut self, _slot: usize) -> Option<()> {
        Some(())
    }
    fn swap(&mut self, _a: usize, _b: usize) {}
    fn close_gap(&mut self, _slot: usize, _high_water: usize) {}
    fn resize(&mut self, _len: usize) {}
    fn clear(&mut self) {}
}

macro_rules! integer_value_column {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $kind:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Default)]
        pub struct $name(Vec<$ty>);

        impl ValueColumn for $name {
            type Value = $ty;
            const KIND: ValueKind = $kind;

            fn with_len(len: usize) -> Self {
                Self(vec![0; len])
            }
            #[inline]
            fn get(&self, slot: usize) -> Option<&$ty> {
                self.0.get(slot)
            }
            #[inline]
            fn get_mut(&mut self, slot: usize) -> Option<&mut $ty> {
                self.0.get_mut(slot)
            }
            fn put(&mut self, slot: usize, value: $ty) {
                self.0[slot] = value;
            }
            fn take(&mut self, slot: usize) -> Option<$ty> {
                Some(mem::take(&mut self.0[slot]))
            }
            fn swap(&mut self, a: usize, b: usize) {
                self.0.swap(a, b);
            }
            fn close_gap(&mut self, slot: usize, high_water: usize) {
                self.0[slot..high_water].rotate_left(1);
            }
            fn resize(&mut self, len: usize) {
                self.0.resize(len, 0);
            }
            fn clear(&mut self) {
                self.0.fill(0);
            }
        }
    };
}

integer_value_column!(
    /// 32-bit integer values.
    IntValues,
    i32,
    ValueKind::Int
);
integer_value_column!(
    /// 64-bit integer values.
    LongValues,
    i64,
    ValueKind::Long
);

/// Cells of `Option<T>`, shared by the object and pair value columns.
#[derive(Clone, Debug)]
struct Cells<T>(Vec<Option<T>>);

impl<T> Cells<T> {
    fn with_len(len: usize) -> Self {
        Self(core::iter::repeat_with(|| None).take(len).collect())
    }
    fn get(&self, slot: usize) -> Option<&T> {
        self.0.get(slot).and_then(Option::as_ref)
    }
    fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.0.get_mut(slot).and_then(Option::as_mut)
    }
    fn put(&mut self, slot: usize, value: T) {
        self.0[slot] = Some(value);
    }
    fn take(&mut self, slot: usize) -> Option<T> {
        self.0[slot].take()
    }
    fn swap(&mut self, a: usize, b: usize) {
        self.0.swap(a, b);
    }
    fn close_gap(&mut self, slot: usize, high_water: usize) {
        self.0[slot..high_water].rotate_left(1);
    }
    fn resize(&mut self, len: usize) {
        self.0.resize_with(len, || None);
    }
    fn clear(&mut self) {
        self.0.iter_mut().for_each(|v| *v = None);
    }
}

macro_rules! forward_to_cells {
    () => {
        fn get(&self, slot: usize) -> Option<&Self::Value> {
            self.0.get(slot)
        }
        fn get_mut(&mut self, slot: usize) -> Option<&mut Self::Value> {
            self.0.get_mut(slot)
        }
        fn put(&mut self, slot: usize, value: Self::Value) {
            self.0.put(slot, value)
        }
        fn take(&mut self, slot: usize) -> Option<Self::Value> {
            self.0.take(slot)
        }
        fn swap(&mut self, a: usize, b: usize) {
            self.0.swap(a, b)
        }
        fn close_gap(&mut self, slot: usize, high_water: usize) {
            self.0.close_gap(slot, high_water)
        }
        fn resize(&mut self, len: usize) {
            self.0.resize(len)
        }
        fn clear(&mut self) {
            self.0.clear()
        }
    };
}

/// Arbitrary owned values. A store that needs unset values uses
/// `ObjectValues<Option<V>>`.
#[derive(Clone, Debug)]
pub struct ObjectValues<V>(Cells<V>);

impl<V> ValueColumn for ObjectValues<V> {
    type Value = V;
    const KIND: ValueKind = ValueKind::Object;

    fn with_len(len: usize) -> Self {
        Self(Cells::with_len(len))
    }
    forward_to_cells!();
}

/// Two associated objects per slot.
#[derive(Clone, Debug)]
pub struct PairValues<V, W>(Cells<(V, W)>);

impl<V, W> ValueColumn for PairValues<V, W> {
    type Value = (V, W);
    const KIND: ValueKind = ValueKind::Pair;

    fn with_len(len: usize) -> Self {
        Self(Cells::with_len(len))
    }
    forward_to_cells!();
}
