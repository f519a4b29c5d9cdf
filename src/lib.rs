//! slot-hashmap: chained hash tables over flat, parallel columns with
//! integer slot links instead of per-entry nodes.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one generic engine that serves maps, sets, multi-maps and
//!   bounded caches for integer and object keys, without allocating per
//!   entry and without boxing integers.
//! - Layers:
//!   - SlotIndex: bucket heads plus one `next` link per slot, a free list
//!     of reclaimed slots and a high-water mark. Knows nothing about keys.
//!   - Columns (`KeyColumn`, `ValueColumn`): one flat vector per concern,
//!     indexed by slot. Integer columns store raw values and read `0` as an
//!     empty cell; object columns store `Option`s.
//!   - AccessTable: optional per-slot stamps that approximate recency or
//!     frequency, and rank entries for partial eviction.
//!   - AssociativeStore<KC, VC, C>: the table itself. Probing, insert,
//!     removal, growth, purge, rehash with compaction, multi-value runs.
//!   - Cursor: explicit `has_next`/`next_*`/`remove` protocol that takes
//!     the store per call, so removal can borrow it mutably between
//!     advances.
//!   - Wrappers (`Map`, `Set`, `MultiMap`, `PairMap`, `Cache`,
//!     `OrderedSet`): thin typed facades fixing a column pair and a
//!     configuration.
//!
//! Constraints
//! - No per-entry heap allocation beyond the columns themselves.
//! - O(1) average lookups; chains are walked by slot index.
//! - Capacity equals the growth threshold: a new key arriving at `len ==
//!   capacity` first grows the store (doubling, capped by the ceiling), or
//!   once the ceiling is reached applies the purge policy.
//! - The store is not internally synchronized. Lookups through `&self` may
//!   bump access stamps, which are atomics, so a shared store stays `Sync`.
//!
//! Zero-key sentinel
//! - Integer columns cannot tell key `0` from an empty cell. The store
//!   tracks the one slot holding key `0` and treats it as live. In a
//!   multi-value store a second value for key `0` is rejected with
//!   `StoreError::ZeroKeyConflict`.
//!
//! Multi-value runs
//! - All entries for one key sit next to each other in their bucket chain.
//!   A per-slot flag marks every entry after the first, so distinct-key
//!   iteration and whole-run removal never compare keys.
//!
//! Access tracking and purge
//! - Stamps come from a per-store counter. Once the counter nears
//!   `ACCESS_MAX` every stamp is compressed to a quarter, keeping relative
//!   order.
//! - `PurgeHalf` picks a stamp ceiling with a narrowing histogram so that
//!   about half the entries fall below it, evicts those, and raises the
//!   floor to the ceiling. If too many entries survive it clears instead.
//!
//! Rehash and compaction
//! - `rehash` relinks every live slot in ascending order, which packs the
//!   live entries into `[0, len)` while keeping iteration order. Access
//!   stamps and run flags move with their entries.
//! - Ordered stores close every gap on removal, so slot number equals
//!   position and `get_index`/`index_of` are O(1).
//!
//! Cursor safety
//! - Every structural change bumps a debug-only epoch. A cursor used after
//!   a change it did not make itself panics in debug builds. In release
//!   builds the check compiles away and a stale cursor yields unspecified,
//!   but memory-safe, results.
//!
//! Notes and non-goals
//! - No concurrent mutation; wrap the store in a lock to share writers.
//! - No persistence or serialization.
//! - Keys are immutable post-insert.

mod access;
mod cache;
pub mod columns;
pub mod comparator;
mod config;
mod cursor;
mod epoch;
mod error;
mod maps;
mod multi_map;
mod sets;
pub mod slot_index;
mod store;
mod store_proptest;

// Public surface
pub use access::{AccessOrder, ACCESS_MAX};
pub use cache::Cache;
pub use config::{PurgePolicy, StoreConfig, DEFAULT_CAPACITY, MIN_CAPACITY};
pub use cursor::{Cursor, CursorMode};
pub use error::{ConfigError, IterError, Result, StoreError};
pub use maps::{
    IntKeyIntValueMap, IntKeyLongValueMap, IntKeyMap, LongKeyIntValueMap, LongKeyLongValueMap,
    LongKeyMap, Map, ObjectMap, ObjectPairMap, PairMap,
};
pub use multi_map::{IntKeyMultiMap, MultiMap, ObjectMultiMap};
pub use sets::{IntSet, LongSet, ObjectSet, OrderedSet, Set};
pub use store::{AssociativeStore, Iter, ValuesFor};
