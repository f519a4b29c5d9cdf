//! Debug-only structural epoch.
//!
//! A store bumps its epoch on every structural change. A cursor records the
//! epoch it last saw and checks it on each call; a mismatch means the store
//! was mutated behind the cursor and panics in debug builds. In release
//! builds both types are zero-sized and every method is a no-op.

/// Per-store structural change counter.
#[derive(Debug, Default)]
pub(crate) struct DebugEpoch {
    #[cfg(debug_assertions)]
    value: u64,
}

impl DebugEpoch {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            value: 0,
        }
    }

    #[inline]
    pub fn bump(&mut self) {
        #[cfg(debug_assertions)]
        {
            self.value = self.value.wrapping_add(1);
        }
    }

    #[inline]
    pub fn mark(&self) -> EpochMark {
        EpochMark {
            #[cfg(debug_assertions)]
            value: self.value,
        }
    }
}

/// Snapshot held by a cursor.
#[derive(Clone, Copy, Debug)]
pub(crate) struct EpochMark {
    #[cfg(debug_assertions)]
    value: u64,
}

impl EpochMark {
    /// Panics in debug builds if `epoch` moved since this mark was taken.
    #[inline]
    pub fn check(&self, epoch: &DebugEpoch) {
        #[cfg(debug_assertions)]
        assert!(
            self.value == epoch.value,
            "store mutated behind a live cursor"
        );
        #[cfg(not(debug_assertions))]
        let _ = epoch;
    }
}
