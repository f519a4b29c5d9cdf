use crate::access::AccessOrder;
use crate::error::ConfigError;

/// Smallest slot capacity a store is built with.
pub const MIN_CAPACITY: usize = 3;

/// Capacity used by the `new()` constructors.
pub const DEFAULT_CAPACITY: usize = 16;

/// What an insert does once the capacity ceiling stops further growth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PurgePolicy {
    /// Fail the insert.
    #[default]
    NoPurge,
    /// Drop every entry, then insert.
    PurgeAll,
    /// Evict roughly the least recently touched half, then insert.
    PurgeHalf,
}

/// Store construction parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    initial_capacity: usize,
    max_capacity: usize,
    purge_policy: PurgePolicy,
    access: Option<AccessOrder>,
    auto_shrink: bool,
    multi_value: bool,
    ordered: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StoreConfig {
    /// Starts a configuration with the given initial capacity. Capacities
    /// below [`MIN_CAPACITY`] are raised to it; zero is rejected by
    /// [`StoreConfig::validate`].
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            max_capacity: 0,
            purge_policy: PurgePolicy::NoPurge,
            access: None,
            auto_shrink: false,
            multi_value: false,
            ordered: false,
        }
    }

    /// Sets the capacity ceiling; `0` means unbounded.
    #[must_use]
    pub fn max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    #[must_use]
    pub fn purge_policy(mut self, policy: PurgePolicy) -> Self {
        self.purge_policy = policy;
        self
    }

    /// Enables per-slot access stamps.
    #[must_use]
    pub fn access_tracking(mut self, order: AccessOrder) -> Self {
        self.access = Some(order);
        self
    }

    /// If `true`, a store that becomes empty returns to its initial capacity.
    #[must_use]
    pub fn auto_shrink(mut self, b: bool) -> Self {
        self.auto_shrink = b;
        self
    }

    /// Permits several entries per key.
    #[must_use]
    pub fn multi_value(mut self, b: bool) -> Self {
        self.multi_value = b;
        self
    }

    /// Keeps live entries packed in insertion order; every removal closes
    /// its gap.
    #[must_use]
    pub fn ordered(mut self, b: bool) -> Self {
        self.ordered = b;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.max_capacity != 0 && self.max_capacity < self.effective_capacity() {
            return Err(ConfigError::CeilingBelowCapacity);
        }
        if self.purge_policy == PurgePolicy::PurgeHalf && self.access.is_none() {
            return Err(ConfigError::PurgeWithoutAccessTracking);
        }
        if self.ordered && self.multi_value {
            return Err(ConfigError::OrderedMultiValue);
        }
        Ok(())
    }

    /// Initial capacity after the minimum is applied.
    pub fn effective_capacity(&self) -> usize {
        self.initial_capacity.max(MIN_CAPACITY)
    }

    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    pub fn ceiling(&self) -> usize {
        self.max_capacity
    }

    pub fn policy(&self) -> PurgePolicy {
        self.purge_policy
    }

    pub fn access_order(&self) -> Option<AccessOrder> {
        self.access
    }

    pub fn shrinks_when_empty(&self) -> bool {
        self.auto_shrink
    }

    pub fn is_multi_value(&self) -> bool {
        self.multi_value
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_capacity_is_raised() {
        assert_eq!(StoreConfig::new(1).effective_capacity(), MIN_CAPACITY);
        assert_eq!(StoreConfig::new(40).effective_capacity(), 40);
        assert!(StoreConfig::new(1).validate().is_ok());
    }

    /// Invariant: Each inconsistent combination maps to its own error.
    #[test]
    fn validate_rejects_inconsistent_settings() {
        assert_eq!(
            StoreConfig::new(0).validate(),
            Err(ConfigError::ZeroCapacity)
        );
        assert_eq!(
            StoreConfig::new(8).max_capacity(4).validate(),
            Err(ConfigError::CeilingBelowCapacity)
        );
        assert_eq!(
            StoreConfig::new(8)
                .max_capacity(8)
                .purge_policy(PurgePolicy::PurgeHalf)
                .validate(),
            Err(ConfigError::PurgeWithoutAccessTracking)
        );
        assert_eq!(
            StoreConfig::new(8).ordered(true).multi_value(true).validate(),
            Err(ConfigError::OrderedMultiValue)
        );
        assert!(StoreConfig::new(8)
            .max_capacity(64)
            .purge_policy(PurgePolicy::PurgeHalf)
            .access_tracking(AccessOrder::Recency)
            .validate()
            .is_ok());
    }
}
