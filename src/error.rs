/// Failure of an insert path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The capacity ceiling is reached and the purge policy forbids eviction.
    Exhausted,

    /// A second live entry for the integer key `0` in a multi-value store;
    /// only one zero-keyed slot can be tracked.
    ZeroKeyConflict,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StoreError: {self:?}")
    }
}

impl std::error::Error for StoreError {}

/// Cursor protocol violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterError {
    /// Advanced past the last element.
    Exhausted,

    /// `remove` without a preceding successful advance, or twice in a row.
    NoCurrentElement,

    /// Accessor does not match the cursor's mode or the store's kinds.
    WrongAccessMode,
}

impl std::fmt::Display for IterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IterError: {self:?}")
    }
}

impl std::error::Error for IterError {}

/// Rejected store configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Initial capacity of zero.
    ZeroCapacity,

    /// Capacity ceiling set below the initial capacity.
    CeilingBelowCapacity,

    /// Partial purge needs access stamps to rank entries.
    PurgeWithoutAccessTracking,

    /// Ordered stores keep one entry per key.
    OrderedMultiValue,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConfigError: {self:?}")
    }
}

impl std::error::Error for ConfigError {}

/// Insert result
pub type Result<T> = std::result::Result<T, StoreError>;
