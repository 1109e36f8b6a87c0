//! Error types for the `bucketmap` crate

/// Errors returned when constructing a [`Store`](crate::Store).
///
/// Absence of a key is never an error; lookups report it through `Option`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A `FixedModulo` strategy was configured with zero buckets.
    #[error("fixed modulo strategy requires at least one bucket")]
    ZeroBucketCount,

    /// A `DynamicFanOut` strategy was configured with a zero capacity threshold.
    ///
    /// No bucket could ever accept a key, so every insertion would allocate a
    /// bucket that stays empty.
    #[error("dynamic fan-out strategy requires a bucket capacity of at least one")]
    ZeroCapacity,
}
