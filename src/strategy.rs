use crate::search::{self, Location};
use crate::{Bucket, Error};
use foldhash::fast::FixedState;
use std::hash::BuildHasher;
use std::sync::Arc;

/// Default bucket count of [`Strategy::FixedModulo`].
pub const DEFAULT_BUCKET_COUNT: usize = 10;

/// Default per-bucket capacity of [`Strategy::DynamicFanOut`].
pub const DEFAULT_CAPACITY: usize = 1;

/// Decides which bucket of a [`Store`](crate::Store) a key belongs to.
///
/// The strategy is chosen when the store is created and held for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One bucket for the whole store. Every operation is a linear scan.
    SingleLinear,
    /// `bucket_hash(key) % n` over `n` buckets allocated up front.
    FixedModulo(usize),
    /// Buckets are filled in order up to the given capacity and allocated on
    /// demand. Lookups search every bucket concurrently.
    DynamicFanOut(usize),
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::DynamicFanOut(DEFAULT_CAPACITY)
    }
}

impl Strategy {
    /// `FixedModulo` with [`DEFAULT_BUCKET_COUNT`] buckets.
    pub fn fixed_modulo() -> Self {
        Strategy::FixedModulo(DEFAULT_BUCKET_COUNT)
    }

    pub(crate) fn validate(self) -> Result<Self, Error> {
        match self {
            Strategy::FixedModulo(0) => Err(Error::ZeroBucketCount),
            Strategy::DynamicFanOut(0) => Err(Error::ZeroCapacity),
            _ => Ok(self),
        }
    }

    /// Number of buckets a new store starts with.
    pub(crate) fn initial_buckets(&self) -> usize {
        match *self {
            Strategy::SingleLinear => 1,
            Strategy::FixedModulo(n) => n,
            Strategy::DynamicFanOut(_) => 0,
        }
    }

    /// Whether a bucket emptied by a removal is dropped from the store.
    pub(crate) fn reclaims_empty(&self) -> bool {
        matches!(self, Strategy::DynamicFanOut(_))
    }

    /// Finds the bucket and index holding `key`.
    pub(crate) fn locate<K, V>(&self, buckets: &[Arc<Bucket<K, V>>], key: &K) -> Option<Location>
    where
        K: BucketHash + Eq + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let bucket = match *self {
            Strategy::SingleLinear => 0,
            Strategy::FixedModulo(n) => home(key, n),
            Strategy::DynamicFanOut(_) => return search::fan_out(buckets, key),
        };
        buckets[bucket]
            .find(key)
            .map(|index| Location { bucket, index })
    }

    /// Picks the bucket a key absent from the store should be appended to,
    /// allocating one if needed.
    pub(crate) fn place<K, V>(&self, buckets: &mut Vec<Arc<Bucket<K, V>>>, key: &K) -> usize
    where
        K: BucketHash + Eq,
    {
        match *self {
            Strategy::SingleLinear => 0,
            Strategy::FixedModulo(n) => home(key, n),
            Strategy::DynamicFanOut(capacity) => buckets
                .iter()
                .position(|b| b.len() < capacity)
                .unwrap_or_else(|| {
                    buckets.push(Arc::default());
                    tracing::debug!(buckets = buckets.len(), "allocated bucket");
                    buckets.len() - 1
                }),
        }
    }
}

#[inline(always)]
fn home<K: BucketHash + ?Sized>(key: &K, n: usize) -> usize {
    (key.bucket_hash() % n as u64) as usize
}

/// Integer reduction of a key, used by [`Strategy::FixedModulo`].
///
/// Integers reduce to themselves, so for non-negative keys the bucket is
/// simply `key % n`. Other types hash with a fixed seed, so the reduction is
/// stable across stores and runs.
pub trait BucketHash {
    fn bucket_hash(&self) -> u64;
}

macro_rules! impl_bucket_hash_integer {
    ($($t:ty),*) => {
        $(
            impl BucketHash for $t {
                #[inline]
                fn bucket_hash(&self) -> u64 {
                    *self as u64
                }
            }
        )*
    };
}

impl_bucket_hash_integer!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

macro_rules! impl_bucket_hash_hashed {
    ($($t:ty),*) => {
        $(
            impl BucketHash for $t {
                #[inline]
                fn bucket_hash(&self) -> u64 {
                    FixedState::default().hash_one(self)
                }
            }
        )*
    };
}

impl_bucket_hash_hashed!(str, String, [u8], Vec<u8>, char, bool);

impl<T: BucketHash + ?Sized> BucketHash for &T {
    fn bucket_hash(&self) -> u64 {
        (**self).bucket_hash()
    }
}

impl<T: BucketHash + ?Sized> BucketHash for Box<T> {
    fn bucket_hash(&self) -> u64 {
        (**self).bucket_hash()
    }
}

impl<T: BucketHash + ?Sized> BucketHash for Arc<T> {
    fn bucket_hash(&self) -> u64 {
        (**self).bucket_hash()
    }
}
