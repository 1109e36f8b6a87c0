use crate::search::Location;
use crate::{Bucket, BucketHash, Error, Lock, Strategy};
use std::sync::Arc;

/// An in-memory key-value store partitioned into buckets.
///
/// All mutation is serialized behind a single store-wide lock. Buckets are
/// shared copy-on-write, so a fan-out lookup keeps reading the bucket
/// contents it snapshotted while a concurrent `set` or `remove` works on
/// its own copy.
pub struct Store<K, V> {
    buckets: Lock<Vec<Arc<Bucket<K, V>>>>,
    strategy: Strategy,
}

impl<K, V> Default for Store<K, V> {
    fn default() -> Self {
        // The default strategy starts with no buckets.
        Self {
            buckets: Lock::default(),
            strategy: Strategy::default(),
        }
    }
}

impl<K, V> Store<K, V>
where
    K: BucketHash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty store using `strategy`.
    ///
    /// # Errors
    ///
    /// * [`Error::ZeroBucketCount`] for `FixedModulo(0)`
    /// * [`Error::ZeroCapacity`] for `DynamicFanOut(0)`
    ///
    /// # Examples
    /// ```
    /// use bucketmap::{Error, Store, Strategy};
    ///
    /// let store = Store::<u32, String>::new(Strategy::FixedModulo(16)).unwrap();
    /// assert_eq!(store.bucket_count(), 16);
    ///
    /// assert!(matches!(
    ///     Store::<u32, String>::new(Strategy::FixedModulo(0)),
    ///     Err(Error::ZeroBucketCount)
    /// ));
    /// ```
    pub fn new(strategy: Strategy) -> Result<Self, Error> {
        let strategy = strategy.validate()?;
        let buckets = (0..strategy.initial_buckets())
            .map(|_| Arc::default())
            .collect::<Vec<_>>();
        tracing::debug!(?strategy, buckets = buckets.len(), "created store");
        Ok(Self {
            buckets: Lock::new(buckets),
            strategy,
        })
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Gets a clone of the value associated with `key`.
    ///
    /// Under `DynamicFanOut` the lock is only held long enough to snapshot the
    /// bucket list; the search itself runs unlocked. The other strategies look
    /// the key up while holding the lock.
    ///
    /// # Examples
    /// ```
    /// use bucketmap::{Store, Strategy};
    ///
    /// let store = Store::new(Strategy::DynamicFanOut(4)).unwrap();
    /// store.set("key", 42);
    /// assert_eq!(store.get(&"key"), Some(42));
    /// assert_eq!(store.get(&"missing"), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<V> {
        match self.strategy {
            Strategy::DynamicFanOut(_) => {
                let snapshot = self.snapshot();
                let Location { bucket, index } = self.strategy.locate(&snapshot, key)?;
                Some(snapshot[bucket].value(index).clone())
            }
            Strategy::SingleLinear | Strategy::FixedModulo(_) => {
                let buckets = self.buckets.lock();
                let Location { bucket, index } = self.strategy.locate(&buckets[..], key)?;
                Some(buckets[bucket].value(index).clone())
            }
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        match self.strategy {
            Strategy::DynamicFanOut(_) => self.strategy.locate(&self.snapshot(), key).is_some(),
            Strategy::SingleLinear | Strategy::FixedModulo(_) => {
                self.strategy.locate(&self.buckets.lock()[..], key).is_some()
            }
        }
    }

    /// Sets the value of `key`, overwriting the existing value in place.
    ///
    /// Returns `true` if the key was already present.
    ///
    /// # Examples
    /// ```
    /// use bucketmap::{Store, Strategy};
    ///
    /// let store = Store::new(Strategy::SingleLinear).unwrap();
    /// assert!(!store.set(1, "a"));
    /// assert!(store.set(1, "b"));
    /// assert_eq!(store.get(&1), Some("b"));
    /// assert_eq!(store.len(), 1);
    /// ```
    pub fn set(&self, key: K, value: V) -> bool {
        let mut buckets = self.buckets.lock();
        if let Some(Location { bucket, index }) = self.strategy.locate(&buckets[..], &key) {
            Arc::make_mut(&mut buckets[bucket]).overwrite(index, value);
            return true;
        }
        let bucket = self.strategy.place(&mut *buckets, &key);
        Arc::make_mut(&mut buckets[bucket]).append(key, value);
        false
    }

    /// Removes `key` from the store, returning its value if it was present.
    ///
    /// Under `DynamicFanOut` a bucket left empty is dropped from the store.
    ///
    /// # Examples
    /// ```
    /// use bucketmap::{Store, Strategy};
    ///
    /// let store = Store::new(Strategy::fixed_modulo()).unwrap();
    /// store.set(3, "a");
    /// assert_eq!(store.remove(&3), Some("a"));
    /// assert_eq!(store.remove(&3), None);
    /// ```
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut buckets = self.buckets.lock();
        let Location { bucket, index } = self.strategy.locate(&buckets[..], key)?;
        let (_, value) = Arc::make_mut(&mut buckets[bucket]).remove_at(index);
        if buckets[bucket].is_empty() && self.strategy.reclaims_empty() {
            buckets.remove(bucket);
            tracing::debug!(bucket, buckets = buckets.len(), "reclaimed empty bucket");
        }
        Some(value)
    }

    /// Total number of entries across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.lock().iter().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.lock().iter().all(|b| b.is_empty())
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Shallow copy of the bucket list: the handles, not the contents.
    fn snapshot(&self) -> Vec<Arc<Bucket<K, V>>> {
        self.buckets.lock().clone()
    }
}
