/// A partition of the store, scanned linearly.
///
/// Keys and values are kept in two index-aligned sequences: `keys[i]` is always
/// associated with `values[i]`. The bucket does no locking of its own; the
/// `Store` serializes every mutation.
///
/// Buckets are internal to the store and not part of the public API:
/// ```compile_fail
/// use bucketmap::Bucket;
/// ```
#[derive(Debug, Clone)]
pub struct Bucket<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
}

impl<K, V> Default for Bucket<K, V> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<K: Eq, V> Bucket<K, V> {
    /// Number of entries in this bucket.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether this bucket holds no entries.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key sequence, in insertion order.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// The value aligned with `keys()[index]`. Panics if `index` is out of range.
    pub fn value(&self, index: usize) -> &V {
        &self.values[index]
    }

    /// Returns the index of `key` in this bucket.
    pub fn find(&self, key: &K) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// Adds an entry at the end of the bucket.
    pub fn append(&mut self, key: K, value: V) {
        self.keys.push(key);
        self.values.push(value);
        self.check_alignment();
    }

    /// Replaces the value at `index`, returning the previous one.
    pub fn overwrite(&mut self, index: usize, value: V) -> V {
        std::mem::replace(&mut self.values[index], value)
    }

    /// Removes the entry at `index` from both sequences, preserving the order of the rest.
    pub fn remove_at(&mut self, index: usize) -> (K, V) {
        let key = self.keys.remove(index);
        let value = self.values.remove(index);
        self.check_alignment();
        (key, value)
    }

    fn check_alignment(&self) {
        assert_eq!(
            self.keys.len(),
            self.values.len(),
            "impossible: bucket keys and values are misaligned!"
        );
    }
}
