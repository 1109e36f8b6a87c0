//! An in-memory bucketed key-value store with interchangeable bucket strategies.
//!
//! # Overview
//! `bucketmap` partitions its entries into buckets that are scanned linearly.
//! Which bucket a key lives in is decided by a [`Strategy`]:
//!
//! - [`Strategy::SingleLinear`]: one bucket for everything, the baseline.
//! - [`Strategy::FixedModulo`]: `bucket_hash(key) % n` over a fixed bucket count.
//! - [`Strategy::DynamicFanOut`]: buckets are filled up to a capacity and
//!   allocated on demand. Since a key's bucket is not derivable from the key,
//!   lookups search all buckets concurrently, one task per bucket on a shared
//!   pool of worker threads, and stop every search as soon as one of them
//!   finds the key.
//!
//! # Features
//! - Store-wide exclusive lock for mutation, no poisoning
//! - Copy-on-write buckets, so concurrent lookups scan a consistent snapshot
//! - Absence reported through `Option`, errors only for misconfiguration
//!
//! # Examples
//! ```
//! use bucketmap::{Store, Strategy};
//!
//! let store = Store::<u32, String>::new(Strategy::FixedModulo(10)).unwrap();
//!
//! // 3 and 13 share bucket 3
//! store.set(3, "a".into());
//! store.set(13, "b".into());
//! assert_eq!(store.get(&13), Some("b".into()));
//!
//! assert_eq!(store.remove(&3), Some("a".into()));
//! assert_eq!(store.get(&3), None);
//!
//! let store = Store::<u32, u32>::new(Strategy::DynamicFanOut(1)).unwrap();
//! for i in 0..5 {
//!     store.set(i, i * 100);
//! }
//! assert_eq!(store.bucket_count(), 5);
//! assert_eq!(store.get(&4), Some(400));
//! ```
mod bucket;
mod error;
mod lock;
mod pool;
mod search;
mod store;
mod strategy;

use bucket::Bucket;
pub use error::Error;
use lock::*;
use pool::SearchPool;
pub use store::Store;
pub use strategy::{BucketHash, Strategy, DEFAULT_BUCKET_COUNT, DEFAULT_CAPACITY};
