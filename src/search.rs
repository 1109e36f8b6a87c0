use crate::{Bucket, SearchPool};
use crossbeam_channel::{bounded, select, unbounded, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Position of a key inside a store: the bucket and the index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub bucket: usize,
    pub index: usize,
}

/// Advisory cancellation signal shared by the tasks of one search.
///
/// Raising it only bounds wasted work; results never depend on a task observing it.
#[derive(Debug, Default)]
struct Breaker(AtomicBool);

impl Breaker {
    fn trip(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn is_tripped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Reports a task's completion when dropped, including on unwind.
struct Completion(Sender<()>);

impl Drop for Completion {
    fn drop(&mut self) {
        // The coordinator may already have returned.
        let _ = self.0.send(());
    }
}

/// Searches every bucket concurrently for `key`, one task per bucket, run on
/// the global [`SearchPool`].
///
/// Returns as soon as any task reports a match. `None` is only returned once
/// every launched task has reported completion. If the key is present in more
/// than one bucket, whichever result reaches the coordinator first wins.
pub fn fan_out<K, V>(buckets: &[Arc<Bucket<K, V>>], key: &K) -> Option<Location>
where
    K: Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    let launched = buckets.len();
    if launched == 0 {
        return None;
    }

    let query = Arc::new(key.clone());
    let breaker = Arc::new(Breaker::default());
    // Neither channel can block a task: results are unbounded and there is
    // exactly one completion slot per task.
    let (result_tx, result_rx) = unbounded::<Location>();
    let (done_tx, done_rx) = bounded::<()>(launched);

    let pool = SearchPool::global();
    tracing::trace!(
        tasks = launched,
        workers = pool.workers(),
        "launching fan-out search"
    );
    for (bucket_id, bucket) in buckets.iter().enumerate() {
        let bucket = bucket.clone();
        let query = query.clone();
        let breaker = breaker.clone();
        let result_tx = result_tx.clone();
        let completion = Completion(done_tx.clone());
        pool.execute(move || {
            let _completion = completion;
            if let Some(index) = scan(&bucket, &query, &breaker) {
                breaker.trip();
                let _ = result_tx.send(Location {
                    bucket: bucket_id,
                    index,
                });
            }
        });
    }

    // `result_tx` and `done_tx` stay alive here, so neither receiver disconnects.
    let mut completed = 0;
    loop {
        select! {
            recv(result_rx) -> location => {
                if let Ok(location) = location {
                    tracing::trace!(?location, completed, "fan-out search hit");
                    return Some(location);
                }
            }
            recv(done_rx) -> _ => {
                completed += 1;
                assert!(
                    completed <= launched,
                    "impossible: more completions than launched search tasks!"
                );
                if completed == launched {
                    break;
                }
            }
        }
    }

    // A task sends its result before its completion, so a hit may still be queued.
    let location = result_rx.try_recv().ok();
    tracing::trace!(?location, "fan-out search exhausted");
    location
}

/// Scans one bucket from the first index, giving up once the breaker trips.
fn scan<K: Eq, V>(bucket: &Bucket<K, V>, query: &K, breaker: &Breaker) -> Option<usize> {
    for (index, key) in bucket.keys().iter().enumerate() {
        if breaker.is_tripped() {
            return None;
        }
        if key == query {
            return Some(index);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buckets(layout: &[&[u32]]) -> Vec<Arc<Bucket<u32, u32>>> {
        layout
            .iter()
            .map(|keys| {
                let mut bucket = Bucket::default();
                for &k in keys.iter() {
                    bucket.append(k, k * 100);
                }
                Arc::new(bucket)
            })
            .collect()
    }

    #[test]
    fn test_fan_out_empty() {
        let buckets = buckets(&[]);
        assert_eq!(fan_out(&buckets, &1), None);
    }

    #[test]
    fn test_fan_out_empty_buckets() {
        let buckets = buckets(&[&[], &[], &[]]);
        assert_eq!(fan_out(&buckets, &1), None);
    }

    #[test]
    fn test_fan_out_found() {
        let buckets = buckets(&[&[1, 2, 3], &[4], &[], &[5, 6, 7, 8]]);
        assert_eq!(fan_out(&buckets, &1), Some(Location { bucket: 0, index: 0 }));
        assert_eq!(fan_out(&buckets, &4), Some(Location { bucket: 1, index: 0 }));
        assert_eq!(fan_out(&buckets, &8), Some(Location { bucket: 3, index: 3 }));
        assert_eq!(fan_out(&buckets, &9), None);
    }

    #[test]
    fn test_fan_out_many_buckets() {
        let layout = (0..64u32)
            .map(|b| (b * 100..b * 100 + 100).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let layout = layout.iter().map(|v| v.as_slice()).collect::<Vec<_>>();
        let buckets = buckets(&layout);

        for _ in 0..64 {
            let key = rand::random::<u32>() % 6400;
            let location = fan_out(&buckets, &key).unwrap();
            assert_eq!(location.bucket, (key / 100) as usize);
            assert_eq!(location.index, (key % 100) as usize);
            assert_eq!(*buckets[location.bucket].value(location.index), key * 100);
        }
        assert_eq!(fan_out(&buckets, &6400), None);
    }

    #[test]
    fn test_fan_out_duplicate_keys() {
        let buckets = buckets(&[&[1, 7], &[7], &[2, 3, 7]]);
        let location = fan_out(&buckets, &7).unwrap();
        assert_eq!(buckets[location.bucket].keys()[location.index], 7);
    }

    #[test]
    fn test_scan_tripped() {
        let buckets = buckets(&[&[1, 2, 3]]);
        let breaker = Breaker::default();
        assert_eq!(scan(&buckets[0], &2, &breaker), Some(1));
        breaker.trip();
        assert_eq!(scan(&buckets[0], &2, &breaker), None);
    }

    /// A key whose comparison panics for one value.
    #[derive(Debug, Clone)]
    struct Grumpy(u32);

    impl PartialEq for Grumpy {
        fn eq(&self, other: &Self) -> bool {
            if self.0 == 13 {
                panic!("unlucky comparison");
            }
            self.0 == other.0
        }
    }

    impl Eq for Grumpy {}

    #[test]
    fn test_fan_out_panicking_task_completes() {
        let mut unlucky = Bucket::default();
        unlucky.append(Grumpy(13), ());
        let mut lucky = Bucket::default();
        lucky.append(Grumpy(1), ());
        let buckets = vec![Arc::new(unlucky), Arc::new(lucky)];

        assert_eq!(fan_out(&buckets, &Grumpy(2)), None);
        let location = fan_out(&buckets, &Grumpy(1)).unwrap();
        assert_eq!(location, Location { bucket: 1, index: 0 });
    }
}
