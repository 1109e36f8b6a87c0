// Modified from https://github.com/rust-lang/rust/blob/master/library/std/src/sys/sync/mutex/futex.rs
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{
    AtomicU32,
    Ordering::{Acquire, Relaxed, Release},
};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1; // locked, no other threads waiting
const CONTENDED: u32 = 2; // locked, and other threads waiting (contended)

/// The store-wide exclusive lock.
///
/// A futex based mutex guarding a value of type `T`. Unlike `std::sync::Mutex`
/// it never poisons: a panic while holding the guard simply releases the lock.
pub struct Lock<T> {
    futex: AtomicU32,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `futex`.
unsafe impl<T: Send> Send for Lock<T> {}
unsafe impl<T: Send> Sync for Lock<T> {}

impl<T> Lock<T> {
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            futex: AtomicU32::new(UNLOCKED),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires the lock, blocking the current thread until it is available.
    #[inline]
    pub fn lock(&self) -> LockGuard<'_, T> {
        if !self.try_acquire() {
            self.lock_contended();
        }
        LockGuard { lock: self }
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.futex
            .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
            .is_ok()
    }

    #[cold]
    fn lock_contended(&self) {
        let mut state = self.spin();

        // Take the lock without marking it contended if it was released while spinning.
        if state == UNLOCKED {
            match self
                .futex
                .compare_exchange(UNLOCKED, LOCKED, Acquire, Relaxed)
            {
                Ok(_) => return,
                Err(s) => state = s,
            }
        }

        loop {
            // Skip the write when already CONTENDED.
            if state != CONTENDED && self.futex.swap(CONTENDED, Acquire) == UNLOCKED {
                return;
            }

            atomic_wait::wait(&self.futex, CONTENDED);
            state = self.spin();
        }
    }

    fn spin(&self) -> u32 {
        let mut spin = 100;
        loop {
            let state = self.futex.load(Relaxed);
            if state != LOCKED || spin == 0 {
                return state;
            }
            std::hint::spin_loop();
            spin -= 1;
        }
    }

    #[inline]
    fn unlock(&self) {
        if self.futex.swap(UNLOCKED, Release) == CONTENDED {
            // Waking one waiter is enough: it re-marks the lock CONTENDED on acquire.
            self.wake();
        }
    }

    #[cold]
    fn wake(&self) {
        atomic_wait::wake_one(&self.futex);
    }
}

impl<T: Default> Default for Lock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// RAII guard for [`Lock`]; the lock is released when the guard is dropped.
pub struct LockGuard<'a, T> {
    lock: &'a Lock<T>,
}

impl<T> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for LockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_lock_exclusive() {
        let lock = Arc::new(Lock::new(Vec::<usize>::new()));
        let current = Arc::new(AtomicU32::new(0));
        const N: usize = 8;
        const M: usize = 1 << 14;

        let threads = (0..N)
            .map(|t| {
                let lock = lock.clone();
                let current = current.clone();
                std::thread::spawn(move || {
                    for i in 0..M {
                        let mut guard = lock.lock();
                        assert_eq!(current.fetch_add(1, Acquire), 0);
                        guard.push(t * M + i);
                        current.fetch_sub(1, Acquire);
                    }
                })
            })
            .collect::<Vec<_>>();
        threads.into_iter().for_each(|t| t.join().unwrap());

        assert_eq!(lock.lock().len(), N * M);
    }

    #[test]
    fn test_no_poison() {
        let lock = Arc::new(Lock::new(0u32));
        let result = {
            let lock = lock.clone();
            std::thread::spawn(move || {
                let mut guard = lock.lock();
                *guard = 7;
                panic!("holding the lock");
            })
            .join()
        };
        assert!(result.is_err());
        assert_eq!(*lock.lock(), 7);
    }

    #[test]
    fn test_concurrent() {
        let lock = Arc::new(Lock::new(0u32));
        const THREAD_COUNT: usize = 4;
        const ITERATIONS: usize = 10000;

        let handles = (0..THREAD_COUNT)
            .map(|_| {
                let lock = Arc::clone(&lock);
                std::thread::spawn(move || {
                    for _ in 0..ITERATIONS {
                        {
                            let mut guard = lock.lock();
                            let value = *guard;
                            std::thread::yield_now(); // force a context switch under the lock
                            *guard = value + 1;
                        }
                        std::thread::yield_now();
                        {
                            let mut guard = lock.lock();
                            let value = *guard;
                            std::thread::yield_now();
                            *guard = value - 1;
                        }
                    }
                })
            })
            .collect::<Vec<_>>();
        handles.into_iter().for_each(|h| h.join().unwrap());

        assert_eq!(*lock.lock(), 0);
    }
}
