//! Single-fill lazy cache.
//!
//! A typed cache that prevents "thundering herd" behavior by allowing only
//! one caller at a time to fill it. Built on a reader/writer lock, so any
//! number of concurrent readers can observe a present value.

use std::fmt;

use parking_lot::{RwLock, RwLockWriteGuard};

/// A lazily-filled value shared between threads.
///
/// The loader runs at most once per fill, no matter how many callers miss
/// concurrently: the first one through the write lock loads, the rest block
/// and then observe its result. A loader that returns `None` leaves the
/// cache empty, so the next `get` tries again; failures are never memoized.
pub struct CachedValue<T> {
    current: RwLock<Option<T>>,
    load: Box<dyn Fn() -> Option<T> + Send + Sync>,
}

impl<T: Clone> CachedValue<T> {
    /// Create an empty cache with the loader used to fill it.
    pub fn new<F>(load: F) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        Self {
            current: RwLock::new(None),
            load: Box::new(load),
        }
    }

    /// Fetch the cached value, filling it on a miss.
    ///
    /// Returns `None` when the loader could not produce a value; that miss
    /// is retried on the next call.
    pub fn get(&self) -> Option<T> {
        let read = self.current.read();
        if let Some(value) = read.as_ref() {
            return Some(value.clone());
        }

        // Release the read lock before requesting the write lock: the write
        // lock waits for readers to drain, so holding both deadlocks
        // against other waiting readers.
        drop(read);
        let mut write = self.current.write();
        if write.is_none() {
            // Still absent after re-checking: another thread may have
            // filled it while no lock was held.
            *write = (self.load)();
        }

        // Demote to a read lock before giving up exclusivity, so an
        // invalidate cannot clear the value before this caller returns it.
        let read = RwLockWriteGuard::downgrade(write);
        (*read).clone()
    }

    /// Clear the cached value.
    ///
    /// Takes the write lock, so it waits for an in-flight fill and for
    /// current readers to finish; the next `get` runs the loader again.
    pub fn invalidate(&self) {
        *self.current.write() = None;
    }
}

impl<T> fmt::Debug for CachedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedValue")
            .field("filled", &self.current.read().is_some())
            .finish()
    }
}
