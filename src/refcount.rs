//! Reference counting for asynchronously processed objects
//!
//! A [`RefCounter`] tracks how many parties still hold an object after the
//! registry has unlinked it. The count is atomic; each counter is also bound
//! to one mutex from a shared [`ReferenceCounterGroup`] which the owning
//! object uses for its short critical sections (for subscriptions, the
//! notify-versus-clear race). Pooling keeps the number of mutexes bounded no
//! matter how many objects exist.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Default number of pooled mutexes
pub const DEFAULT_GROUP_SIZE: usize = 128;

/// Fixed pool of mutexes shared by many counters
#[derive(Debug)]
pub struct ReferenceCounterGroup {
    mutexes: Vec<Arc<Mutex<()>>>,
    next: AtomicUsize,
}

impl ReferenceCounterGroup {
    /// Create a group with `size` mutexes (at least one)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            mutexes: (0..size).map(|_| Arc::new(Mutex::new(()))).collect(),
            next: AtomicUsize::new(0),
        }
    }

    /// Number of mutexes in the pool
    pub fn size(&self) -> usize {
        self.mutexes.len()
    }

    /// Create a counter with one reference, bound round-robin to a pool mutex
    pub fn init_reference_counter(&self) -> RefCounter {
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.mutexes.len();
        RefCounter {
            count: AtomicUsize::new(1),
            lock: Arc::clone(&self.mutexes[slot]),
        }
    }
}

impl Default for ReferenceCounterGroup {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_SIZE)
    }
}

/// Reference counter bound to a pooled mutex
#[derive(Debug)]
pub struct RefCounter {
    count: AtomicUsize,
    lock: Arc<Mutex<()>>,
}

impl RefCounter {
    /// Add a reference
    ///
    /// The caller must already hold one; there is no way back from zero.
    pub fn add_reference(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop a reference
    ///
    /// Returns `true` when this was the last one and the owning object may be
    /// reclaimed.
    pub fn remove_reference(&self) -> bool {
        let prev = self.count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "reference count underflow");
        prev == 1
    }

    /// Current count (snapshot)
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// The pooled mutex this counter is bound to
    pub fn lock(&self) -> &Mutex<()> {
        &self.lock
    }

    /// Whether both counters are bound to the same pooled mutex
    pub fn shares_lock_with(&self, other: &RefCounter) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}
