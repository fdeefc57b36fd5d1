//! File server hit counter
//!
//! A single shared integer, bumped by the counting middleware and read or
//! zeroed by the metrics endpoints. Handed around as `Arc<HitCounter>`.

use std::sync::atomic::{AtomicI64, Ordering};

/// Lock-free counter of requests that reached the file server
#[derive(Debug, Default)]
pub struct HitCounter {
    hits: AtomicI64,
}

impl HitCounter {
    pub const fn new() -> Self {
        Self {
            hits: AtomicI64::new(0),
        }
    }

    /// Add one hit, returning the new total
    pub fn increment(&self) -> i64 {
        self.hits.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current number of hits
    pub fn load(&self) -> i64 {
        self.hits.load(Ordering::SeqCst)
    }

    /// Set the count back to zero
    pub fn reset(&self) {
        self.hits.store(0, Ordering::SeqCst);
    }
}
