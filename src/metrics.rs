//! Store Metrics
//!
//! Operation counters for the store and its sweeper.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by a store and its sweeper
#[derive(Debug, Default)]
pub struct StoreStats {
    added: AtomicU64,
    rejected: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    shortened: AtomicU64,
    swept: AtomicU64,
}

/// Point-in-time copy of `StoreStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Successful adds
    pub added: u64,
    /// Adds refused because the key was present
    pub rejected: u64,
    /// Reads that returned a message
    pub hits: u64,
    /// Reads that found nothing live
    pub misses: u64,
    /// Reads that tightened a deadline
    pub shortened: u64,
    /// Elements removed by the sweeper
    pub swept: u64,
}

impl StoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of an add
    pub fn record_add(&self, inserted: bool) {
        let counter = if inserted { &self.added } else { &self.rejected };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a read
    pub fn record_read(&self, hit: bool, shortened: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            if shortened {
                self.shortened.fetch_add(1, Ordering::Relaxed);
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_swept(&self, count: usize) {
        if count > 0 {
            self.swept.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            added: self.added.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            shortened: self.shortened.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "Adds: {} ({} rejected) | Reads: {} hit, {} miss, {} shortened | Swept: {}",
            self.added, self.rejected, self.hits, self.misses, self.shortened, self.swept
        )
    }
}
