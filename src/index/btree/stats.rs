//! Tree I/O and rebalancing statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by a tree's node store.
///
/// `block_accesses` is the cost measure for range queries: it goes up by
/// one for every internal node and every leaf a scan visits. The other
/// counters cover every operation.
///
/// All fields are atomic so read-only operations (range scans) can count
/// through a shared borrow.
///
/// # Memory Ordering
/// `Ordering::Relaxed` everywhere: counters are independent and only need
/// atomicity.
///
/// # Example
/// ```
/// use bplusdb::TreeStats;
///
/// let stats = TreeStats::new();
/// stats.record_block_access();
/// assert_eq!(stats.snapshot().block_accesses, 1);
/// ```
#[derive(Debug, Default)]
pub struct TreeStats {
    /// Nodes visited by range scans.
    pub block_accesses: AtomicU64,

    /// Nodes decoded from the block store.
    pub nodes_loaded: AtomicU64,

    /// Nodes encoded back to the block store.
    pub nodes_written: AtomicU64,

    /// Nodes released by merges and root collapses.
    pub nodes_freed: AtomicU64,

    /// Leaf and internal node splits.
    pub splits: AtomicU64,

    /// Sibling merges.
    pub merges: AtomicU64,

    /// One-entry moves between siblings.
    pub redistributions: AtomicU64,
}

impl TreeStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_block_access(&self) {
        self.block_accesses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            block_accesses: self.block_accesses.load(Ordering::Relaxed),
            nodes_loaded: self.nodes_loaded.load(Ordering::Relaxed),
            nodes_written: self.nodes_written.load(Ordering::Relaxed),
            nodes_freed: self.nodes_freed.load(Ordering::Relaxed),
            splits: self.splits.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
            redistributions: self.redistributions.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.block_accesses,
            &self.nodes_loaded,
            &self.nodes_written,
            &self.nodes_freed,
            &self.splits,
            &self.merges,
            &self.redistributions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time snapshot of tree statistics.
///
/// Unlike `TreeStats`, this is plain data and can be compared, copied
/// and printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub block_accesses: u64,
    pub nodes_loaded: u64,
    pub nodes_written: u64,
    pub nodes_freed: u64,
    pub splits: u64,
    pub merges: u64,
    pub redistributions: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ block_accesses: {}, loaded: {}, written: {}, freed: {}, splits: {}, merges: {}, redistributions: {} }}",
            self.block_accesses,
            self.nodes_loaded,
            self.nodes_written,
            self.nodes_freed,
            self.splits,
            self.merges,
            self.redistributions
        )
    }
}
