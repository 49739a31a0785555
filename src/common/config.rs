//! Configuration constants and tree tuning for bplusdb.

use super::error::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// One B+ tree node occupies exactly one page, so this bounds the fanout.
pub const PAGE_SIZE: usize = 4096;

/// Size of the common page header (type, checksum, LSN).
pub const PAGE_HEADER_SIZE: usize = 13;

/// Bytes a leaf spends before its entries: header, size, next-leaf pointer.
pub const LEAF_PREFIX_SIZE: usize = PAGE_HEADER_SIZE + 4 + 4;

/// Bytes a leaf spends per entry: key (i64) + record locator (u64).
pub const LEAF_ENTRY_SIZE: usize = 8 + 8;

/// Bytes an internal node spends before its children: header and size.
pub const INTERNAL_PREFIX_SIZE: usize = PAGE_HEADER_SIZE + 4;

/// Largest fanout whose leaf and internal encodings both fit in a page.
///
/// An internal node of fanout `n` needs `4n + 8(n - 1)` bytes of body.
pub const MAX_FANOUT: usize = {
    let leaf = (PAGE_SIZE - LEAF_PREFIX_SIZE) / LEAF_ENTRY_SIZE;
    let internal = (PAGE_SIZE - INTERNAL_PREFIX_SIZE + 8) / 12;
    if leaf < internal {
        leaf
    } else {
        internal
    }
};

/// Default fanout: four entries per node, two minimum.
pub const DEFAULT_FANOUT: usize = 4;

/// Fanout settings for a tree.
///
/// `fanout` is the capacity of every node: the maximum number of entries a
/// leaf holds or children an internal node holds. A node that grows past it
/// splits; a non-root node that shrinks below [`min_occupancy`] is
/// rebalanced.
///
/// [`min_occupancy`]: TreeConfig::min_occupancy
///
/// # Example
/// ```
/// use bplusdb::TreeConfig;
///
/// let config = TreeConfig::new(4);
/// assert_eq!(config.capacity(), 4);
/// assert_eq!(config.min_occupancy(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    pub fanout: usize,
}

impl TreeConfig {
    /// Create a config with the given fanout. Call [`validate`](Self::validate)
    /// before building a tree with it.
    pub fn new(fanout: usize) -> Self {
        Self { fanout }
    }

    /// Maximum entries (leaf) or children (internal) per node.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.fanout
    }

    /// Minimum entries/children of a non-root node, and the number kept by
    /// the left half of a split.
    #[inline]
    pub fn min_occupancy(&self) -> usize {
        self.fanout.div_ceil(2)
    }

    /// Check the fanout is usable.
    ///
    /// Below 3 a split or merge could leave a node under the minimum; above
    /// [`MAX_FANOUT`] a full node no longer fits in one page.
    pub fn validate(&self) -> Result<()> {
        if self.fanout < 3 {
            return Err(Error::InvalidConfig(format!(
                "fanout {} is below the minimum of 3",
                self.fanout
            )));
        }
        if self.fanout > MAX_FANOUT {
            return Err(Error::InvalidConfig(format!(
                "fanout {} exceeds the page limit of {}",
                self.fanout, MAX_FANOUT
            )));
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FANOUT)
    }
}
