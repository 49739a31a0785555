//! The block store contract.

use crate::common::{PageId, Result};
use crate::storage::page::Page;

/// A store of fixed-size blocks addressed by [`PageId`].
///
/// The B+ tree never holds nodes in memory between operations: every step
/// reads a node's block, decodes it, and writes it back after mutating it.
/// This trait is everything the tree needs from the layer below.
///
/// # Lifecycle
/// ```text
/// allocate_block ──▶ write_block / read_block ... ──▶ free_block
///                                                       │
///      (locator may be handed out again by allocate) ◀──┘
/// ```
/// Reading a freed block fails with [`Error::PageFreed`]; reading a block
/// that was never allocated fails with [`Error::PageNotFound`].
///
/// [`Error::PageFreed`]: crate::common::Error::PageFreed
/// [`Error::PageNotFound`]: crate::common::Error::PageNotFound
pub trait BlockStore {
    /// Reserve a block and return its locator. The block starts zeroed.
    fn allocate_block(&mut self) -> Result<PageId>;

    /// Copy a block's current contents out of the store.
    fn read_block(&self, page_id: PageId) -> Result<Page>;

    /// Replace a block's contents. The block must be allocated and live.
    fn write_block(&mut self, page_id: PageId, page: &Page) -> Result<()>;

    /// Release a block. Its locator must not be read again until it is
    /// returned by a later `allocate_block`.
    fn free_block(&mut self, page_id: PageId) -> Result<()>;

    /// Number of allocated, not-freed blocks.
    fn live_blocks(&self) -> usize;
}
