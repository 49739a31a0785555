//! Storage layer - block stores, disk I/O and page formats.
//!
//! This module handles where node blocks live:
//! - [`BlockStore`] - The allocate/read/write/free contract the tree uses
//! - [`MemoryBlockStore`] - Blocks in a hash map, for tests and scratch trees
//! - [`DiskBlockStore`] - Blocks in a single database file
//! - [`DiskManager`] - Low-level file I/O
//! - [`page`] - Page types and layouts

mod block_store;
mod disk_block_store;
mod disk_manager;
mod memory_block_store;
pub mod page;

pub use block_store::BlockStore;
pub use disk_block_store::DiskBlockStore;
pub use disk_manager::DiskManager;
pub use memory_block_store::MemoryBlockStore;
