//! bplusdb - a disk-oriented B+ tree index over fixed-size blocks.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            bplusdb                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)                  │   │
//! │  │    BPlusTree → Node { Internal | Leaf } → NodeStore      │   │
//! │  │         insert / delete / range + TreeStats              │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │   BlockStore: MemoryBlockStore | DiskBlockStore          │   │
//! │  │          DiskManager + Page + PageHeader                 │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Key, RecordId, Error, config)
//! - [`storage`] - Block stores, disk I/O and page formats
//! - [`index`] - The B+ tree
//!
//! # Quick Start
//! ```
//! use bplusdb::{BPlusTree, MemoryBlockStore, RecordId, TreeConfig};
//!
//! let mut tree = BPlusTree::create(MemoryBlockStore::new(), TreeConfig::new(4)).unwrap();
//! tree.insert(42, RecordId::new(7)).unwrap();
//! assert_eq!(tree.get(42).unwrap(), Some(RecordId::new(7)));
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, Key, PageId, RecordId, Result, TreeConfig};

pub use index::btree::{BPlusTree, Node, StatsSnapshot, TreeStats};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::{BlockStore, DiskBlockStore, DiskManager, MemoryBlockStore};
