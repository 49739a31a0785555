//! Disk-oriented B+ tree.
//!
//! # Structure
//! - [`BPlusTree`] - driver owning the root and meta block locators
//! - [`Node`] - closed set of node kinds: [`InternalNode`] and [`LeafNode`]
//! - [`NodeStore`] - loads and dumps nodes through a [`BlockStore`](crate::storage::BlockStore)
//! - [`TreeStats`] - per-tree block access and structural counters
//! - [`debug`] - text export, Mermaid chart, raw node fields
//!
//! Nodes are never cached: each step of an operation loads the node it needs
//! and persists every node it changes before returning.

mod codec;
pub mod debug;
mod internal;
mod leaf;
mod node;
mod node_store;
mod stats;
mod tree;
mod validation;

pub use internal::InternalNode;
pub use leaf::LeafNode;
pub use node::Node;
pub use node_store::NodeStore;
pub use stats::{StatsSnapshot, TreeStats};
pub use tree::BPlusTree;
