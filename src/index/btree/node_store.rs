//! Loading, persisting and releasing tree nodes.

use tracing::trace;

use crate::common::{Error, PageId, Result, TreeConfig};
use crate::storage::BlockStore;

use super::internal::InternalNode;
use super::leaf::LeafNode;
use super::node::Node;
use super::stats::TreeStats;

/// Turns locators into nodes and nodes back into blocks.
///
/// Nothing is cached: every [`load`](NodeStore::load) decodes the block
/// again and the caller drops the node when it is done with it. Every
/// mutating node operation ends with a [`dump_leaf`](NodeStore::dump_leaf)
/// or [`dump_internal`](NodeStore::dump_internal) of each node it changed, before it returns.
pub struct NodeStore<S: BlockStore> {
    store: S,
    config: TreeConfig,
    stats: TreeStats,
}

impl<S: BlockStore> NodeStore<S> {
    pub fn new(store: S, config: TreeConfig) -> Self {
        Self {
            store,
            config,
            stats: TreeStats::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> &TreeStats {
        &self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Load whichever kind of node lives at `page_id`.
    pub fn load(&self, page_id: PageId) -> Result<Node> {
        let page = self.store.read_block(page_id)?;
        let node = Node::decode(page_id, &page)?;
        TreeStats::bump(&self.stats.nodes_loaded);
        trace!(%page_id, size = node.size(), "loaded node");
        Ok(node)
    }

    /// Load a node that must be a leaf.
    pub fn load_leaf(&self, page_id: PageId) -> Result<LeafNode> {
        match self.load(page_id)? {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(_) => Err(Error::InvariantViolation(format!(
                "{} is an internal node, expected a leaf",
                page_id
            ))),
        }
    }

    /// Write a leaf back to its own block.
    pub fn dump_leaf(&mut self, leaf: &LeafNode) -> Result<()> {
        let page = leaf.encode()?;
        self.store.write_block(leaf.page_id(), &page)?;
        TreeStats::bump(&self.stats.nodes_written);
        trace!(page_id = %leaf.page_id(), size = leaf.size(), "dumped leaf");
        Ok(())
    }

    pub fn dump_internal(&mut self, internal: &InternalNode) -> Result<()> {
        let page = internal.encode()?;
        self.store.write_block(internal.page_id(), &page)?;
        TreeStats::bump(&self.stats.nodes_written);
        trace!(page_id = %internal.page_id(), size = internal.size(), "dumped internal");
        Ok(())
    }

    /// Reserve a block for a new, empty leaf. The leaf is not persisted
    /// until the caller dumps it.
    pub fn new_leaf(&mut self) -> Result<LeafNode> {
        Ok(LeafNode::new(self.store.allocate_block()?))
    }

    /// Reserve a block for a new, empty internal node.
    pub fn new_internal(&mut self) -> Result<InternalNode> {
        Ok(InternalNode::new(self.store.allocate_block()?))
    }

    /// Release a node's block. The locator is dangling afterwards.
    pub fn delete_node(&mut self, page_id: PageId) -> Result<()> {
        self.store.free_block(page_id)?;
        TreeStats::bump(&self.stats.nodes_freed);
        trace!(%page_id, "deleted node");
        Ok(())
    }
}
