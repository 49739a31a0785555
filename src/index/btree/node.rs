//! The closed set of node kinds and the dispatch between them.

use tracing::error;

use crate::common::{Error, Key, PageId, RecordId, Result, TreeConfig};
use crate::storage::page::PageType;
use crate::storage::BlockStore;

use super::internal::InternalNode;
use super::leaf::LeafNode;
use super::node_store::NodeStore;

/// A tree node, decoded from its block.
///
/// Operations that only make sense between two nodes of the same kind
/// (merge, redistribute) match both sides once here and fail with
/// [`Error::InvariantViolation`] on a mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Internal(InternalNode),
    Leaf(LeafNode),
}

impl Node {
    pub fn page_id(&self) -> PageId {
        match self {
            Node::Internal(node) => node.page_id(),
            Node::Leaf(node) => node.page_id(),
        }
    }

    /// The discriminator persisted in the block header.
    pub fn kind(&self) -> PageType {
        match self {
            Node::Internal(_) => PageType::BTreeInternal,
            Node::Leaf(_) => PageType::BTreeLeaf,
        }
    }

    /// Children for an internal node, entries for a leaf.
    pub fn size(&self) -> usize {
        match self {
            Node::Internal(node) => node.size(),
            Node::Leaf(node) => node.size(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn overflows(&self, config: &TreeConfig) -> bool {
        self.size() > config.capacity()
    }

    pub fn underflows(&self, config: &TreeConfig) -> bool {
        self.size() < config.min_occupancy()
    }

    /// Greatest key in the subtree rooted here.
    pub fn max<S: BlockStore>(&self, nodes: &NodeStore<S>) -> Result<Key> {
        match self {
            Node::Internal(node) => node.max(nodes),
            Node::Leaf(node) => node.max(),
        }
    }

    /// See [`InternalNode::single_child_ptr`]. Leaves have no children.
    pub fn single_child_ptr(&self) -> Option<PageId> {
        match self {
            Node::Internal(node) => node.single_child_ptr(),
            Node::Leaf(_) => None,
        }
    }

    pub fn insert_key<S: BlockStore>(
        &mut self,
        nodes: &mut NodeStore<S>,
        key: Key,
        record: RecordId,
    ) -> Result<Option<PageId>> {
        match self {
            Node::Internal(node) => node.insert_key(nodes, key, record),
            Node::Leaf(node) => node.insert_key(nodes, key, record),
        }
    }

    pub fn delete_key<S: BlockStore>(&mut self, nodes: &mut NodeStore<S>, key: Key) -> Result<()> {
        match self {
            Node::Internal(node) => node.delete_key(nodes, key),
            Node::Leaf(node) => node.delete_key(nodes, key),
        }
    }

    pub fn range<S: BlockStore>(
        &self,
        nodes: &NodeStore<S>,
        min: Key,
        max: Key,
        emit: &mut dyn FnMut(Key, RecordId),
    ) -> Result<()> {
        match self {
            Node::Internal(node) => node.range(nodes, min, max, emit),
            Node::Leaf(node) => node.range(nodes, min, max, emit),
        }
    }

    /// Absorb `sibling`, the node immediately to the right, and free it.
    pub fn merge_nodes<S: BlockStore>(
        &mut self,
        nodes: &mut NodeStore<S>,
        sibling: Node,
    ) -> Result<()> {
        match (self, sibling) {
            (Node::Internal(node), Node::Internal(sibling)) => node.merge_nodes(nodes, sibling),
            (Node::Leaf(node), Node::Leaf(sibling)) => node.merge_nodes(nodes, sibling),
            (node, sibling) => Err(kind_mismatch("merge", node, &sibling)),
        }
    }

    /// Move one entry or child from `from` to its neighbour `to`.
    ///
    /// `from_index < to_index` means `from` is the left sibling.
    pub fn redistribute_data<S: BlockStore>(
        nodes: &mut NodeStore<S>,
        from: &mut Node,
        to: &mut Node,
        from_index: usize,
        to_index: usize,
    ) -> Result<()> {
        match (from, to) {
            (Node::Internal(from), Node::Internal(to)) => {
                InternalNode::redistribute_data(nodes, from, to, from_index, to_index)
            }
            (Node::Leaf(from), Node::Leaf(to)) => {
                LeafNode::redistribute_data(nodes, from, to, from_index, to_index)
            }
            (from, to) => Err(kind_mismatch("redistribute", from, to)),
        }
    }
}

fn kind_mismatch(operation: &str, a: &Node, b: &Node) -> Error {
    error!(
        operation,
        left = %a.page_id(),
        right = %b.page_id(),
        "sibling node kinds differ"
    );
    Error::InvariantViolation(format!(
        "cannot {} {:?} {} with {:?} {}",
        operation,
        a.kind(),
        a.page_id(),
        b.kind(),
        b.page_id()
    ))
}
