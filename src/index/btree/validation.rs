//! Whole-tree invariant checking.
//!
//! Used by tests after every mutation; cheap enough for small trees only,
//! since it loads every node.

use crate::common::{Error, Key, PageId, Result};
use crate::storage::BlockStore;

use super::node::Node;
use super::tree::BPlusTree;

/// State carried through one in-order walk.
struct Walk {
    /// Greatest key seen so far, to check global order across leaves.
    last_key: Option<Key>,
    /// Leaves in the order the walk reached them.
    leaves: Vec<PageId>,
    /// Depth of the first leaf; every other leaf must match it.
    leaf_depth: Option<usize>,
    /// Nodes reached from the root.
    node_count: usize,
}

fn corrupt(message: String) -> Error {
    Error::Corruption(message)
}

impl<S: BlockStore> BPlusTree<S> {
    /// Check every structural invariant, returning [`Error::Corruption`]
    /// that names the first violation found:
    ///
    /// - separator `keys[i]` equals the max of the subtree at `children[i]`
    /// - non-root nodes hold between `min_occupancy` and `capacity` entries
    /// - all leaves sit at the same depth
    /// - keys strictly increase across the whole tree
    /// - the leaf chain visits exactly the in-order leaves and ends at none
    /// - the store holds no blocks beyond the meta block and reachable nodes
    pub fn validate(&self) -> Result<()> {
        let mut walk = Walk {
            last_key: None,
            leaves: Vec::new(),
            leaf_depth: None,
            node_count: 0,
        };
        self.check_subtree(self.root(), 0, &mut walk)?;
        self.check_leaf_chain(&walk.leaves)?;

        let live = self.store().live_blocks();
        if live != walk.node_count + 1 {
            return Err(corrupt(format!(
                "store has {} live blocks but the tree reaches {} nodes plus the meta block",
                live, walk.node_count
            )));
        }
        Ok(())
    }

    /// Returns the subtree max, or `None` for an empty root leaf.
    fn check_subtree(&self, page_id: PageId, depth: usize, walk: &mut Walk) -> Result<Option<Key>> {
        let node = self.nodes().load(page_id)?;
        walk.node_count += 1;
        self.check_occupancy(&node, depth == 0)?;

        match node {
            Node::Leaf(leaf) => {
                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(corrupt(format!(
                            "leaf {} at depth {}, expected {}",
                            page_id, depth, expected
                        )));
                    }
                    Some(_) => {}
                }

                for &key in leaf.entries().keys() {
                    if walk.last_key.is_some_and(|last| last >= key) {
                        return Err(corrupt(format!(
                            "key {} in leaf {} is out of order",
                            key, page_id
                        )));
                    }
                    walk.last_key = Some(key);
                }
                walk.leaves.push(page_id);
                Ok(leaf.entries().keys().next_back().copied())
            }
            Node::Internal(internal) => {
                if internal.keys().len() + 1 != internal.size() {
                    return Err(corrupt(format!(
                        "internal node {} has {} children and {} keys",
                        page_id,
                        internal.size(),
                        internal.keys().len()
                    )));
                }

                let mut subtree_max = None;
                for (i, &child) in internal.children().iter().enumerate() {
                    let child_max = self.check_subtree(child, depth + 1, walk)?;
                    if let Some(&bound) = internal.keys().get(i) {
                        if child_max != Some(bound) {
                            return Err(corrupt(format!(
                                "separator {} of {} is {} but child {} has max {:?}",
                                i, page_id, bound, child, child_max
                            )));
                        }
                    }
                    subtree_max = child_max;
                }
                Ok(subtree_max)
            }
        }
    }

    fn check_occupancy(&self, node: &Node, is_root: bool) -> Result<()> {
        let config = self.config();
        let size = node.size();

        let min = match (is_root, node) {
            (true, Node::Leaf(_)) => 0,
            (true, Node::Internal(_)) => 2,
            (false, _) => config.min_occupancy(),
        };
        if size < min || size > config.capacity() {
            return Err(corrupt(format!(
                "{} {} has size {} outside [{}, {}]",
                if node.is_leaf() { "leaf" } else { "internal node" },
                node.page_id(),
                size,
                min,
                config.capacity()
            )));
        }
        Ok(())
    }

    fn check_leaf_chain(&self, in_order: &[PageId]) -> Result<()> {
        let mut chained = Vec::with_capacity(in_order.len());
        let mut next = in_order.first().copied();
        while let Some(page_id) = next {
            if chained.len() > in_order.len() {
                return Err(corrupt("leaf chain does not terminate".to_string()));
            }
            chained.push(page_id);
            next = self.nodes().load_leaf(page_id)?.next_leaf();
        }

        if chained != in_order {
            return Err(corrupt(format!(
                "leaf chain {:?} does not match in-order leaves {:?}",
                chained, in_order
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{RecordId, TreeConfig};
    use crate::index::btree::internal::InternalNode;
    use crate::storage::MemoryBlockStore;

    fn filled(count: i64) -> BPlusTree<MemoryBlockStore> {
        let mut tree = BPlusTree::create(MemoryBlockStore::new(), TreeConfig::new(4)).unwrap();
        for key in 0..count {
            tree.insert(key, RecordId(key as u64)).unwrap();
        }
        tree
    }

    #[test]
    fn test_valid_trees_pass() {
        filled(0).validate().unwrap();
        filled(1).validate().unwrap();
        filled(50).validate().unwrap();
    }

    #[test]
    fn test_wrong_separator_detected() {
        let mut tree = filled(5);
        let Node::Internal(root) = tree.nodes().load(tree.root()).unwrap() else {
            panic!("expected an internal root");
        };
        let broken = InternalNode::from_parts(root.page_id(), root.children().to_vec(), vec![99]);
        tree.nodes_mut().dump_internal(&broken).unwrap();

        let err = tree.validate().unwrap_err();
        assert!(err.to_string().contains("separator"), "{}", err);
    }

    #[test]
    fn test_leaked_block_detected() {
        let mut tree = filled(5);
        tree.nodes_mut().store_mut().allocate_block().unwrap();

        let err = tree.validate().unwrap_err();
        assert!(err.to_string().contains("live blocks"), "{}", err);
    }
}
