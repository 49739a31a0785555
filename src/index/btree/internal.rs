//! Internal nodes: routing, split propagation and the delete rebalancing
//! cascade.

use tracing::{debug, error};

use crate::common::{Error, Key, PageId, RecordId, Result};
use crate::storage::BlockStore;

use super::node::Node;
use super::node_store::NodeStore;
use super::stats::TreeStats;

/// An internal node: `size` child locators and `size - 1` separator keys.
///
/// `keys[i]` is the greatest key reachable through `children[i]`. The last
/// child has no key and takes everything greater than `keys[size - 2]`.
///
/// ```text
///   children:  [ A ,  B ,  C ]
///   keys:        max(A) max(B)
///
///   key <= max(A)          -> A
///   max(A) < key <= max(B) -> B
///   max(B) < key           -> C
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    page_id: PageId,
    children: Vec<PageId>,
    keys: Vec<Key>,
}

impl InternalNode {
    /// An internal node with no children yet. It must be given at least one
    /// child before it is dumped.
    pub fn new(page_id: PageId) -> Self {
        Self::from_parts(page_id, Vec::new(), Vec::new())
    }

    pub fn from_parts(page_id: PageId, children: Vec<PageId>, keys: Vec<Key>) -> Self {
        Self {
            page_id,
            children,
            keys,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Number of children.
    #[inline]
    pub fn size(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> &[PageId] {
        &self.children
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// The sole child, if this node has collapsed to one. The tree uses this
    /// to replace a root that lost all but one child.
    pub fn single_child_ptr(&self) -> Option<PageId> {
        match self.children.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Index of the child responsible for `key`: the first child whose bound
    /// is at least `key`, else the last child.
    pub fn route(&self, key: Key) -> usize {
        self.keys
            .iter()
            .position(|&bound| key <= bound)
            .unwrap_or(self.children.len().saturating_sub(1))
    }

    fn last_child(&self) -> Result<PageId> {
        self.children.last().copied().ok_or_else(|| {
            Error::InvariantViolation(format!("internal node {} has no children", self.page_id))
        })
    }

    /// Greatest key in the subtree, found down the rightmost path.
    pub fn max<S: BlockStore>(&self, nodes: &NodeStore<S>) -> Result<Key> {
        nodes.load(self.last_child()?)?.max(nodes)
    }

    /// Insert into the subtree, absorbing a child split if one happens.
    ///
    /// Returns the locator of this node's own new right sibling if absorbing
    /// the child split made it overflow. The left half keeps exactly
    /// `min_occupancy` children.
    pub fn insert_key<S: BlockStore>(
        &mut self,
        nodes: &mut NodeStore<S>,
        key: Key,
        record: RecordId,
    ) -> Result<Option<PageId>> {
        let posn = self.route(key);
        let mut child = nodes.load(self.children[posn])?;

        let Some(split_ptr) = child.insert_key(nodes, key, record)? else {
            return Ok(None);
        };

        self.children.insert(posn + 1, split_ptr);
        let child_max = child.max(nodes)?;
        if posn < self.keys.len() {
            self.keys[posn] = child_max;
            let split_max = nodes.load(split_ptr)?.max(nodes)?;
            self.keys.insert(posn + 1, split_max);
        } else {
            // The last child split: its right half stays the unbounded child.
            self.keys.push(child_max);
        }

        if self.size() <= nodes.config().capacity() {
            nodes.dump_internal(self)?;
            return Ok(None);
        }

        let keep = nodes.config().min_occupancy();
        let mut sibling = nodes.new_internal()?;
        sibling.children = self.children.split_off(keep);
        sibling.keys = self.keys.split_off(keep);
        // children[keep - 1] is now our last child and loses its bound.
        self.keys.truncate(keep - 1);

        nodes.dump_internal(&sibling)?;
        nodes.dump_internal(self)?;

        TreeStats::bump(&nodes.stats().splits);
        debug!(
            node = %self.page_id,
            sibling = %sibling.page_id,
            kept = self.size(),
            moved = sibling.size(),
            "split internal node"
        );
        Ok(Some(sibling.page_id))
    }

    /// Delete from the subtree and repair the child it was routed to.
    ///
    /// An underflowing child is fixed by the first of these that applies:
    /// left redistribute, left merge, right redistribute, right merge.
    pub fn delete_key<S: BlockStore>(&mut self, nodes: &mut NodeStore<S>, key: Key) -> Result<()> {
        let posn = self.route(key);
        let mut child = nodes.load(self.children[posn])?;
        child.delete_key(nodes, key)?;

        if posn < self.keys.len() {
            self.keys[posn] = child.max(nodes)?;
        }

        if child.underflows(nodes.config()) {
            self.rebalance_child(nodes, posn, child)?;
        }

        nodes.dump_internal(self)
    }

    fn rebalance_child<S: BlockStore>(
        &mut self,
        nodes: &mut NodeStore<S>,
        posn: usize,
        mut child: Node,
    ) -> Result<()> {
        let min = nodes.config().min_occupancy();

        if posn > 0 {
            let mut left = nodes.load(self.children[posn - 1])?;

            if child.size() + left.size() >= 2 * min {
                Node::redistribute_data(nodes, &mut left, &mut child, posn - 1, posn)?;
                self.keys[posn - 1] = left.max(nodes)?;
                return Ok(());
            }

            left.merge_nodes(nodes, child)?;
            self.children.remove(posn);
            self.keys.remove(posn - 1);
            return Ok(());
        }

        let Some(&right_ptr) = self.children.get(posn + 1) else {
            error!(
                node = %self.page_id,
                child = %child.page_id(),
                "underflowing child has no sibling"
            );
            return Err(Error::InvariantViolation(format!(
                "child {} of {} underflowed with no sibling",
                child.page_id(),
                self.page_id
            )));
        };
        let mut right = nodes.load(right_ptr)?;

        if child.size() + right.size() >= 2 * min {
            Node::redistribute_data(nodes, &mut right, &mut child, posn + 1, posn)?;
            self.keys[posn] = child.max(nodes)?;
            return Ok(());
        }

        child.merge_nodes(nodes, right)?;
        self.children.remove(posn + 1);
        self.keys.remove(posn);
        Ok(())
    }

    /// Absorb the internal node immediately to the right and free its block.
    ///
    /// The bound for our current last child is its subtree max. A child
    /// locator shared by both nodes at the seam is kept once.
    pub fn merge_nodes<S: BlockStore>(
        &mut self,
        nodes: &mut NodeStore<S>,
        sibling: InternalNode,
    ) -> Result<()> {
        let last = self.last_child()?;

        if sibling.children.first() == Some(&last) {
            self.children.extend_from_slice(&sibling.children[1..]);
        } else {
            let bound = nodes.load(last)?.max(nodes)?;
            self.keys.push(bound);
            self.children.extend_from_slice(&sibling.children);
        }
        self.keys.extend_from_slice(&sibling.keys);
        debug_assert_eq!(self.children.len(), self.keys.len() + 1);

        nodes.dump_internal(self)?;
        nodes.delete_node(sibling.page_id)?;

        TreeStats::bump(&nodes.stats().merges);
        debug!(node = %self.page_id, absorbed = %sibling.page_id, "merged internal nodes");
        Ok(())
    }

    /// Move one child from `from` to its underflowing neighbour `to`.
    ///
    /// Moving left-to-right takes `from`'s last child; right-to-left takes
    /// its first. Separators on both sides are rebuilt from subtree maxima so
    /// every bound stays exact. Both nodes are persisted.
    pub fn redistribute_data<S: BlockStore>(
        nodes: &mut NodeStore<S>,
        from: &mut InternalNode,
        to: &mut InternalNode,
        from_index: usize,
        to_index: usize,
    ) -> Result<()> {
        if from.size() < 2 || to.size() == 0 {
            return Err(Error::InvariantViolation(format!(
                "cannot move a child from {} ({} children) to {} ({} children)",
                from.page_id,
                from.size(),
                to.page_id,
                to.size()
            )));
        }

        let moved = if from_index < to_index {
            let moved = from.children.remove(from.children.len() - 1);
            from.keys.pop();
            let moved_max = nodes.load(moved)?.max(nodes)?;
            to.children.insert(0, moved);
            to.keys.insert(0, moved_max);
            moved
        } else {
            let moved = from.children.remove(0);
            from.keys.remove(0);
            let bound = nodes.load(to.last_child()?)?.max(nodes)?;
            to.keys.push(bound);
            to.children.push(moved);
            moved
        };

        nodes.dump_internal(from)?;
        nodes.dump_internal(to)?;

        TreeStats::bump(&nodes.stats().redistributions);
        debug!(from = %from.page_id, to = %to.page_id, child = %moved, "redistributed child");
        Ok(())
    }

    /// Route a range query to the first child that can hold `min` and let
    /// the leaf chain do the rest.
    pub fn range<S: BlockStore>(
        &self,
        nodes: &NodeStore<S>,
        min: Key,
        max: Key,
        emit: &mut dyn FnMut(Key, RecordId),
    ) -> Result<()> {
        nodes.stats().record_block_access();
        let child = nodes.load(self.children[self.route(min)])?;
        child.range(nodes, min, max, emit)
    }
}
