//! Leaf nodes: sorted entries plus the forward link of the leaf chain.

use std::collections::BTreeMap;

use tracing::{debug, error};

use crate::common::{Error, Key, PageId, RecordId, Result};
use crate::storage::BlockStore;

use super::node_store::NodeStore;
use super::stats::TreeStats;

/// A leaf: up to `capacity` `(key, record)` pairs in key order, and the
/// locator of the next leaf to the right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    page_id: PageId,
    entries: BTreeMap<Key, RecordId>,
    next_leaf: Option<PageId>,
}

impl LeafNode {
    /// An empty, unchained leaf living at `page_id`.
    pub fn new(page_id: PageId) -> Self {
        Self::from_parts(page_id, BTreeMap::new(), None)
    }

    pub fn from_parts(
        page_id: PageId,
        entries: BTreeMap<Key, RecordId>,
        next_leaf: Option<PageId>,
    ) -> Self {
        Self {
            page_id,
            entries,
            next_leaf,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Number of stored entries.
    #[inline]
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn next_leaf(&self) -> Option<PageId> {
        self.next_leaf
    }

    pub fn entries(&self) -> &BTreeMap<Key, RecordId> {
        &self.entries
    }

    pub fn get(&self, key: Key) -> Option<RecordId> {
        self.entries.get(&key).copied()
    }

    /// Greatest stored key.
    pub fn max(&self) -> Result<Key> {
        self.entries
            .last_key_value()
            .map(|(&key, _)| key)
            .ok_or(Error::EmptyNode(self.page_id.0))
    }

    /// Insert `key` unless it is already present.
    ///
    /// Returns the locator of a new right sibling if the leaf overflowed and
    /// split. The left half keeps exactly `min_occupancy` entries and the new
    /// leaf is spliced into the chain right after this one.
    pub fn insert_key<S: BlockStore>(
        &mut self,
        nodes: &mut NodeStore<S>,
        key: Key,
        record: RecordId,
    ) -> Result<Option<PageId>> {
        if self.entries.contains_key(&key) {
            return Ok(None);
        }
        self.entries.insert(key, record);

        if self.size() <= nodes.config().capacity() {
            nodes.dump_leaf(self)?;
            return Ok(None);
        }

        let keep = nodes.config().min_occupancy();
        let split_key = *self.entries.keys().nth(keep).ok_or_else(|| {
            Error::InvariantViolation(format!("leaf {} overflowed with too few entries", self.page_id))
        })?;

        let mut sibling = nodes.new_leaf()?;
        sibling.entries = self.entries.split_off(&split_key);
        sibling.next_leaf = self.next_leaf;
        self.next_leaf = Some(sibling.page_id);

        nodes.dump_leaf(&sibling)?;
        nodes.dump_leaf(self)?;

        TreeStats::bump(&nodes.stats().splits);
        debug!(
            leaf = %self.page_id,
            sibling = %sibling.page_id,
            split_key,
            "split leaf"
        );
        Ok(Some(sibling.page_id))
    }

    /// Remove `key` if present.
    pub fn delete_key<S: BlockStore>(&mut self, nodes: &mut NodeStore<S>, key: Key) -> Result<()> {
        if self.entries.remove(&key).is_some() {
            nodes.dump_leaf(self)?;
        }
        Ok(())
    }

    /// Absorb the leaf immediately to the right and free its block.
    pub fn merge_nodes<S: BlockStore>(
        &mut self,
        nodes: &mut NodeStore<S>,
        mut sibling: LeafNode,
    ) -> Result<()> {
        if self.next_leaf != Some(sibling.page_id) {
            error!(
                leaf = %self.page_id,
                sibling = %sibling.page_id,
                "merge with a non-adjacent leaf"
            );
            return Err(Error::InvariantViolation(format!(
                "cannot merge leaf {} into {}: not its right neighbour",
                sibling.page_id, self.page_id
            )));
        }

        self.entries.append(&mut sibling.entries);
        self.next_leaf = sibling.next_leaf;
        nodes.dump_leaf(self)?;
        nodes.delete_node(sibling.page_id)?;

        TreeStats::bump(&nodes.stats().merges);
        debug!(leaf = %self.page_id, absorbed = %sibling.page_id, "merged leaves");
        Ok(())
    }

    /// Move one entry from `from` to its underflowing neighbour `to`.
    ///
    /// If `from` sits left of `to` its greatest entry moves, otherwise its
    /// least. Both leaves are persisted.
    pub fn redistribute_data<S: BlockStore>(
        nodes: &mut NodeStore<S>,
        from: &mut LeafNode,
        to: &mut LeafNode,
        from_index: usize,
        to_index: usize,
    ) -> Result<()> {
        let moved = if from_index < to_index {
            from.entries.last_key_value()
        } else {
            from.entries.first_key_value()
        };
        let (key, record) = moved
            .map(|(&key, &record)| (key, record))
            .ok_or(Error::EmptyNode(from.page_id.0))?;

        if let Some(split) = to.insert_key(nodes, key, record)? {
            return Err(Error::InvariantViolation(format!(
                "redistribution into leaf {} split it (new sibling {})",
                to.page_id, split
            )));
        }
        from.delete_key(nodes, key)?;

        TreeStats::bump(&nodes.stats().redistributions);
        debug!(from = %from.page_id, to = %to.page_id, key, "redistributed leaf entry");
        Ok(())
    }

    /// Emit every entry with `min <= key <= max`, following the leaf chain
    /// until a key above `max` or the end of the chain.
    pub fn range<S: BlockStore>(
        &self,
        nodes: &NodeStore<S>,
        min: Key,
        max: Key,
        emit: &mut dyn FnMut(Key, RecordId),
    ) -> Result<()> {
        let mut next = self.scan(nodes, min, max, emit);
        while let Some(page_id) = next {
            let leaf = nodes.load_leaf(page_id)?;
            next = leaf.scan(nodes, min, max, emit);
        }
        Ok(())
    }

    /// Emit this leaf's matches. Returns the next leaf to visit, or `None`
    /// once a key above `max` is seen.
    fn scan<S: BlockStore>(
        &self,
        nodes: &NodeStore<S>,
        min: Key,
        max: Key,
        emit: &mut dyn FnMut(Key, RecordId),
    ) -> Option<PageId> {
        nodes.stats().record_block_access();
        for (&key, &record) in self.entries.range(min..) {
            if key > max {
                return None;
            }
            emit(key, record);
        }
        self.next_leaf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TreeConfig;
    use crate::storage::MemoryBlockStore;

    fn node_store() -> NodeStore<MemoryBlockStore> {
        NodeStore::new(MemoryBlockStore::new(), TreeConfig::new(4))
    }

    fn new_leaf(nodes: &mut NodeStore<MemoryBlockStore>, keys: &[Key]) -> LeafNode {
        let mut leaf = nodes.new_leaf().unwrap();
        for &key in keys {
            assert_eq!(leaf.insert_key(nodes, key, RecordId(key as u64)).unwrap(), None);
        }
        nodes.dump_leaf(&leaf).unwrap();
        leaf
    }

    fn keys(leaf: &LeafNode) -> Vec<Key> {
        leaf.entries().keys().copied().collect()
    }

    #[test]
    fn test_insert_keeps_order_and_persists() {
        let mut nodes = node_store();
        let leaf = new_leaf(&mut nodes, &[30, 10, 20]);

        assert_eq!(keys(&leaf), vec![10, 20, 30]);
        assert_eq!(leaf.max().unwrap(), 30);
        assert_eq!(nodes.load_leaf(leaf.page_id()).unwrap(), leaf);
    }

    #[test]
    fn test_duplicate_insert_is_ignored() {
        let mut nodes = node_store();
        let mut leaf = new_leaf(&mut nodes, &[1]);

        assert_eq!(leaf.insert_key(&mut nodes, 1, RecordId(999)).unwrap(), None);
        assert_eq!(leaf.get(1), Some(RecordId(1)));
        assert_eq!(leaf.size(), 1);
    }

    #[test]
    fn test_split_on_overflow() {
        let mut nodes = node_store();
        let mut leaf = new_leaf(&mut nodes, &[1, 2, 3, 4]);
        let old_next = PageId::new(77);
        leaf.next_leaf = Some(old_next);

        let sibling_id = leaf.insert_key(&mut nodes, 5, RecordId(5)).unwrap().unwrap();
        let sibling = nodes.load_leaf(sibling_id).unwrap();

        assert_eq!(keys(&leaf), vec![1, 2]);
        assert_eq!(keys(&sibling), vec![3, 4, 5]);
        assert_eq!(leaf.next_leaf(), Some(sibling_id));
        assert_eq!(sibling.next_leaf(), Some(old_next));
        assert_eq!(nodes.load_leaf(leaf.page_id()).unwrap(), leaf);
        assert_eq!(nodes.stats().snapshot().splits, 1);
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let mut nodes = node_store();
        let mut leaf = new_leaf(&mut nodes, &[1, 2]);
        let written = nodes.stats().snapshot().nodes_written;

        leaf.delete_key(&mut nodes, 7).unwrap();
        assert_eq!(leaf.size(), 2);
        assert_eq!(nodes.stats().snapshot().nodes_written, written);

        leaf.delete_key(&mut nodes, 2).unwrap();
        assert_eq!(nodes.load_leaf(leaf.page_id()).unwrap().size(), 1);
    }

    #[test]
    fn test_empty_leaf_has_no_max() {
        let mut nodes = node_store();
        let leaf = nodes.new_leaf().unwrap();
        assert!(matches!(leaf.max(), Err(Error::EmptyNode(_))));
    }

    #[test]
    fn test_merge_absorbs_right_neighbour() {
        let mut nodes = node_store();
        let mut right = new_leaf(&mut nodes, &[5, 6]);
        right.next_leaf = Some(PageId::new(50));
        let mut left = new_leaf(&mut nodes, &[1]);
        left.next_leaf = Some(right.page_id());
        let right_id = right.page_id();

        left.merge_nodes(&mut nodes, right).unwrap();

        assert_eq!(keys(&left), vec![1, 5, 6]);
        assert_eq!(left.next_leaf(), Some(PageId::new(50)));
        assert!(matches!(nodes.load(right_id), Err(Error::PageFreed(_))));
    }

    #[test]
    fn test_merge_rejects_non_adjacent() {
        let mut nodes = node_store();
        let right = new_leaf(&mut nodes, &[5]);
        let mut left = new_leaf(&mut nodes, &[1]);

        assert!(matches!(
            left.merge_nodes(&mut nodes, right),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_redistribute_both_directions() {
        let mut nodes = node_store();
        let mut left = new_leaf(&mut nodes, &[1, 2, 3]);
        let mut right = new_leaf(&mut nodes, &[9]);

        // Left sibling gives up its greatest entry
        LeafNode::redistribute_data(&mut nodes, &mut left, &mut right, 0, 1).unwrap();
        assert_eq!(keys(&left), vec![1, 2]);
        assert_eq!(keys(&right), vec![3, 9]);

        // Right sibling gives up its least entry
        LeafNode::redistribute_data(&mut nodes, &mut right, &mut left, 1, 0).unwrap();
        assert_eq!(keys(&left), vec![1, 2, 3]);
        assert_eq!(keys(&right), vec![9]);

        assert_eq!(nodes.load_leaf(right.page_id()).unwrap(), right);
        assert_eq!(nodes.stats().snapshot().redistributions, 2);
    }

    #[test]
    fn test_range_follows_chain() {
        let mut nodes = node_store();
        let mut third = new_leaf(&mut nodes, &[20, 30]);
        third.next_leaf = None;
        let mut second = new_leaf(&mut nodes, &[10, 15]);
        second.next_leaf = Some(third.page_id());
        nodes.dump_leaf(&second).unwrap();
        let mut first = new_leaf(&mut nodes, &[1, 5]);
        first.next_leaf = Some(second.page_id());

        let mut out = Vec::new();
        first
            .range(&nodes, 4, 20, &mut |k, _| out.push(k))
            .unwrap();
        assert_eq!(out, vec![5, 10, 15, 20]);
        assert_eq!(nodes.stats().snapshot().block_accesses, 3);
    }

    #[test]
    fn test_range_stops_at_first_key_past_max() {
        let mut nodes = node_store();
        let mut first = new_leaf(&mut nodes, &[1, 5]);
        // A dangling link is never followed once max is exceeded
        first.next_leaf = Some(PageId::new(999));

        let mut out = Vec::new();
        first.range(&nodes, 0, 3, &mut |k, _| out.push(k)).unwrap();
        assert_eq!(out, vec![1]);
        assert_eq!(nodes.stats().snapshot().block_accesses, 1);
    }
}
