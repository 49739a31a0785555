//! The tree driver: owns the root locator and turns public calls into one
//! call on the root node.

use std::io::Write;

use tracing::debug;

use crate::common::{Error, Key, PageId, RecordId, Result, TreeConfig};
use crate::storage::page::{Page, PageHeader, PageType};
use crate::storage::BlockStore;

use super::internal::InternalNode;
use super::node::Node;
use super::node_store::NodeStore;
use super::stats::{StatsSnapshot, TreeStats};

/// Meta block layout, after the common page header.
const META_MAGIC: u32 = 0x4250_5452; // "BPTR"
const OFFSET_MAGIC: usize = PageHeader::SIZE;
const OFFSET_FANOUT: usize = OFFSET_MAGIC + 4;
const OFFSET_ROOT: usize = OFFSET_FANOUT + 4;

/// A B+ tree whose nodes live in a [`BlockStore`].
///
/// The tree keeps only two locators in memory: its meta block (fanout and
/// root, rewritten whenever the root changes) and the root itself. Every
/// operation loads nodes on the way down and persists them before it
/// returns, so the store always holds the complete tree.
///
/// # Example
/// ```
/// use bplusdb::{BPlusTree, MemoryBlockStore, RecordId, TreeConfig};
///
/// let mut tree = BPlusTree::create(MemoryBlockStore::new(), TreeConfig::new(4)).unwrap();
/// for key in [10, 20, 5, 15, 25, 1] {
///     tree.insert(key, RecordId::new(key as u64)).unwrap();
/// }
/// tree.delete(20).unwrap();
///
/// let keys: Vec<i64> = tree.range(1, 25).unwrap().into_iter().map(|(k, _)| k).collect();
/// assert_eq!(keys, vec![1, 5, 10, 15, 25]);
/// ```
pub struct BPlusTree<S: BlockStore> {
    nodes: NodeStore<S>,
    meta_page: PageId,
    root: PageId,
}

impl<S: BlockStore> BPlusTree<S> {
    /// Build an empty tree: a meta block and an empty root leaf.
    pub fn create(mut store: S, config: TreeConfig) -> Result<Self> {
        config.validate()?;

        let meta_page = store.allocate_block()?;
        let mut nodes = NodeStore::new(store, config);
        let root = nodes.new_leaf()?;
        nodes.dump_leaf(&root)?;

        let mut tree = Self {
            nodes,
            meta_page,
            root: root.page_id(),
        };
        tree.write_meta()?;
        debug!(meta = %meta_page, root = %tree.root, fanout = config.fanout, "created tree");
        Ok(tree)
    }

    /// Reopen a tree from its meta block.
    pub fn open(store: S, meta_page: PageId) -> Result<Self> {
        let page = store.read_block(meta_page)?;
        let header = page.header();
        if header.page_type != PageType::Meta || page.read_u32(OFFSET_MAGIC) != META_MAGIC {
            return Err(Error::Corruption(format!("{} is not a tree meta block", meta_page)));
        }
        if !page.verify_checksum() {
            return Err(Error::Corruption(format!("meta block {} failed checksum", meta_page)));
        }

        let config = TreeConfig::new(page.read_u32(OFFSET_FANOUT) as usize);
        config.validate()?;
        let root = PageId::from_raw(page.read_u32(OFFSET_ROOT)).ok_or_else(|| {
            Error::Corruption(format!("meta block {} has no root", meta_page))
        })?;

        debug!(meta = %meta_page, %root, fanout = config.fanout, "opened tree");
        Ok(Self {
            nodes: NodeStore::new(store, config),
            meta_page,
            root,
        })
    }

    fn write_meta(&mut self) -> Result<()> {
        let mut page = Page::new();
        page.set_header(&PageHeader::new(PageType::Meta));
        page.write_u32(OFFSET_MAGIC, META_MAGIC);
        page.write_u32(OFFSET_FANOUT, self.nodes.config().fanout as u32);
        page.write_u32(OFFSET_ROOT, self.root.0);
        page.update_checksum();
        self.nodes.store_mut().write_block(self.meta_page, &page)
    }

    fn set_root(&mut self, root: PageId) -> Result<()> {
        debug!(old = %self.root, new = %root, "replaced root");
        self.root = root;
        self.write_meta()
    }

    /// Insert `key` unless it is already present (an existing record is not
    /// replaced). Grows the tree by one level if the root splits.
    pub fn insert(&mut self, key: Key, record: RecordId) -> Result<()> {
        let mut root = self.nodes.load(self.root)?;
        let Some(sibling) = root.insert_key(&mut self.nodes, key, record)? else {
            return Ok(());
        };

        let left_max = root.max(&self.nodes)?;
        let new_root_id = self.nodes.new_internal()?.page_id();
        let new_root =
            InternalNode::from_parts(new_root_id, vec![root.page_id(), sibling], vec![left_max]);
        self.nodes.dump_internal(&new_root)?;
        self.set_root(new_root.page_id())
    }

    /// Delete `key` if present. Shrinks the tree by one level when an
    /// internal root is left with a single child.
    pub fn delete(&mut self, key: Key) -> Result<()> {
        let mut root = self.nodes.load(self.root)?;
        root.delete_key(&mut self.nodes, key)?;

        if let Some(child) = root.single_child_ptr() {
            let old_root = self.root;
            self.set_root(child)?;
            self.nodes.delete_node(old_root)?;
        }
        Ok(())
    }

    /// Call `emit` for every entry with `min <= key <= max`, in key order.
    pub fn range_with(
        &self,
        min: Key,
        max: Key,
        mut emit: impl FnMut(Key, RecordId),
    ) -> Result<()> {
        let root = self.nodes.load(self.root)?;
        root.range(&self.nodes, min, max, &mut emit)
    }

    /// Every entry with `min <= key <= max`, in key order.
    pub fn range(&self, min: Key, max: Key) -> Result<Vec<(Key, RecordId)>> {
        let mut out = Vec::new();
        self.range_with(min, max, |key, record| out.push((key, record)))?;
        Ok(out)
    }

    /// Write the record locator of each matching entry, one per line.
    pub fn write_range<W: Write>(&self, min: Key, max: Key, out: &mut W) -> Result<()> {
        let mut result = Ok(());
        self.range_with(min, max, |_, record| {
            if result.is_ok() {
                result = writeln!(out, "{}", record);
            }
        })?;
        Ok(result?)
    }

    /// Point lookup, as a one-key range scan.
    pub fn get(&self, key: Key) -> Result<Option<RecordId>> {
        let mut found = None;
        self.range_with(key, key, |_, record| found = Some(record))?;
        Ok(found)
    }

    /// Number of entries, counted along the leaf chain.
    pub fn len(&self) -> Result<usize> {
        let mut count = 0;
        let mut next = Some(self.leftmost_leaf()?);
        while let Some(page_id) = next {
            let leaf = self.nodes.load_leaf(page_id)?;
            count += leaf.size();
            next = leaf.next_leaf();
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.nodes.load_leaf(self.leftmost_leaf()?)?.size() == 0)
    }

    /// Levels from root to leaf; a lone root leaf is height 1.
    pub fn height(&self) -> Result<usize> {
        let mut height = 1;
        let mut node = self.nodes.load(self.root)?;
        while let Node::Internal(internal) = node {
            height += 1;
            node = self.nodes.load(internal.children()[0])?;
        }
        Ok(height)
    }

    pub(crate) fn leftmost_leaf(&self) -> Result<PageId> {
        let mut page_id = self.root;
        while let Node::Internal(internal) = self.nodes.load(page_id)? {
            page_id = internal.children()[0];
        }
        Ok(page_id)
    }

    pub fn root(&self) -> PageId {
        self.root
    }

    pub fn meta_page(&self) -> PageId {
        self.meta_page
    }

    pub fn config(&self) -> &TreeConfig {
        self.nodes.config()
    }

    pub fn stats(&self) -> &TreeStats {
        self.nodes.stats()
    }

    /// Block accesses counted since the last reset.
    pub fn block_accesses(&self) -> u64 {
        self.stats().snapshot().block_accesses
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats().snapshot()
    }

    pub(crate) fn nodes(&self) -> &NodeStore<S> {
        &self.nodes
    }

    #[cfg(test)]
    pub(crate) fn nodes_mut(&mut self) -> &mut NodeStore<S> {
        &mut self.nodes
    }

    pub fn store(&self) -> &S {
        self.nodes.store()
    }

    pub fn into_store(self) -> S {
        self.nodes.into_store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBlockStore;

    fn tree(fanout: usize) -> BPlusTree<MemoryBlockStore> {
        BPlusTree::create(MemoryBlockStore::new(), TreeConfig::new(fanout)).unwrap()
    }

    fn keys(tree: &BPlusTree<MemoryBlockStore>) -> Vec<Key> {
        tree.range(Key::MIN, Key::MAX)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect()
    }

    #[test]
    fn test_create_rejects_bad_fanout() {
        assert!(matches!(
            BPlusTree::create(MemoryBlockStore::new(), TreeConfig::new(2)),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_tree() {
        let tree = tree(4);
        assert!(tree.is_empty().unwrap());
        assert_eq!(tree.len().unwrap(), 0);
        assert_eq!(tree.height().unwrap(), 1);
        assert!(tree.range(0, 100).unwrap().is_empty());
        assert_eq!(tree.get(5).unwrap(), None);
    }

    #[test]
    fn test_root_split_grows_height() {
        let mut tree = tree(4);
        for key in 1..=4 {
            tree.insert(key, RecordId(key as u64)).unwrap();
        }
        assert_eq!(tree.height().unwrap(), 1);

        let old_root = tree.root();
        tree.insert(5, RecordId(5)).unwrap();
        assert_eq!(tree.height().unwrap(), 2);
        assert_ne!(tree.root(), old_root);
        assert_eq!(keys(&tree), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_root_collapse_frees_old_root() {
        let mut tree = tree(4);
        for key in 1..=5 {
            tree.insert(key, RecordId(key as u64)).unwrap();
        }
        let internal_root = tree.root();

        tree.delete(5).unwrap();
        tree.delete(4).unwrap();
        assert_eq!(tree.height().unwrap(), 1);
        assert_ne!(tree.root(), internal_root);
        assert!(matches!(
            tree.store().read_block(internal_root),
            Err(Error::PageFreed(_))
        ));
        assert_eq!(keys(&tree), vec![1, 2, 3]);
    }

    #[test]
    fn test_get_and_duplicate_insert() {
        let mut tree = tree(4);
        tree.insert(7, RecordId(70)).unwrap();
        tree.insert(7, RecordId(71)).unwrap();

        assert_eq!(tree.get(7).unwrap(), Some(RecordId(70)));
        assert_eq!(tree.len().unwrap(), 1);
    }

    #[test]
    fn test_write_range() {
        let mut tree = tree(4);
        for key in [3, 1, 2] {
            tree.insert(key, RecordId(key as u64 * 100)).unwrap();
        }

        let mut out = Vec::new();
        tree.write_range(2, 3, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "200\n300\n");
    }

    #[test]
    fn test_reopen_from_meta_block() {
        let mut tree = tree(5);
        for key in 0..40 {
            tree.insert(key, RecordId(key as u64)).unwrap();
        }
        let meta = tree.meta_page();
        let root = tree.root();

        let reopened = BPlusTree::open(tree.into_store(), meta).unwrap();
        assert_eq!(reopened.root(), root);
        assert_eq!(reopened.config().fanout, 5);
        assert_eq!(reopened.len().unwrap(), 40);
    }

    #[test]
    fn test_open_rejects_non_meta_block() {
        let tree = tree(4);
        let root = tree.root();
        assert!(matches!(
            BPlusTree::open(tree.into_store(), root),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_block_accesses_count_range_visits() {
        let mut tree = tree(4);
        for key in 1..=5 {
            tree.insert(key, RecordId(key as u64)).unwrap();
        }
        tree.stats().reset();

        // Root, then both leaves
        tree.range(1, 5).unwrap();
        assert_eq!(tree.block_accesses(), 3);

        tree.stats().reset();
        tree.range(1, 1).unwrap();
        assert_eq!(tree.block_accesses(), 2);
    }
}
