//! Block encoding of tree nodes.
//!
//! # Layout
//! ```text
//! Offset  Size       Field
//! ------  ---------  -----
//! 0       13         PageHeader (BTreeLeaf | BTreeInternal, crc32, lsn)
//! 13      4          size
//!
//! leaf:
//! 17      4          next_leaf (PageId::INVALID = last leaf)
//! 21      16 × size  (key i64, record u64), ascending by key
//!
//! internal:
//! 17      4 × size        children
//! ..      8 × (size - 1)  separator keys
//! ```
//! All integers little-endian. The checksum covers the whole page.

use std::collections::BTreeMap;

use crate::common::config::{
    INTERNAL_PREFIX_SIZE, LEAF_ENTRY_SIZE, LEAF_PREFIX_SIZE, MAX_FANOUT, PAGE_SIZE,
};
use crate::common::{Error, PageId, RecordId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

use super::internal::InternalNode;
use super::leaf::LeafNode;
use super::node::Node;

const OFFSET_SIZE: usize = PageHeader::SIZE;
const OFFSET_NEXT_LEAF: usize = OFFSET_SIZE + 4;

/// Most entries a leaf block can physically hold.
const LEAF_SLOTS: usize = (PAGE_SIZE - LEAF_PREFIX_SIZE) / LEAF_ENTRY_SIZE;

/// Most children an internal block can physically hold.
const INTERNAL_SLOTS: usize = (PAGE_SIZE - INTERNAL_PREFIX_SIZE + 8) / 12;

impl Node {
    /// Decode the node stored at `page_id`.
    ///
    /// Fails with [`Error::Corruption`] if the checksum is wrong, the block
    /// is not a node, or its size fields do not fit the block.
    pub fn decode(page_id: PageId, page: &Page) -> Result<Node> {
        let header = page.header();
        if !header.page_type.is_node() {
            return Err(Error::Corruption(format!(
                "{} holds a {:?} page, not a tree node",
                page_id, header.page_type
            )));
        }
        if !page.verify_checksum() {
            return Err(Error::Corruption(format!("{} failed checksum", page_id)));
        }

        let size = page.read_u32(OFFSET_SIZE) as usize;
        match header.page_type {
            PageType::BTreeLeaf => decode_leaf(page_id, page, size).map(Node::Leaf),
            _ => decode_internal(page_id, page, size).map(Node::Internal),
        }
    }
}

impl LeafNode {
    pub(crate) fn encode(&self) -> Result<Page> {
        let size = self.size();
        if size > LEAF_SLOTS.min(MAX_FANOUT) {
            return Err(Error::NodeTooLarge {
                size,
                max: MAX_FANOUT,
            });
        }

        let mut page = start_page(PageType::BTreeLeaf, size);
        page.write_u32(OFFSET_NEXT_LEAF, PageId::to_raw(self.next_leaf()));

        let mut offset = LEAF_PREFIX_SIZE;
        for (&key, record) in self.entries() {
            page.write_i64(offset, key);
            page.write_u64(offset + 8, record.0);
            offset += LEAF_ENTRY_SIZE;
        }

        page.update_checksum();
        Ok(page)
    }
}

impl InternalNode {
    pub(crate) fn encode(&self) -> Result<Page> {
        let size = self.size();
        if size > INTERNAL_SLOTS.min(MAX_FANOUT) {
            return Err(Error::NodeTooLarge {
                size,
                max: MAX_FANOUT,
            });
        }
        if size == 0 || self.keys().len() + 1 != size {
            return Err(Error::InvariantViolation(format!(
                "{} has {} children and {} keys",
                self.page_id(),
                size,
                self.keys().len()
            )));
        }

        let mut page = start_page(PageType::BTreeInternal, size);

        let mut offset = INTERNAL_PREFIX_SIZE;
        for child in self.children() {
            page.write_u32(offset, child.0);
            offset += 4;
        }
        for &key in self.keys() {
            page.write_i64(offset, key);
            offset += 8;
        }

        page.update_checksum();
        Ok(page)
    }
}

fn start_page(page_type: PageType, size: usize) -> Page {
    let mut page = Page::new();
    page.set_header(&PageHeader::new(page_type));
    page.write_u32(OFFSET_SIZE, size as u32);
    page
}

fn decode_leaf(page_id: PageId, page: &Page, size: usize) -> Result<LeafNode> {
    if size > LEAF_SLOTS {
        return Err(Error::Corruption(format!(
            "leaf {} claims {} entries",
            page_id, size
        )));
    }

    let next_leaf = PageId::from_raw(page.read_u32(OFFSET_NEXT_LEAF));
    let mut entries = BTreeMap::new();
    let mut offset = LEAF_PREFIX_SIZE;
    for _ in 0..size {
        let key = page.read_i64(offset);
        let record = RecordId(page.read_u64(offset + 8));
        entries.insert(key, record);
        offset += LEAF_ENTRY_SIZE;
    }
    if entries.len() != size {
        return Err(Error::Corruption(format!(
            "leaf {} has duplicate keys",
            page_id
        )));
    }

    Ok(LeafNode::from_parts(page_id, entries, next_leaf))
}

fn decode_internal(page_id: PageId, page: &Page, size: usize) -> Result<InternalNode> {
    if size == 0 || size > INTERNAL_SLOTS {
        return Err(Error::Corruption(format!(
            "internal node {} claims {} children",
            page_id, size
        )));
    }

    let mut offset = INTERNAL_PREFIX_SIZE;
    let mut children = Vec::with_capacity(size);
    for _ in 0..size {
        let child = PageId::from_raw(page.read_u32(offset)).ok_or_else(|| {
            Error::Corruption(format!("internal node {} has a null child", page_id))
        })?;
        children.push(child);
        offset += 4;
    }

    let mut keys = Vec::with_capacity(size - 1);
    for _ in 0..size - 1 {
        keys.push(page.read_i64(offset));
        offset += 8;
    }

    Ok(InternalNode::from_parts(page_id, children, keys))
}
