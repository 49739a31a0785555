//! In-memory block store.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::BlockStore;

/// Keeps every block in a `HashMap`, keyed by locator.
///
/// Freed locators go on a LIFO free list and are reused by the next
/// allocation, the same way the disk store recycles pages. This store is
/// what unit tests and property tests run against.
#[derive(Default)]
pub struct MemoryBlockStore {
    /// Live blocks.
    blocks: HashMap<PageId, Box<Page>>,

    /// Locators released by `free_block`, reused LIFO.
    free_list: Vec<PageId>,

    /// Same contents as `free_list`, for O(1) "was this freed" checks.
    freed: HashSet<PageId>,

    /// Next never-used locator.
    next_page_id: u32,
}

impl MemoryBlockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of locators ever handed out, including freed ones.
    pub fn allocated_blocks(&self) -> u32 {
        self.next_page_id
    }
}

impl BlockStore for MemoryBlockStore {
    fn allocate_block(&mut self) -> Result<PageId> {
        let page_id = match self.free_list.pop() {
            Some(page_id) => {
                self.freed.remove(&page_id);
                page_id
            }
            None => {
                if !PageId::new(self.next_page_id).is_valid() {
                    return Err(Error::InvalidPageId(self.next_page_id));
                }
                let page_id = PageId::new(self.next_page_id);
                self.next_page_id += 1;
                page_id
            }
        };

        self.blocks.insert(page_id, Box::new(Page::new()));
        trace!(%page_id, "allocated block");
        Ok(page_id)
    }

    fn read_block(&self, page_id: PageId) -> Result<Page> {
        match self.blocks.get(&page_id) {
            Some(stored) => {
                let mut page = Page::new();
                page.copy_from(stored);
                Ok(page)
            }
            None if self.freed.contains(&page_id) => Err(Error::PageFreed(page_id.0)),
            None => Err(Error::PageNotFound(page_id.0)),
        }
    }

    fn write_block(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        match self.blocks.get_mut(&page_id) {
            Some(stored) => {
                stored.copy_from(page);
                Ok(())
            }
            None if self.freed.contains(&page_id) => Err(Error::PageFreed(page_id.0)),
            None => Err(Error::PageNotFound(page_id.0)),
        }
    }

    fn free_block(&mut self, page_id: PageId) -> Result<()> {
        if self.blocks.remove(&page_id).is_none() {
            return Err(if self.freed.contains(&page_id) {
                Error::PageFreed(page_id.0)
            } else {
                Error::PageNotFound(page_id.0)
            });
        }

        self.free_list.push(page_id);
        self.freed.insert(page_id);
        trace!(%page_id, "freed block");
        Ok(())
    }

    fn live_blocks(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_sequential() {
        let mut store = MemoryBlockStore::new();
        assert_eq!(store.allocate_block().unwrap(), PageId::new(0));
        assert_eq!(store.allocate_block().unwrap(), PageId::new(1));
        assert_eq!(store.live_blocks(), 2);
        assert_eq!(store.allocated_blocks(), 2);
    }

    #[test]
    fn test_write_and_read_block() {
        let mut store = MemoryBlockStore::new();
        let pid = store.allocate_block().unwrap();

        let mut page = Page::new();
        page.write_u32(40, 99);
        store.write_block(pid, &page).unwrap();

        let read = store.read_block(pid).unwrap();
        assert_eq!(read.read_u32(40), 99);
    }

    #[test]
    fn test_read_unallocated_block() {
        let store = MemoryBlockStore::new();
        assert!(matches!(
            store.read_block(PageId::new(3)),
            Err(Error::PageNotFound(3))
        ));
    }

    #[test]
    fn test_freed_block_cannot_be_read_or_written() {
        let mut store = MemoryBlockStore::new();
        let pid = store.allocate_block().unwrap();
        store.free_block(pid).unwrap();

        assert_eq!(store.live_blocks(), 0);
        assert!(matches!(store.read_block(pid), Err(Error::PageFreed(_))));
        assert!(matches!(
            store.write_block(pid, &Page::new()),
            Err(Error::PageFreed(_))
        ));
        assert!(matches!(store.free_block(pid), Err(Error::PageFreed(_))));
    }

    #[test]
    fn test_freed_block_is_recycled_zeroed() {
        let mut store = MemoryBlockStore::new();
        let pid = store.allocate_block().unwrap();

        let mut page = Page::new();
        page.write_u32(40, 99);
        store.write_block(pid, &page).unwrap();
        store.free_block(pid).unwrap();

        let again = store.allocate_block().unwrap();
        assert_eq!(again, pid);
        assert_eq!(store.read_block(again).unwrap().read_u32(40), 0);
        assert_eq!(store.allocated_blocks(), 1);
    }
}
