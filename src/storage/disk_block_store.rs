//! File-backed block store.

use std::collections::HashSet;
use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};
use crate::storage::{BlockStore, DiskManager};

/// Stores blocks as pages of a single database file.
///
/// # Free Pages
/// The file never shrinks. A freed block is overwritten with a
/// [`PageType::Free`] header and its locator is pushed on a free list that
/// `allocate_block` drains first. The free list is not stored separately:
/// [`open`](DiskBlockStore::open) rebuilds it by scanning page headers.
///
/// # Locking
/// ```text
/// ┌──────────────────────────────┐
/// │        DiskBlockStore        │
/// │  disk: Mutex<DiskManager> ◀──┼── read_block(&self) seeks the file
/// │  free_list: Vec<PageId>      │
/// │  freed: HashSet<PageId>      │
/// └──────────────────────────────┘
/// ```
/// Reading needs `&mut File`, but loading a node should only need a shared
/// borrow of the store, so the disk manager sits behind a mutex.
pub struct DiskBlockStore {
    disk: Mutex<DiskManager>,

    /// Freed pages, reused LIFO.
    free_list: Vec<PageId>,

    /// Same contents as `free_list`.
    freed: HashSet<PageId>,
}

impl DiskBlockStore {
    /// Create a new, empty database file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_disk_manager(DiskManager::create(path)?))
    }

    /// Open an existing database file and rebuild its free list.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut disk = DiskManager::open(path)?;

        let mut free_list = Vec::new();
        for raw in 0..disk.page_count() {
            let page_id = PageId::new(raw);
            if disk.read_page(page_id)?.header().page_type == PageType::Free {
                free_list.push(page_id);
            }
        }
        debug!(
            pages = disk.page_count(),
            free = free_list.len(),
            "opened block store"
        );

        let freed = free_list.iter().copied().collect();
        Ok(Self {
            disk: Mutex::new(disk),
            free_list,
            freed,
        })
    }

    /// Wrap an already opened disk manager holding no free pages.
    pub fn from_disk_manager(disk: DiskManager) -> Self {
        Self {
            disk: Mutex::new(disk),
            free_list: Vec::new(),
            freed: HashSet::new(),
        }
    }

    /// Enable or disable `fsync()` after each write.
    pub fn set_sync_on_write(&mut self, sync: bool) {
        self.disk.get_mut().set_sync_on_write(sync);
    }

    /// Number of pages in the file, free or not.
    pub fn page_count(&self) -> u32 {
        self.disk.lock().page_count()
    }

    /// Number of pages waiting on the free list.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    fn check_live(&self, page_id: PageId) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }
        if self.freed.contains(&page_id) {
            return Err(Error::PageFreed(page_id.0));
        }
        Ok(())
    }
}

impl BlockStore for DiskBlockStore {
    fn allocate_block(&mut self) -> Result<PageId> {
        let disk = self.disk.get_mut();

        let page_id = match self.free_list.pop() {
            Some(page_id) => {
                self.freed.remove(&page_id);
                disk.write_page(page_id, &Page::new())?;
                page_id
            }
            None => disk.allocate_page()?,
        };

        trace!(%page_id, "allocated block");
        Ok(page_id)
    }

    fn read_block(&self, page_id: PageId) -> Result<Page> {
        self.check_live(page_id)?;
        self.disk.lock().read_page(page_id)
    }

    fn write_block(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.check_live(page_id)?;
        self.disk.get_mut().write_page(page_id, page)
    }

    fn free_block(&mut self, page_id: PageId) -> Result<()> {
        self.check_live(page_id)?;

        let disk = self.disk.get_mut();
        if page_id.0 >= disk.page_count() {
            return Err(Error::PageNotFound(page_id.0));
        }

        let mut tombstone = Page::new();
        tombstone.set_header(&PageHeader::new(PageType::Free));
        tombstone.update_checksum();
        disk.write_page(page_id, &tombstone)?;

        self.free_list.push(page_id);
        self.freed.insert(page_id);
        trace!(%page_id, "freed block");
        Ok(())
    }

    fn live_blocks(&self) -> usize {
        self.page_count() as usize - self.free_list.len()
    }
}
