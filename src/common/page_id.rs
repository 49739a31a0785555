//! Page identifier type.

use std::fmt;

/// Identifies a block in the backing store.
///
/// Every B+ tree node lives in exactly one block, so a `PageId` is also the
/// node's locator. Locators are handed out by the store when a node is
/// created and never change for the node's lifetime.
///
/// # Example
/// ```
/// use bplusdb::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID.
    ///
    /// Only ever appears in serialized blocks, where it encodes "no node".
    /// In memory an absent locator is `None`.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Decode a raw on-disk locator, mapping the sentinel to `None`.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<PageId> {
        let page_id = PageId(raw);
        page_id.is_valid().then_some(page_id)
    }

    /// Encode an optional locator, mapping `None` to the sentinel.
    #[inline]
    pub fn to_raw(page_id: Option<PageId>) -> u32 {
        page_id.unwrap_or(Self::INVALID).0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
