//! Error types for bplusdb.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the block store and the B+ tree.
///
/// Duplicate inserts and deletes of missing keys are not errors; they are
/// silent no-ops. Everything here means the operation could not complete.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested block was never allocated.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// Requested block was released by a merge or root collapse.
    ///
    /// A freed locator must never be dereferenced again, so hitting this
    /// means a surviving node still points at a destroyed one.
    #[error("Page {0} has been freed")]
    PageFreed(u32),

    /// The sentinel page ID was passed where a real block was expected.
    #[error("Invalid page ID: {0}")]
    InvalidPageId(u32),

    /// A persisted block failed to decode (checksum, type tag or sizes).
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// A node has more entries than fit in one block.
    #[error("node with {size} entries does not fit in a page (max {max})")]
    NodeTooLarge { size: usize, max: usize },

    /// Tree configuration rejected by [`TreeConfig::validate`].
    ///
    /// [`TreeConfig::validate`]: crate::common::config::TreeConfig::validate
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `max()` was requested from a leaf that holds no entries.
    #[error("leaf {0} is empty")]
    EmptyNode(u32),

    /// The rebalancing logic reached a state a well-formed tree never has.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
