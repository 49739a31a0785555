//! Key and record locator types stored in the index.

use std::fmt;

/// Index key.
///
/// Keys are totally ordered and encode to a fixed 8 bytes on disk.
pub type Key = i64;

/// Opaque locator of a record in some heap file.
///
/// The index never looks inside it; it only stores, moves and emits it.
///
/// # Example
/// ```
/// use bplusdb::RecordId;
///
/// let rid = RecordId::new(0x2a);
/// assert_eq!(rid.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Create a new RecordId.
    #[inline]
    pub fn new(id: u64) -> Self {
        RecordId(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(RecordId)
    }
}
