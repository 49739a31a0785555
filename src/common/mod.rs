//! Common types and utilities shared across bplusdb.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration (page size, tree fanout)
//! - Error types
//! - Identifiers (PageId, Key, RecordId)

pub mod config;
pub mod error;
mod page_id;
mod record_id;

pub use config::TreeConfig;
pub use error::{Error, Result};
pub use page_id::PageId;
pub use record_id::{Key, RecordId};
