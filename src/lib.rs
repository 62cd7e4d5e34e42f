//! ipdb - Zero-Copy Reader for IPDB Databases
//!
//! IPDB files map IP addresses to rows of tab-separated, per-language
//! attributes (country, region, city, ...). Lookups walk a binary trie stored
//! directly in the file bytes, so a query costs one pointer read per address
//! bit and no allocation until the record is decoded.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ipdb::Database;
//!
//! let db = Database::open("ipipfree.ipdb")?;
//!
//! // Leaf locator for the address
//! let locator = db.lookup("1.1.1.1")?;
//!
//! // Raw record, borrowed from the mapped file
//! let raw = db.get_raw(locator)?;
//! println!("{}", String::from_utf8_lossy(raw));
//!
//! // Decoded fields for one language
//! for (field, value) in db.get_all_fields_locale(locator, "CN")? {
//!     println!("{}: {}", field, value);
//! }
//! # Ok::<(), ipdb::IpdbError>(())
//! ```
//!
//! # File Layout
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │  u32 BE metadata length              │
//! ├──────────────────────────────────────┤
//! │  JSON metadata                       │
//! ├──────────────────────────────────────┤
//! │  Trie nodes (2 x u32 BE each)        │
//! ├──────────────────────────────────────┤
//! │  Leaf records (u16 BE len + TSV)     │
//! └──────────────────────────────────────┘
//!          ↓ mmap() syscall
//! ┌──────────────────────────────────────┐
//! │  Memory (read-only, shared)          │
//! │  Ready for queries immediately!      │
//! └──────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Database API
pub mod database;
/// Error types for IPDB operations
pub mod error;
/// IPDB format implementation
pub mod ipdb;

// Re-exports for Rust consumers

/// Loaded database and its fluent opener
pub use crate::database::{Database, DatabaseOpener};

pub use crate::error::{IpdbError, Result};
pub use crate::ipdb::{IpTree, IpVersion, Metadata, NodeId, TreeNode};

// Version information
/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
