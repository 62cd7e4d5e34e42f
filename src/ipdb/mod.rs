//! IPDB Reader
//!
//! Reads the IPDB format: a length-prefixed JSON metadata block followed
//! by a binary trie over address bits and a region of tab-separated leaf
//! records.
//!
//! ## Architecture
//!
//! - **types**: on-disk node layout, constants, address bit access
//! - **format**: header validation and metadata decoding
//! - **tree**: search tree traversal for IP lookups
//! - **record**: leaf record extraction and column decoding
//! - **grow**: materialization of the flat trie into an arena tree

pub mod format;
pub mod grow;
pub mod record;
pub mod tree;
pub mod types;

// Re-export key types
pub use format::{find_start_node, IpdbHeader, Metadata};
pub use grow::{grow_tree, IpTree, NodeId, TreeNode};
pub use record::{raw_record, Record};
pub use tree::SearchTree;
pub use types::IpVersion;
