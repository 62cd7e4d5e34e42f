//! IPDB Binary Format Parsing
//!
//! ```text
//! offset 0..4              metadata length (u32, big-endian)
//! offset 4..4+meta_len     metadata (UTF-8 JSON object)
//! offset 4+meta_len..end   data region, exactly `total_size` bytes
//!   [0 .. node_count*8)    trie nodes, two u32 BE records each
//!   [node_count*8 .. end)  leaf records, u16 BE length + tab-separated text
//! ```
//!
//! Only the metadata is decoded here; the data region stays in the
//! caller's buffer and is addressed by offset.

use super::types::{
    read_node, IpVersion, HEADER_LEN, IPV4_MAPPED_ONES_START, IPV4_PREFIX_BITS, NODE_BYTES,
};
use crate::error::{IpdbError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zerocopy::byteorder::big_endian::U32;
use zerocopy::FromBytes;

/// Decoded metadata block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Build time, seconds since the Unix epoch
    pub build: i64,
    /// Raw IP version discriminator (1 = IPv4, 2 = IPv6)
    pub ip_version: u16,
    /// Language code to the column where its field block begins
    pub languages: BTreeMap<String, usize>,
    /// Number of internal trie nodes
    pub node_count: u32,
    /// Length of the data region in bytes
    pub total_size: u64,
    /// Field names, in column order within a language block
    pub fields: Vec<String>,
}

impl Metadata {
    /// Parsed IP version, `None` if the discriminator is not 1 or 2
    pub fn version(&self) -> Option<IpVersion> {
        IpVersion::from_raw(self.ip_version)
    }

    /// Position of `field` within a language block
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }
}

/// Parsed file layout: metadata plus where the data region begins
#[derive(Debug, Clone)]
pub struct IpdbHeader {
    /// Decoded metadata
    pub metadata: Metadata,
    /// Offset of the data region within the file
    pub data_offset: usize,
}

impl IpdbHeader {
    /// Validate the file layout and decode the metadata block
    pub fn from_file(file: &[u8]) -> Result<Self> {
        let size = file.len() as u64;
        if file.len() < HEADER_LEN {
            return Err(IpdbError::FileSize {
                size,
                required: HEADER_LEN as u64,
            });
        }

        let (meta_len, _) = U32::read_from_prefix(file)
            .map_err(|_| IpdbError::CorruptMetadata("unreadable length prefix".to_string()))?;
        let meta_len = meta_len.get() as usize;
        let data_offset = HEADER_LEN + meta_len;

        if file.len() < data_offset {
            return Err(IpdbError::FileSize {
                size,
                required: data_offset as u64,
            });
        }

        let metadata: Metadata = serde_json::from_slice(&file[HEADER_LEN..data_offset])?;

        let required = (data_offset as u64).checked_add(metadata.total_size).ok_or_else(|| {
            IpdbError::CorruptMetadata(format!("total_size {} overflows", metadata.total_size))
        })?;
        if size != required {
            return Err(IpdbError::FileSize { size, required });
        }

        let tree_size = metadata.node_count as u64 * NODE_BYTES as u64;
        if tree_size > metadata.total_size {
            return Err(IpdbError::CorruptMetadata(format!(
                "node_count {} needs {} bytes but data region is {} bytes",
                metadata.node_count, tree_size, metadata.total_size
            )));
        }

        Ok(IpdbHeader {
            metadata,
            data_offset,
        })
    }
}

/// Find where searches begin
///
/// IPv4 databases are stored as IPv6-shaped tries with the IPv4 space hung
/// under `::ffff:0:0/96`. That prefix is walked once here (80 zero bits, then
/// 16 one bits) so that each IPv4 query only has to consume its own 32 bits.
/// The walk stops as soon as it reaches a leaf.
pub fn find_start_node(data: &[u8], metadata: &Metadata) -> Result<u32> {
    if metadata.version() != Some(IpVersion::V4) {
        return Ok(0);
    }

    let node_count = metadata.node_count;
    let mut offset = 0u32;
    for i in 0..IPV4_PREFIX_BITS {
        if offset >= node_count {
            break;
        }
        let bit = u8::from(i >= IPV4_MAPPED_ONES_START);
        let node = read_node(data, offset).ok_or_else(|| {
            IpdbError::CorruptDatabase(format!("node {} lies outside the data region", offset))
        })?;
        offset = node.child(bit);
    }

    Ok(offset)
}
