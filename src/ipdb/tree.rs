//! IPDB Search Tree Traversal
//!
//! The trie lives at the front of the data region as `node_count` fixed-size
//! nodes. Each node holds two records (left and right) that point to either:
//! - Another node (value below `node_count`, continue traversal)
//! - A leaf record (value at or above `node_count`, found)
//!
//! Leaves can be reached before every address bit is consumed, which lets a
//! short prefix cover a whole range of addresses.

use super::format::Metadata;
use super::types::{read_node, AddressBits};
use crate::error::{IpdbError, Result};
use std::net::IpAddr;

/// Search tree for IP address lookups
pub struct SearchTree<'a> {
    /// The data region (nodes followed by leaf records)
    data: &'a [u8],
    /// Decoded metadata
    metadata: &'a Metadata,
    /// Node index where every search begins
    start_from: u32,
}

impl<'a> SearchTree<'a> {
    /// Create a new search tree
    pub fn new(data: &'a [u8], metadata: &'a Metadata, start_from: u32) -> Self {
        Self {
            data,
            metadata,
            start_from,
        }
    }

    /// Look up an IP address, returning its leaf locator
    pub fn search(&self, ip: IpAddr) -> Result<u32> {
        let version = self.metadata.version().ok_or_else(|| {
            IpdbError::CorruptMetadata(format!(
                "unsupported ip_version {}",
                self.metadata.ip_version
            ))
        })?;

        let bits = AddressBits::for_version(ip, version)
            .ok_or(IpdbError::VersionMismatch { expected: version })?;

        let offset = self.descend(&bits)?;
        if offset < self.metadata.node_count {
            return Err(IpdbError::NotFound);
        }

        Ok(offset)
    }

    /// Follow address bits from `start_from` until a leaf or the last bit
    fn descend(&self, bits: &AddressBits) -> Result<u32> {
        let node_count = self.metadata.node_count;
        let mut offset = self.start_from;

        for i in 0..bits.bit_len() {
            if offset >= node_count {
                break;
            }
            offset = self.read_record(offset, bits.bit(i))?;
        }

        Ok(offset)
    }

    /// Read the left (bit 0) or right (bit 1) record of a node
    fn read_record(&self, node: u32, bit: u8) -> Result<u32> {
        read_node(self.data, node)
            .map(|n| n.child(bit))
            .ok_or_else(|| {
                IpdbError::CorruptDatabase(format!(
                    "node {} lies outside the data region ({} bytes)",
                    node,
                    self.data.len()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipdb::types::IpVersion;
    use std::collections::BTreeMap;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn metadata(ip_version: u16, node_count: u32, total_size: usize) -> Metadata {
        Metadata {
            build: 0,
            ip_version,
            languages: BTreeMap::new(),
            node_count,
            total_size: total_size as u64,
            fields: Vec::new(),
        }
    }

    fn nodes(pairs: &[(u32, u32)]) -> Vec<u8> {
        let mut data = Vec::new();
        for (left, right) in pairs {
            data.extend_from_slice(&left.to_be_bytes());
            data.extend_from_slice(&right.to_be_bytes());
        }
        data
    }

    #[test]
    fn test_search_first_bit() {
        // Node 0: left -> leaf 2, right -> node 1; node 1: left -> leaf 3, right -> empty
        let data = nodes(&[(2, 1), (3, 1)]);
        let meta = metadata(1, 2, data.len());
        let tree = SearchTree::new(&data, &meta, 0);

        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(tree.search(ip).unwrap(), 2);

        let ip = IpAddr::V4(Ipv4Addr::new(128, 0, 0, 1));
        assert_eq!(tree.search(ip).unwrap(), 3);
    }

    #[test]
    fn test_search_unresolved_is_not_found() {
        // Right side loops on node 1 forever and never reaches a leaf
        let data = nodes(&[(2, 1), (1, 1)]);
        let meta = metadata(1, 2, data.len());
        let tree = SearchTree::new(&data, &meta, 0);

        let ip = IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1));
        assert_eq!(tree.search(ip), Err(IpdbError::NotFound));
    }

    #[test]
    fn test_version_mismatch() {
        let data = nodes(&[(1, 1)]);
        let v4 = metadata(1, 1, data.len());
        let v6 = metadata(2, 1, data.len());

        let tree = SearchTree::new(&data, &v4, 0);
        assert_eq!(
            tree.search(IpAddr::V6(Ipv6Addr::LOCALHOST)),
            Err(IpdbError::VersionMismatch {
                expected: IpVersion::V4
            })
        );

        let tree = SearchTree::new(&data, &v6, 0);
        assert_eq!(
            tree.search(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            Err(IpdbError::VersionMismatch {
                expected: IpVersion::V6
            })
        );
    }

    #[test]
    fn test_mapped_address_on_ipv4_database() {
        let data = nodes(&[(2, 1), (3, 1)]);
        let meta = metadata(1, 2, data.len());
        let tree = SearchTree::new(&data, &meta, 0);

        let mapped = IpAddr::V6(Ipv4Addr::new(128, 0, 0, 1).to_ipv6_mapped());
        assert_eq!(tree.search(mapped).unwrap(), 3);
        assert_eq!(
            tree.search(mapped),
            tree.search(IpAddr::V4(Ipv4Addr::new(128, 0, 0, 1)))
        );

        // IPv4-compatible (::a.b.c.d) is not mapped
        let compat = IpAddr::V6(Ipv4Addr::new(128, 0, 0, 1).to_ipv6_compatible());
        assert_eq!(
            tree.search(compat),
            Err(IpdbError::VersionMismatch {
                expected: IpVersion::V4
            })
        );
    }

    #[test]
    fn test_unknown_version_is_corrupt_metadata() {
        let data = nodes(&[(1, 1)]);
        let meta = metadata(3, 1, data.len());
        let tree = SearchTree::new(&data, &meta, 0);
        assert!(matches!(
            tree.search(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            Err(IpdbError::CorruptMetadata(_))
        ));
    }

    #[test]
    fn test_pointer_past_data_is_corrupt() {
        // Claims 2 nodes exist but only one is present in the slice
        let data = nodes(&[(1, 1)]);
        let meta = metadata(1, 2, 16);
        let tree = SearchTree::new(&data, &meta, 0);
        assert!(matches!(
            tree.search(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            Err(IpdbError::CorruptDatabase(_))
        ));
    }

    #[test]
    fn test_start_from_leaf_resolves_everything() {
        let data = nodes(&[(2, 2)]);
        let meta = metadata(1, 1, data.len());
        let tree = SearchTree::new(&data, &meta, 5);
        assert_eq!(tree.search(IpAddr::V4(Ipv4Addr::BROADCAST)).unwrap(), 5);
    }
}
