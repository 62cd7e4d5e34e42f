//! IPDB-specific Type Definitions
//!
//! On-disk node layout, address family handling and the constants that
//! describe the binary format.

use std::net::IpAddr;
use zerocopy::byteorder::big_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Size of the big-endian metadata length prefix
pub const HEADER_LEN: usize = 4;

/// Size of a trie node (two 32-bit records)
pub const NODE_BYTES: usize = 8;

/// Size of a single child record inside a node
pub const RECORD_BYTES: usize = 4;

/// Size of the big-endian length prefix in front of each leaf record
pub const RECORD_LEN_BYTES: usize = 2;

/// Column separator inside a leaf record
pub const COLUMN_SEPARATOR: u8 = b'\t';

/// Bits walked from the root of an IPv6-shaped trie to reach `::ffff:0:0/96`
pub const IPV4_PREFIX_BITS: usize = 96;

/// First bit of the IPv4-mapped prefix that is set (bits 80..96 are ones)
pub const IPV4_MAPPED_ONES_START: usize = 80;

/// IP version of a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    /// IPv4 database, 32-bit queries
    V4,
    /// IPv6 database, 128-bit queries
    V6,
}

impl IpVersion {
    /// Interpret the `ip_version` metadata value (1 = IPv4, 2 = IPv6)
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            1 => Some(IpVersion::V4),
            2 => Some(IpVersion::V6),
            _ => None,
        }
    }

    /// Number of address bits consumed by a search
    pub fn bit_len(self) -> usize {
        match self {
            IpVersion::V4 => 32,
            IpVersion::V6 => 128,
        }
    }
}

/// One trie node as stored in the data region
///
/// Pointers below `node_count` are node indices; anything at or above it is
/// a leaf locator.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct TrieNode {
    /// Child for address bit 0
    pub left: U32,
    /// Child for address bit 1
    pub right: U32,
}

impl TrieNode {
    /// Child pointer selected by `bit` (0 = left, anything else = right)
    #[inline]
    pub fn child(&self, bit: u8) -> u32 {
        if bit == 0 {
            self.left.get()
        } else {
            self.right.get()
        }
    }
}

/// Read the node at `index`, or `None` if it lies outside `data`
#[inline]
pub fn read_node(data: &[u8], index: u32) -> Option<TrieNode> {
    let start = (index as usize).checked_mul(NODE_BYTES)?;
    let bytes = data.get(start..)?;
    TrieNode::read_from_prefix(bytes).ok().map(|(node, _)| node)
}

/// Read the 2-byte record length at `pos`
#[inline]
pub fn read_record_len(data: &[u8], pos: usize) -> Option<usize> {
    let bytes = data.get(pos..)?;
    U16::read_from_prefix(bytes)
        .ok()
        .map(|(len, _)| len.get() as usize)
}

/// Address octets in network order, MSB first
#[derive(Debug, Clone, Copy)]
pub(crate) enum AddressBits {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl AddressBits {
    pub(crate) fn from_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(addr) => AddressBits::V4(addr.octets()),
            IpAddr::V6(addr) => AddressBits::V6(addr.octets()),
        }
    }

    /// Address bits as a database of `version` consumes them
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are narrowed to IPv4 for
    /// IPv4 databases. `None` if the family still does not match.
    pub(crate) fn for_version(ip: IpAddr, version: IpVersion) -> Option<Self> {
        let bits = match (ip, version) {
            (IpAddr::V6(addr), IpVersion::V4) => {
                AddressBits::V4(addr.to_ipv4_mapped()?.octets())
            }
            _ => AddressBits::from_ip(ip),
        };
        (bits.version() == version).then_some(bits)
    }

    pub(crate) fn version(&self) -> IpVersion {
        match self {
            AddressBits::V4(_) => IpVersion::V4,
            AddressBits::V6(_) => IpVersion::V6,
        }
    }

    fn octets(&self) -> &[u8] {
        match self {
            AddressBits::V4(o) => o,
            AddressBits::V6(o) => o,
        }
    }

    /// Bit `i` counted from the most significant bit of the first octet
    #[inline]
    pub(crate) fn bit(&self, i: usize) -> u8 {
        (self.octets()[i >> 3] >> (7 - (i % 8))) & 0x01
    }

    pub(crate) fn bit_len(&self) -> usize {
        self.version().bit_len()
    }
}
