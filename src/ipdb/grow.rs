//! Trie Materialization
//!
//! Expands the flat node array into an explicit tree held in an arena.
//! Nodes refer to their children by [`NodeId`], so deep or shared subtrees
//! cost neither stack depth nor duplicate allocations: a trie node or leaf
//! reached through several paths is materialized once.

use super::format::Metadata;
use super::record::raw_record;
use super::types::{read_node, AddressBits, IpVersion, TrieNode};
use crate::error::{IpdbError, Result};
use rustc_hash::FxHashMap;
use std::net::IpAddr;

/// Deepest path allowed when the database does not declare a usable version
const MAX_DEPTH: usize = 128;

/// Index of a node inside an [`IpTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// A materialized trie node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode<'a> {
    /// Branch on the next address bit
    Internal {
        /// Subtree for bit 0
        left: NodeId,
        /// Subtree for bit 1
        right: NodeId,
    },
    /// End of a branch
    Leaf {
        /// Locator the flat trie stored for this leaf
        locator: u32,
        /// Raw tab-separated record, borrowed from the database
        data: &'a [u8],
    },
}

/// Navigable tree built from the flat trie
#[derive(Debug, Clone)]
pub struct IpTree<'a> {
    nodes: Vec<TreeNode<'a>>,
    root: NodeId,
    leaf_count: usize,
    version: Option<IpVersion>,
}

impl<'a> IpTree<'a> {
    /// The node searches start from
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node by id
    pub fn node(&self, id: NodeId) -> &TreeNode<'a> {
        &self.nodes[id.0]
    }

    /// Number of distinct nodes (internal and leaf)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a grown tree has at least a root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct leaves
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Address family the tree was grown for, `None` if the database
    /// declares an unknown version
    pub fn ip_version(&self) -> Option<IpVersion> {
        self.version
    }

    /// Number of distinct internal nodes
    pub fn internal_count(&self) -> usize {
        self.nodes.len() - self.leaf_count
    }

    /// Follow the bits of `ip` from the root to a leaf
    ///
    /// Addresses are accepted the same way as by a database search:
    /// IPv4-mapped IPv6 addresses walk an IPv4 tree as IPv4. Returns the
    /// leaf's locator and record, or `None` if the address family does not
    /// match or the address bits run out on an internal node.
    pub fn walk(&self, ip: IpAddr) -> Option<(u32, &'a [u8])> {
        let bits = AddressBits::for_version(ip, self.version?)?;
        let mut current = self.root;
        for i in 0..bits.bit_len() {
            match self.node(current) {
                TreeNode::Internal { left, right } => {
                    current = if bits.bit(i) == 0 { *left } else { *right };
                }
                TreeNode::Leaf { .. } => break,
            }
        }

        match self.node(current) {
            TreeNode::Leaf { locator, data } => Some((*locator, *data)),
            TreeNode::Internal { .. } => None,
        }
    }
}

/// Pending internal node on the explicit stack
struct Frame {
    index: u32,
    depth: usize,
    node: TrieNode,
    left: Option<NodeId>,
}

struct Grower<'a, 'm> {
    data: &'a [u8],
    metadata: &'m Metadata,
    nodes: Vec<TreeNode<'a>>,
    internal_ids: FxHashMap<u32, NodeId>,
    leaf_ids: FxHashMap<u32, NodeId>,
}

impl<'a, 'm> Grower<'a, 'm> {
    fn push(&mut self, node: TreeNode<'a>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn read(&self, index: u32) -> Result<TrieNode> {
        if index >= self.metadata.node_count {
            return Err(IpdbError::NotInternalNode(index));
        }
        read_node(self.data, index).ok_or_else(|| {
            IpdbError::CorruptDatabase(format!("node {} lies outside the data region", index))
        })
    }

    /// Id of an already materialized child, creating leaves on demand.
    /// `None` means the child is an internal node not yet expanded.
    fn resolve(&mut self, pointer: u32) -> Result<Option<NodeId>> {
        if pointer < self.metadata.node_count {
            return Ok(self.internal_ids.get(&pointer).copied());
        }
        if let Some(&id) = self.leaf_ids.get(&pointer) {
            return Ok(Some(id));
        }

        let data = raw_record(self.data, self.metadata, pointer)?;
        let id = self.push(TreeNode::Leaf {
            locator: pointer,
            data,
        });
        self.leaf_ids.insert(pointer, id);
        Ok(Some(id))
    }
}

/// Materialize the trie below `start_from`
pub fn grow_tree<'a>(data: &'a [u8], metadata: &Metadata, start_from: u32) -> Result<IpTree<'a>> {
    let version = metadata.version();
    let max_depth = version.map_or(MAX_DEPTH, |v| v.bit_len());

    let mut grower = Grower {
        data,
        metadata,
        nodes: Vec::new(),
        internal_ids: FxHashMap::default(),
        leaf_ids: FxHashMap::default(),
    };

    let mut stack = vec![Frame {
        index: start_from,
        depth: 0,
        node: grower.read(start_from)?,
        left: None,
    }];
    let mut returned: Option<NodeId> = None;

    while let Some(frame) = stack.last_mut() {
        let pointer = if frame.left.is_none() {
            frame.node.left.get()
        } else {
            frame.node.right.get()
        };

        let child = match returned.take() {
            Some(id) => id,
            None => match grower.resolve(pointer)? {
                Some(id) => id,
                None => {
                    let depth = frame.depth + 1;
                    if depth >= max_depth {
                        return Err(IpdbError::CorruptDatabase(format!(
                            "trie deeper than {} bits below node {}",
                            max_depth, start_from
                        )));
                    }
                    let node = grower.read(pointer)?;
                    stack.push(Frame {
                        index: pointer,
                        depth,
                        node,
                        left: None,
                    });
                    continue;
                }
            },
        };

        match frame.left {
            None => frame.left = Some(child),
            Some(left) => {
                let index = frame.index;
                stack.pop();
                let id = grower.push(TreeNode::Internal { left, right: child });
                grower.internal_ids.insert(index, id);
                returned = Some(id);
            }
        }
    }

    let root = returned.ok_or(IpdbError::NotInternalNode(start_from))?;
    let leaf_count = grower.leaf_ids.len();
    tracing::debug!(
        internal = grower.internal_ids.len(),
        leaves = leaf_count,
        start_from,
        "materialized trie"
    );

    Ok(IpTree {
        nodes: grower.nodes,
        root,
        leaf_count,
        version,
    })
}
