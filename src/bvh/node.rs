//! Flattened node storage.
//!
//! A tree is stored depth-first as an array of 32 byte [`PackedNode`] records. The left
//! child of an internal node is the next record, the right child is found through a forward
//! byte offset stored in the node. Leaves are tagged with [`LEAF_FLAG`] and reference a
//! contiguous range of the (possibly indirect) triangle buffer.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::aabb::Aabb;
use crate::axis::Axis;
use crate::error::{BvhError, Result};
use crate::Real;

/// Size of a node record in bytes.
pub const NODE_STRIDE: usize = std::mem::size_of::<PackedNode>();

/// Value of [`PackedNode::flags`] that marks a leaf.
pub const LEAF_FLAG: u16 = 0xFFFF;

/// Maximum number of triangles a single leaf can reference.
pub const MAX_LEAF_TRIANGLES: usize = u16::MAX as usize - 1;

/// A node record as stored in the flattened buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PackedNode {
    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`
    pub bounds: [Real; 6],
    /// Leaf: position of the first triangle. Internal: byte offset from this record to the
    /// right child.
    pub offset: u32,
    /// Leaf: triangle count. Internal: split axis.
    pub count_or_axis: u16,
    /// [`LEAF_FLAG`] for leaves, zero for internal nodes.
    pub flags: u16,
}

impl PackedNode {
    /// Creates a leaf record.
    pub fn leaf(bounds: &Aabb, offset: u32, count: u16) -> PackedNode {
        PackedNode {
            bounds: bounds.to_array(),
            offset,
            count_or_axis: count,
            flags: LEAF_FLAG,
        }
    }

    /// Creates an internal record. `right_offset` is the byte distance to the right child.
    pub fn internal(bounds: &Aabb, right_offset: u32, split_axis: Axis) -> PackedNode {
        PackedNode {
            bounds: bounds.to_array(),
            offset: right_offset,
            count_or_axis: split_axis as u16,
            flags: 0,
        }
    }

    /// Returns a copy with every field in little endian byte order.
    pub(crate) fn native_to_le(self) -> PackedNode {
        PackedNode {
            bounds: self.bounds.map(|b| Real::from_bits(b.to_bits().to_le())),
            offset: self.offset.to_le(),
            count_or_axis: self.count_or_axis.to_le(),
            flags: self.flags.to_le(),
        }
    }

    /// Inverse of [`PackedNode::native_to_le`].
    pub(crate) fn le_to_native(self) -> PackedNode {
        PackedNode {
            bounds: self.bounds.map(|b| Real::from_bits(u32::from_le(b.to_bits()))),
            offset: u32::from_le(self.offset),
            count_or_axis: u16::from_le(self.count_or_axis),
            flags: u16::from_le(self.flags),
        }
    }
}

/// Decoded view of a record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Node {
    /// A leaf over `count` triangles starting at buffer position `offset`.
    Leaf {
        /// Position of the first triangle.
        offset: u32,
        /// Number of triangles.
        count: u16,
    },
    /// An internal node with two children.
    Internal {
        /// Record index of the left child.
        left: usize,
        /// Record index of the right child.
        right: usize,
        /// Axis the triangles were split along.
        split_axis: Axis,
    },
}

/// One flattened tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeBuffer {
    nodes: Vec<PackedNode>,
}

impl NodeBuffer {
    /// Wraps already encoded records without validation.
    pub(crate) fn from_records(nodes: Vec<PackedNode>) -> NodeBuffer {
        NodeBuffer { nodes }
    }

    /// Decodes a buffer from raw records and checks that it forms a valid tree over
    /// `triangle_count` triangles.
    pub fn from_records_checked(
        nodes: Vec<PackedNode>,
        triangle_count: usize,
    ) -> Result<NodeBuffer> {
        let buffer = NodeBuffer { nodes };
        buffer.check(triangle_count)?;
        Ok(buffer)
    }

    /// Decodes a buffer from native endian record bytes as returned by
    /// [`NodeBuffer::as_bytes`].
    pub fn from_bytes(bytes: &[u8], triangle_count: usize) -> Result<NodeBuffer> {
        if bytes.len() % NODE_STRIDE != 0 {
            return Err(BvhError::InvalidFormat("node data is not a multiple of the record size"));
        }
        let nodes = bytes
            .chunks_exact(NODE_STRIDE)
            .map(bytemuck::pod_read_unaligned::<PackedNode>)
            .collect();
        NodeBuffer::from_records_checked(nodes, triangle_count)
    }

    /// Walks the records depth first. Every right child must start right after the left
    /// subtree, every record must be reached exactly once and the leaves must cover one
    /// contiguous triangle range.
    fn check(&self, triangle_count: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(BvhError::InvalidFormat("empty node buffer"));
        }

        let mut next = 0;
        let mut triangle_end = None;
        let mut pending = vec![0];
        while let Some(expected) = pending.pop() {
            if expected != next || next >= self.nodes.len() {
                return Err(BvhError::InvalidFormat("node records do not form a tree"));
            }
            let index = next;
            let node = &self.nodes[index];
            next += 1;

            if node.flags == LEAF_FLAG {
                let start = node.offset as usize;
                let end = start + node.count_or_axis as usize;
                if end > triangle_count {
                    return Err(BvhError::InvalidFormat("leaf range exceeds the triangle count"));
                }
                if triangle_end.is_some_and(|previous| previous != start) {
                    return Err(BvhError::InvalidFormat("leaf ranges are not contiguous"));
                }
                triangle_end = Some(end);
                continue;
            }

            if node.flags != 0 {
                return Err(BvhError::InvalidFormat("unknown node flag"));
            }
            if Axis::from_index(node.count_or_axis as usize).is_none() {
                return Err(BvhError::InvalidFormat("invalid split axis"));
            }
            let offset = node.offset as usize;
            if offset % NODE_STRIDE != 0 || offset < 2 * NODE_STRIDE {
                return Err(BvhError::InvalidFormat("right child offset is not forward"));
            }
            pending.push(index + offset / NODE_STRIDE);
            pending.push(index + 1);
        }

        if next != self.nodes.len() {
            return Err(BvhError::InvalidFormat("node records do not form a tree"));
        }
        Ok(())
    }

    /// Triangle positions covered by the leaves of this tree.
    pub fn triangle_range(&self) -> Range<u32> {
        if self.nodes.is_empty() {
            return 0..0;
        }
        let mut first = 0;
        while !self.is_leaf(first) {
            first += 1;
        }
        let mut last = 0;
        while !self.is_leaf(last) {
            last = self.internal(last).1;
        }
        let (start, _) = self.leaf(first);
        let (offset, count) = self.leaf(last);
        start..offset + count as u32
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the buffer holds no records.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Raw records.
    pub fn records(&self) -> &[PackedNode] {
        &self.nodes
    }

    /// Native endian bytes of all records.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Returns true if record `node` is a leaf.
    #[inline]
    pub fn is_leaf(&self, node: usize) -> bool {
        self.nodes[node].flags == LEAF_FLAG
    }

    /// Triangle range of leaf `node` as `(offset, count)`.
    #[inline]
    pub fn leaf(&self, node: usize) -> (u32, u16) {
        let record = &self.nodes[node];
        debug_assert!(record.flags == LEAF_FLAG);
        (record.offset, record.count_or_axis)
    }

    /// Children and split axis of internal `node` as `(left, right, split_axis)`.
    #[inline]
    pub fn internal(&self, node: usize) -> (usize, usize, Axis) {
        let record = &self.nodes[node];
        debug_assert!(record.flags != LEAF_FLAG);
        let right = node + record.offset as usize / NODE_STRIDE;
        let split_axis = match record.count_or_axis {
            0 => Axis::X,
            1 => Axis::Y,
            _ => Axis::Z,
        };
        (node + 1, right, split_axis)
    }

    /// Copies the bounds of `node` into `out`.
    #[inline]
    pub fn read_bounds(&self, node: usize, out: &mut [Real; 6]) {
        *out = self.nodes[node].bounds;
    }

    /// Bounds of `node`.
    #[inline]
    pub fn bounds(&self, node: usize) -> Aabb {
        Aabb::from_array(&self.nodes[node].bounds)
    }

    /// Decoded view of `node`.
    pub fn node(&self, node: usize) -> Node {
        if self.is_leaf(node) {
            let (offset, count) = self.leaf(node);
            Node::Leaf { offset, count }
        } else {
            let (left, right, split_axis) = self.internal(node);
            Node::Internal {
                left,
                right,
                split_axis,
            }
        }
    }

    /// Overwrites the bounds of `node`.
    pub(crate) fn set_bounds(&mut self, node: usize, bounds: &Aabb) {
        self.nodes[node].bounds = bounds.to_array();
    }
}
