//! Error types returned by fallible operations of this crate.
//!
//! Queries never fail: the absence of a hit is expressed with [`Option`] or an empty
//! [`Vec`]. Errors only come from malformed input geometry, from invalid configuration and
//! from decoding a serialized [`MeshBvh`].
//!
//! [`MeshBvh`]: crate::bvh::MeshBvh

use thiserror::Error;

/// Unified error type of this crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BvhError {
    /// The geometry has no vertex positions.
    #[error("geometry has no position data")]
    MissingPositions,

    /// The flat position buffer length is not a multiple of three.
    #[error("position buffer length {len} is not a multiple of 3")]
    InvalidPositionLength {
        /// Length of the supplied buffer.
        len: usize,
    },

    /// The index buffer length is not a multiple of three.
    #[error("index buffer length {len} is not a multiple of 3")]
    InvalidIndexLength {
        /// Length of the supplied buffer.
        len: usize,
    },

    /// An index references a vertex that does not exist.
    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// The offending index value.
        index: u32,
        /// Number of vertices in the position buffer.
        vertex_count: usize,
    },

    /// A draw group does not lie within the triangle range of the geometry.
    #[error("group {start}..{end} is outside of the {triangle_count} triangles of the geometry")]
    InvalidGroup {
        /// First triangle of the group.
        start: u32,
        /// One past the last triangle of the group.
        end: u32,
        /// Number of triangles in the geometry.
        triangle_count: usize,
    },

    /// A configuration value is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The serialized data is not a valid BVH.
    #[error("invalid serialized bvh: {0}")]
    InvalidFormat(&'static str),

    /// The serialized data uses a format version this crate cannot read.
    #[error("unsupported serialized bvh version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version tag found in the data.
        found: u16,
        /// Version tag written by this crate.
        expected: u16,
    },

    /// The serialized BVH was built for a geometry with a different triangle count.
    #[error("serialized bvh covers {expected} triangles but the geometry has {found}")]
    TriangleCountMismatch {
        /// Triangle count recorded in the serialized data.
        expected: usize,
        /// Triangle count of the supplied geometry.
        found: usize,
    },
}

/// Convenience alias for `Result<T, BvhError>`.
pub type Result<T> = std::result::Result<T, BvhError>;
