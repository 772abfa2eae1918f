//! A crate which builds bounding volume hierarchies over triangle meshes and answers
//! spatial queries against them.
//!
//! ## About
//!
//! A [`MeshBvh`] partitions the triangles of a [`TriangleMesh`] into a binary tree of
//! axis-aligned bounding boxes. The tree is stored as a flat array of fixed size records so
//! that traversal never allocates. On top of the generic [`shapecast`] traversal the crate
//! provides ray casts, closest point queries, box/sphere/mesh intersection tests and
//! BVH-vs-BVH overlap tests. When vertices move, [`MeshBvh::refit`] updates the bounds
//! without rebuilding the tree.
//!
//! The [`character`] module uses these queries to move a capsule shaped character over a
//! static mesh.
//!
//! ## Example
//!
//! ```
//! use mesh_bvh::bvh::{BuildOptions, MeshBvh, RaycastOptions};
//! use mesh_bvh::geometry::TriangleMesh;
//! use mesh_bvh::ray::Ray;
//! use mesh_bvh::{Point3, Vector3};
//!
//! // A 10x10 quad in the XZ plane.
//! let positions = vec![
//!     -5.0, 0.0, -5.0, //
//!     5.0, 0.0, -5.0, //
//!     5.0, 0.0, 5.0, //
//!     -5.0, 0.0, 5.0,
//! ];
//! let indices = vec![0, 2, 1, 0, 3, 2];
//! let mut mesh = TriangleMesh::from_flat(positions, Some(indices)).unwrap();
//! let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
//!
//! let ray = Ray::new(Point3::new(0.0, 10.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
//! let hit = bvh.raycast_first(&mesh, &ray, &RaycastOptions::default()).unwrap();
//! assert!((hit.distance - 10.0).abs() < 1e-5);
//! ```
//!
//! ## Features
//!
//! - `rayon` (default **enabled**) - computes triangle bounds in parallel while building
//! - `serde` (default **disabled**) - adds `Serialize` and `Deserialize` implementations for
//!   the configuration types
//!
//! [`MeshBvh`]: bvh::MeshBvh
//! [`MeshBvh::refit`]: bvh::MeshBvh::refit
//! [`TriangleMesh`]: geometry::TriangleMesh
//! [`shapecast`]: bvh::MeshBvh::shapecast

/// Float type used by this crate.
pub type Real = f32;

/// Point math type used by this crate. Type alias for [`nalgebra::Point3`].
pub type Point3 = nalgebra::Point3<Real>;

/// Vector math type used by this crate. Type alias for [`nalgebra::Vector3`].
pub type Vector3 = nalgebra::Vector3<Real>;

/// Rigid transform type used by this crate. Type alias for [`nalgebra::Isometry3`].
pub type Isometry3 = nalgebra::Isometry3<Real>;

/// A minimal floating value used as a lower bound.
pub const EPSILON: Real = 0.00001;

pub mod aabb;
pub mod axis;
pub mod bvh;
pub mod character;
pub mod error;
pub mod geometry;
pub mod ray;
pub mod shapes;
mod utils;

#[cfg(test)]
mod testbase;

pub use error::{BvhError, Result};
