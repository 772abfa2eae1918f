//! This module defines [`MeshBvh`], its flattened node storage and the queries that run
//! against it.
//!
//! [`MeshBvh`]: struct.MeshBvh.html
//!

mod build;
mod bvhcast;
mod closest_point;
mod intersects;
mod mesh_bvh;
mod node;
mod options;
mod raycast;
mod refit;
mod serialize;
mod shapecast;
mod stats;

pub use self::bvhcast::BvhcastVisitor;
pub use self::closest_point::{GeometryHit, PointHit};
pub use self::mesh_bvh::{LeafRange, MeshBvh, MAX_ROOT_TRIANGLES};
pub use self::node::{Node, NodeBuffer, PackedNode, LEAF_FLAG, MAX_LEAF_TRIANGLES, NODE_STRIDE};
pub use self::options::{BuildOptions, ClosestPointOptions, RaycastOptions, SplitStrategy};
pub use self::raycast::RayHit;
pub use self::shapecast::{BoundsHit, ChildOrder, ShapecastVisitor};
pub use self::stats::{BvhStats, TRAVERSAL_COST, TRIANGLE_COST};
pub use crate::ray::Side;
