//! Structural statistics and consistency checks.

use crate::aabb::Bounded;
use crate::bvh::mesh_bvh::MeshBvh;
use crate::bvh::node::NodeBuffer;
use crate::geometry::TriangleMesh;
use crate::{Real, EPSILON};

/// Cost of visiting a node relative to [`TRIANGLE_COST`].
pub const TRAVERSAL_COST: Real = 1.0;

/// Cost of testing one triangle.
pub const TRIANGLE_COST: Real = 1.25;

/// Summary of the shape of a [`MeshBvh`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BvhStats {
    /// Number of roots.
    pub roots: usize,
    /// Number of node records over all roots.
    pub nodes: usize,
    /// Number of leaves over all roots.
    pub leaves: usize,
    /// Number of triangles referenced by leaves.
    pub triangles: usize,
    /// Depth of the shallowest leaf.
    pub min_leaf_depth: u32,
    /// Depth of the deepest leaf.
    pub max_leaf_depth: u32,
    /// Largest number of triangles in one leaf.
    pub max_leaf_triangles: usize,
    /// Expected cost of a random ray query, weighted by node surface area relative to the
    /// root.
    pub sah_cost: Real,
}

impl Default for BvhStats {
    fn default() -> BvhStats {
        BvhStats {
            roots: 0,
            nodes: 0,
            leaves: 0,
            triangles: 0,
            min_leaf_depth: u32::MAX,
            max_leaf_depth: 0,
            max_leaf_triangles: 0,
            sah_cost: 0.0,
        }
    }
}

impl BvhStats {
    fn add_node(&mut self, root: &NodeBuffer, node: usize, depth: u32, root_area: Real) {
        self.nodes += 1;
        let area = root.bounds(node).surface_area();
        let weight = if root_area > 0.0 { area / root_area } else { 1.0 };

        if root.is_leaf(node) {
            let (_, count) = root.leaf(node);
            self.leaves += 1;
            self.triangles += count as usize;
            self.min_leaf_depth = self.min_leaf_depth.min(depth);
            self.max_leaf_depth = self.max_leaf_depth.max(depth);
            self.max_leaf_triangles = self.max_leaf_triangles.max(count as usize);
            self.sah_cost += weight * TRIANGLE_COST * count as Real;
        } else {
            self.sah_cost += weight * TRAVERSAL_COST;
            let (left, right, _) = root.internal(node);
            self.add_node(root, left, depth + 1, root_area);
            self.add_node(root, right, depth + 1, root_area);
        }
    }
}

impl MeshBvh {
    /// Collects statistics over every root.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::bvh::{BuildOptions, MeshBvh};
    /// use mesh_bvh::geometry::TriangleMesh;
    ///
    /// let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mut mesh = TriangleMesh::from_flat(positions, None).unwrap();
    /// let stats = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap().stats();
    /// assert_eq!((stats.nodes, stats.leaves, stats.triangles), (1, 1, 1));
    /// ```
    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats::default();
        for root in self.roots.iter().filter(|root| !root.is_empty()) {
            stats.roots += 1;
            let root_area = root.bounds(0).surface_area();
            stats.add_node(root, 0, 0, root_area);
        }
        if stats.leaves == 0 {
            stats.min_leaf_depth = 0;
        }
        stats
    }

    /// Returns true if every node box contains its children and every leaf box contains its
    /// triangles in the current state of `mesh`.
    pub fn validate_bounds(&self, mesh: &TriangleMesh) -> bool {
        self.roots
            .iter()
            .filter(|root| !root.is_empty())
            .all(|root| self.validate_node(mesh, root, 0))
    }

    fn validate_node(&self, mesh: &TriangleMesh, root: &NodeBuffer, node: usize) -> bool {
        let bounds = root.bounds(node);
        if root.is_leaf(node) {
            let (offset, count) = root.leaf(node);
            return self
                .leaf_range(mesh, offset, count)
                .triangles()
                .all(|(_, triangle)| bounds.approx_contains_aabb_eps(&triangle.aabb(), EPSILON));
        }
        let (left, right, _) = root.internal(node);
        bounds.approx_contains_aabb_eps(&root.bounds(left), EPSILON)
            && bounds.approx_contains_aabb_eps(&root.bounds(right), EPSILON)
            && self.validate_node(mesh, root, left)
            && self.validate_node(mesh, root, right)
    }
}
