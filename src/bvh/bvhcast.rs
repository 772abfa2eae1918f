//! Hierarchy versus hierarchy traversal.

use crate::aabb::{Aabb, Bounded};
use crate::bvh::mesh_bvh::MeshBvh;
use crate::bvh::node::NodeBuffer;
use crate::geometry::TriangleMesh;
use crate::shapes::Triangle;
use crate::Isometry3;

/// Callback of [`MeshBvh::bvhcast`], called for every pair of triangles whose leaves
/// overlap.
pub trait BvhcastVisitor {
    /// `triangle` belongs to this mesh, `other` to the other mesh and has already been moved
    /// into the space of this mesh. Returning `true` stops the traversal.
    fn intersects_triangles(
        &mut self,
        triangle: &Triangle,
        other: &Triangle,
        face_index: u32,
        other_face_index: u32,
    ) -> bool;
}

struct Pair<'a> {
    mesh: &'a TriangleMesh,
    other: &'a MeshBvh,
    other_mesh: &'a TriangleMesh,
    other_to_self: &'a Isometry3,
}

impl MeshBvh {
    /// Descends this hierarchy and `other` at the same time and reports every pair of
    /// triangles from overlapping leaves to `visitor`. `other_to_self` maps the space of
    /// `other_mesh` into the space of `mesh`. Returns `true` if the visitor stopped the
    /// traversal.
    pub fn bvhcast<V: BvhcastVisitor>(
        &self,
        mesh: &TriangleMesh,
        other: &MeshBvh,
        other_mesh: &TriangleMesh,
        other_to_self: &Isometry3,
        visitor: &mut V,
    ) -> bool {
        let pair = Pair {
            mesh,
            other,
            other_mesh,
            other_to_self,
        };
        for root in self.roots.iter().filter(|root| !root.is_empty()) {
            for other_root in other.roots.iter().filter(|root| !root.is_empty()) {
                if self.bvhcast_nodes(&pair, root, 0, other_root, 0, visitor) {
                    return true;
                }
            }
        }
        false
    }

    fn bvhcast_nodes<V: BvhcastVisitor>(
        &self,
        pair: &Pair<'_>,
        root: &NodeBuffer,
        node: usize,
        other_root: &NodeBuffer,
        other_node: usize,
        visitor: &mut V,
    ) -> bool {
        let bounds = root.bounds(node);
        let other_bounds = other_root.bounds(other_node).transformed(pair.other_to_self);
        if !bounds.intersects(&other_bounds) {
            return false;
        }

        match (root.is_leaf(node), other_root.is_leaf(other_node)) {
            (true, true) => {
                self.bvhcast_leaves(pair, root, node, other_root, other_node, &bounds, visitor)
            }
            (false, true) => {
                self.bvhcast_descend_self(pair, root, node, other_root, other_node, visitor)
            }
            (true, false) => {
                self.bvhcast_descend_other(pair, root, node, other_root, other_node, visitor)
            }
            (false, false) => {
                if bounds.surface_area() >= other_bounds.surface_area() {
                    self.bvhcast_descend_self(pair, root, node, other_root, other_node, visitor)
                } else {
                    self.bvhcast_descend_other(pair, root, node, other_root, other_node, visitor)
                }
            }
        }
    }

    fn bvhcast_descend_self<V: BvhcastVisitor>(
        &self,
        pair: &Pair<'_>,
        root: &NodeBuffer,
        node: usize,
        other_root: &NodeBuffer,
        other_node: usize,
        visitor: &mut V,
    ) -> bool {
        let (left, right, _) = root.internal(node);
        self.bvhcast_nodes(pair, root, left, other_root, other_node, visitor)
            || self.bvhcast_nodes(pair, root, right, other_root, other_node, visitor)
    }

    fn bvhcast_descend_other<V: BvhcastVisitor>(
        &self,
        pair: &Pair<'_>,
        root: &NodeBuffer,
        node: usize,
        other_root: &NodeBuffer,
        other_node: usize,
        visitor: &mut V,
    ) -> bool {
        let (left, right, _) = other_root.internal(other_node);
        self.bvhcast_nodes(pair, root, node, other_root, left, visitor)
            || self.bvhcast_nodes(pair, root, node, other_root, right, visitor)
    }

    #[allow(clippy::too_many_arguments)]
    fn bvhcast_leaves<V: BvhcastVisitor>(
        &self,
        pair: &Pair<'_>,
        root: &NodeBuffer,
        node: usize,
        other_root: &NodeBuffer,
        other_node: usize,
        bounds: &Aabb,
        visitor: &mut V,
    ) -> bool {
        let (offset, count) = root.leaf(node);
        let (other_offset, other_count) = other_root.leaf(other_node);
        let range = self.leaf_range(pair.mesh, offset, count);
        let other_range = pair.other.leaf_range(pair.other_mesh, other_offset, other_count);

        for (other_face, other_triangle) in other_range.triangles() {
            let other_triangle = other_triangle.transformed(pair.other_to_self);
            if !other_triangle.aabb().intersects(bounds) {
                continue;
            }
            for (face, triangle) in range.triangles() {
                if visitor.intersects_triangles(&triangle, &other_triangle, face, other_face) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::aabb::Bounded;
    use crate::bvh::{BuildOptions, BvhcastVisitor, MeshBvh};
    use crate::shapes::Triangle;
    use crate::testbase::{quad_mesh, random_triangle_soup};
    use crate::{Isometry3, Vector3};

    /// Collects pairs of triangles whose boxes overlap.
    #[derive(Default)]
    struct OverlappingPairs(HashSet<(u32, u32)>);

    impl BvhcastVisitor for OverlappingPairs {
        fn intersects_triangles(
            &mut self,
            a: &Triangle,
            b: &Triangle,
            face: u32,
            other_face: u32,
        ) -> bool {
            if a.aabb().intersects(&b.aabb()) {
                self.0.insert((face, other_face));
            }
            false
        }
    }

    #[test]
    fn test_bvhcast_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut mesh = random_triangle_soup(&mut rng, 200, 10.0);
        let options = BuildOptions::default().with_max_leaf_tris(4);
        let bvh = MeshBvh::build(&mut mesh, &options).unwrap();
        let mut other_mesh = random_triangle_soup(&mut rng, 150, 10.0);
        let other_options = BuildOptions::default().with_indirect(true);
        let other = MeshBvh::build(&mut other_mesh, &other_options).unwrap();
        let transform = Isometry3::new(Vector3::new(1.0, -2.0, 0.5), Vector3::new(0.3, 0.0, 0.8));

        let mut visitor = OverlappingPairs::default();
        assert!(!bvh.bvhcast(&mesh, &other, &other_mesh, &transform, &mut visitor));

        let mut expected = HashSet::new();
        for (i, a) in mesh.triangles().enumerate() {
            for (j, b) in other_mesh.triangles().enumerate() {
                if a.aabb().intersects(&b.transformed(&transform).aabb()) {
                    expected.insert((i as u32, j as u32));
                }
            }
        }
        assert!(!expected.is_empty());
        assert_eq!(visitor.0, expected);
    }

    struct StopAtFirst(usize);

    impl BvhcastVisitor for StopAtFirst {
        fn intersects_triangles(&mut self, a: &Triangle, b: &Triangle, _: u32, _: u32) -> bool {
            self.0 += 1;
            a.intersects_triangle(b)
        }
    }

    #[test]
    fn test_bvhcast_stops() {
        let mut mesh = quad_mesh();
        let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
        let mut other_mesh = quad_mesh();
        let other = MeshBvh::build(&mut other_mesh, &BuildOptions::default()).unwrap();

        // Standing upright through the floor.
        let upright = Isometry3::new(Vector3::zeros(), Vector3::x() * std::f32::consts::FRAC_PI_2);
        let mut visitor = StopAtFirst(0);
        assert!(bvh.bvhcast(&mesh, &other, &other_mesh, &upright, &mut visitor));

        let far = Isometry3::translation(0.0, 20.0, 0.0);
        let mut visitor = StopAtFirst(0);
        assert!(!bvh.bvhcast(&mesh, &other, &other_mesh, &far, &mut visitor));
        assert_eq!(visitor.0, 0);
    }
}
