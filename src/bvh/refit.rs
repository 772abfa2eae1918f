//! Bounds update after vertex motion.

use std::collections::HashSet;

use log::debug;

use crate::aabb::{Aabb, Bounded};
use crate::bvh::mesh_bvh::MeshBvh;
use crate::bvh::node::NodeBuffer;
use crate::geometry::TriangleMesh;

struct RefitContext<'a> {
    mesh: &'a TriangleMesh,
    indirect: Option<&'a [u32]>,
    dirty: Option<&'a HashSet<u32>>,
    leaves_updated: usize,
}

impl RefitContext<'_> {
    fn leaf_bounds(&mut self, offset: u32, count: u16) -> Option<Aabb> {
        let indirect = self.indirect;
        let faces = (offset..offset + count as u32).map(move |position| match indirect {
            Some(indirect) => indirect[position as usize],
            None => position,
        });
        if let Some(dirty) = self.dirty {
            if !faces.clone().any(|face| dirty.contains(&face)) {
                return None;
            }
        }
        self.leaves_updated += 1;
        let mesh = self.mesh;
        Some(faces.fold(Aabb::empty(), |aabb, face| {
            aabb.join(&mesh.triangle(face as usize).aabb())
        }))
    }

    /// Recomputes the bounds below `node`. Returns true if the bounds of `node` changed.
    fn refit_node(&mut self, root: &mut NodeBuffer, node: usize) -> bool {
        let bounds = if root.is_leaf(node) {
            let (offset, count) = root.leaf(node);
            match self.leaf_bounds(offset, count) {
                Some(bounds) => bounds,
                None => return false,
            }
        } else {
            let (left, right, _) = root.internal(node);
            let left_changed = self.refit_node(root, left);
            let right_changed = self.refit_node(root, right);
            if !left_changed && !right_changed {
                return false;
            }
            root.bounds(left).join(&root.bounds(right))
        };

        if bounds == root.bounds(node) {
            return false;
        }
        root.set_bounds(node, &bounds);
        true
    }
}

impl MeshBvh {
    /// Recomputes the node bounds from the current vertex positions of `mesh`. The triangle
    /// topology must be the one the hierarchy was built for.
    ///
    /// With `dirty`, only leaves referencing one of the given triangle indices are
    /// recomputed. Returns true if any bounds changed.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::bvh::{BuildOptions, MeshBvh};
    /// use mesh_bvh::geometry::TriangleMesh;
    /// use mesh_bvh::Point3;
    ///
    /// let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mut mesh = TriangleMesh::from_flat(positions, None).unwrap();
    /// let mut bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
    ///
    /// mesh.set_position(2, Point3::new(0.0, 5.0, 0.0));
    /// assert!(bvh.refit(&mesh, None));
    /// assert_eq!(bvh.bounding_box().max.y, 5.0);
    /// assert!(!bvh.refit(&mesh, None));
    /// ```
    pub fn refit(&mut self, mesh: &TriangleMesh, dirty: Option<&HashSet<u32>>) -> bool {
        let mut context = RefitContext {
            mesh,
            indirect: self.indirect.as_deref(),
            dirty,
            leaves_updated: 0,
        };
        let mut changed = false;
        for root in self.roots.iter_mut().filter(|root| !root.is_empty()) {
            changed |= context.refit_node(root, 0);
        }
        debug!("refit {} leaves, bounds changed: {}", context.leaves_updated, changed);
        changed
    }
}
