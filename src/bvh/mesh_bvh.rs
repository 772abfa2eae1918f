//! The [`MeshBvh`] type and its construction.

use log::{debug, warn};

use crate::aabb::Aabb;
use crate::bvh::build::{build_primitives, build_tree};
use crate::bvh::node::NodeBuffer;
use crate::bvh::options::BuildOptions;
use crate::error::Result;
use crate::geometry::TriangleMesh;
use crate::shapes::Triangle;

/// Maximum number of triangles under a single root. Larger groups are split across several
/// roots so that byte offsets stay within `u32`.
pub const MAX_ROOT_TRIANGLES: usize = 1 << 25;

/// A bounding volume hierarchy over the triangles of a [`TriangleMesh`].
///
/// The hierarchy does not own the mesh. Every query takes the mesh it was built for; passing
/// another mesh gives meaningless results.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBvh {
    pub(crate) roots: Vec<NodeBuffer>,
    pub(crate) indirect: Option<Vec<u32>>,
    pub(crate) triangle_count: usize,
}

impl MeshBvh {
    /// Builds a hierarchy over `mesh`.
    ///
    /// Unless [`BuildOptions::indirect`] is set, the index buffer of `mesh` is reordered to
    /// match the leaf order (an index buffer is created for non-indexed meshes).
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::bvh::{BuildOptions, MeshBvh};
    /// use mesh_bvh::geometry::TriangleMesh;
    ///
    /// let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mut mesh = TriangleMesh::from_flat(positions, None).unwrap();
    /// let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
    /// assert_eq!(bvh.roots().len(), 1);
    /// assert!(mesh.is_indexed());
    /// ```
    pub fn build(mesh: &mut TriangleMesh, options: &BuildOptions) -> Result<MeshBvh> {
        options.validate()?;

        let triangle_count = mesh.triangle_count();
        let mut roots = Vec::new();
        let mut indirect = if options.indirect {
            Some((0..triangle_count as u32).collect::<Vec<_>>())
        } else {
            None
        };
        let mut depth_limited_leaves = 0;
        let mut median_fallbacks = 0;
        let mut max_depth = 0;

        for range in mesh.triangle_ranges() {
            let mut start = range.start;
            while start < range.end {
                let end = range.end.min(start + MAX_ROOT_TRIANGLES as u32);
                let mut primitives = build_primitives(mesh, start..end);
                let (buffer, report) = build_tree(&mut primitives, start, options);
                depth_limited_leaves += report.depth_limited_leaves;
                median_fallbacks += report.median_fallbacks;
                max_depth = max_depth.max(report.max_depth);

                let order = primitives.iter().map(|p| p.triangle).collect::<Vec<_>>();
                match indirect.as_mut() {
                    Some(indirect) => {
                        indirect[start as usize..end as usize].copy_from_slice(&order);
                    }
                    None => mesh.reorder_triangles(start..end, &order),
                }
                roots.push(buffer);
                start = end;
            }
        }

        if options.verbose && depth_limited_leaves > 0 {
            warn!(
                "max depth of {} reached in {} leaves, leaves may hold more than {} triangles",
                options.max_depth, depth_limited_leaves, options.max_leaf_tris
            );
        }
        debug!(
            "built bvh over {} triangles: {} roots, {} nodes, depth {}, {} median splits",
            triangle_count,
            roots.len(),
            roots.iter().map(NodeBuffer::len).sum::<usize>(),
            max_depth,
            median_fallbacks
        );

        Ok(MeshBvh {
            roots,
            indirect,
            triangle_count,
        })
    }

    /// The flattened trees, one per draw group (or per chunk of a large group).
    pub fn roots(&self) -> &[NodeBuffer] {
        &self.roots
    }

    /// Mapping from buffer position to triangle index, if built with
    /// [`BuildOptions::indirect`].
    pub fn indirect(&self) -> Option<&[u32]> {
        self.indirect.as_deref()
    }

    /// Number of triangles of the mesh the hierarchy was built for.
    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Triangle index stored at buffer position `position`.
    #[inline]
    pub fn resolve_triangle(&self, position: u32) -> u32 {
        match &self.indirect {
            Some(indirect) => indirect[position as usize],
            None => position,
        }
    }

    /// Union of the root bounds.
    pub fn bounding_box(&self) -> Aabb {
        self.roots
            .iter()
            .filter(|root| !root.is_empty())
            .fold(Aabb::empty(), |aabb, root| aabb.join(&root.bounds(0)))
    }

    /// Triangles of the leaf range `offset..offset + count`.
    pub(crate) fn leaf_range<'a>(
        &'a self,
        mesh: &'a TriangleMesh,
        offset: u32,
        count: u16,
    ) -> LeafRange<'a> {
        LeafRange {
            mesh,
            indirect: self.indirect.as_deref(),
            offset,
            count: count as u32,
        }
    }
}

/// The triangles referenced by one leaf.
#[derive(Debug, Copy, Clone)]
pub struct LeafRange<'a> {
    mesh: &'a TriangleMesh,
    indirect: Option<&'a [u32]>,
    offset: u32,
    count: u32,
}

impl<'a> LeafRange<'a> {
    /// Buffer position of the first triangle.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Number of triangles.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Returns true if the leaf references no triangles.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Triangle index of the `i`-th triangle of the leaf.
    pub fn face_index(&self, i: u32) -> u32 {
        let position = self.offset + i;
        match self.indirect {
            Some(indirect) => indirect[position as usize],
            None => position,
        }
    }

    /// Iterates over `(face_index, triangle)` pairs.
    pub fn triangles(&self) -> impl Iterator<Item = (u32, Triangle)> + 'a {
        let range = *self;
        (0..self.count).map(move |i| {
            let face = range.face_index(i);
            (face, range.mesh.triangle(face as usize))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::aabb::Bounded;
    use crate::bvh::{BuildOptions, MeshBvh, Node};
    use crate::geometry::{Group, TriangleMesh};
    use crate::testbase::{create_n_cubes, default_bounds, init_logger, quad_mesh};

    #[test]
    fn test_build_reorders_index() {
        init_logger();
        let original = create_n_cubes(10, &default_bounds());
        let mut mesh = original.clone();
        let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
        assert!(bvh.indirect().is_none());
        assert!(mesh.is_indexed());
        assert_eq!(mesh.triangle_count(), original.triangle_count());

        // Same triangles, different order.
        let centroid_sums = |mesh: &TriangleMesh| {
            mesh.triangles().map(|t| t.centroid().coords.sum()).collect::<Vec<_>>()
        };
        let mut before = centroid_sums(&original);
        let mut after = centroid_sums(&mesh);
        before.sort_by(f32::total_cmp);
        after.sort_by(f32::total_cmp);
        assert_eq!(before, after);
    }

    #[test]
    fn test_indirect_keeps_mesh() {
        init_logger();
        let original = create_n_cubes(10, &default_bounds());
        let mut mesh = original.clone();
        let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default().with_indirect(true)).unwrap();
        assert_eq!(mesh, original);

        let indirect = bvh.indirect().unwrap();
        assert_eq!(indirect.len(), mesh.triangle_count());
        let mut sorted = indirect.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..mesh.triangle_count() as u32).collect::<Vec<_>>());

        // Every leaf box contains its triangles through the indirection.
        let root = &bvh.roots()[0];
        for n in 0..root.len() {
            if let Node::Leaf { offset, count } = root.node(n) {
                for (_, triangle) in bvh.leaf_range(&mesh, offset, count).triangles() {
                    assert!(root.bounds(n).approx_contains_aabb_eps(&triangle.aabb(), 1e-5));
                }
            }
        }
    }

    #[test]
    fn test_one_root_per_group() {
        let mut mesh = create_n_cubes(4, &default_bounds())
            .with_groups(vec![Group::new(0, 12), Group::new(24, 24)])
            .unwrap();
        let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
        assert_eq!(bvh.roots().len(), 2);
    }

    #[test]
    fn test_bounding_box() {
        let mut mesh = quad_mesh();
        let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
        assert_eq!(bvh.bounding_box(), mesh.bounding_box());
    }

    #[test]
    fn test_invalid_options() {
        let mut mesh = quad_mesh();
        assert!(MeshBvh::build(&mut mesh, &BuildOptions::default().with_max_leaf_tris(0)).is_err());
    }
}
