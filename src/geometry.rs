//! Triangle geometry consumed by the BVH.
//!
//! A [`TriangleMesh`] is a shared vertex position buffer, an optional index buffer and an
//! optional list of draw groups. Without an index buffer every three consecutive vertices
//! form a triangle; trailing vertices that do not complete a triangle are ignored.

use std::ops::Range;

use crate::aabb::{Aabb, Bounded};
use crate::error::{BvhError, Result};
use crate::shapes::Triangle;
use crate::Point3;

/// A contiguous range of triangles drawn together. Each group becomes its own BVH root.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    /// First triangle of the group.
    pub start: u32,
    /// Number of triangles in the group.
    pub count: u32,
}

impl Group {
    /// Creates a group covering `count` triangles starting at `start`.
    pub fn new(start: u32, count: u32) -> Group {
        Group { start, count }
    }

    /// One past the last triangle of the group.
    pub fn end(&self) -> u32 {
        self.start + self.count
    }
}

/// Indexed or non-indexed triangle geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    positions: Vec<Point3>,
    indices: Option<Vec<u32>>,
    groups: Vec<Group>,
}

impl TriangleMesh {
    /// Creates a mesh from vertex positions and an optional index buffer.
    ///
    /// Fails if there are no positions, if the index buffer length is not a multiple of
    /// three or if an index is out of range.
    pub fn new(positions: Vec<Point3>, indices: Option<Vec<u32>>) -> Result<TriangleMesh> {
        if positions.is_empty() {
            return Err(BvhError::MissingPositions);
        }
        if let Some(indices) = &indices {
            if indices.len() % 3 != 0 {
                return Err(BvhError::InvalidIndexLength { len: indices.len() });
            }
            let vertex_count = positions.len();
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(BvhError::IndexOutOfRange { index, vertex_count });
            }
        }

        Ok(TriangleMesh {
            positions,
            indices,
            groups: Vec::new(),
        })
    }

    /// Creates a mesh from a flat `[x, y, z, x, y, z, ..]` position buffer.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::geometry::TriangleMesh;
    ///
    /// let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mesh = TriangleMesh::from_flat(positions, None).unwrap();
    /// assert_eq!(mesh.triangle_count(), 1);
    ///
    /// assert!(TriangleMesh::from_flat(vec![0.0, 1.0], None).is_err());
    /// ```
    pub fn from_flat(positions: Vec<f32>, indices: Option<Vec<u32>>) -> Result<TriangleMesh> {
        if positions.len() % 3 != 0 {
            return Err(BvhError::InvalidPositionLength {
                len: positions.len(),
            });
        }
        let positions = positions
            .chunks_exact(3)
            .map(|p| Point3::new(p[0], p[1], p[2]))
            .collect();
        TriangleMesh::new(positions, indices)
    }

    /// Creates a mesh from a list of triangles without an index buffer.
    pub fn from_triangles(triangles: &[Triangle]) -> Result<TriangleMesh> {
        let positions = triangles
            .iter()
            .flat_map(|t| t.vertices())
            .collect::<Vec<_>>();
        TriangleMesh::new(positions, None)
    }

    /// Replaces the draw groups. Groups must lie within the mesh and must not overlap.
    /// Triangles outside of every group are not part of the BVH.
    pub fn with_groups(mut self, groups: Vec<Group>) -> Result<TriangleMesh> {
        self.set_groups(groups)?;
        Ok(self)
    }

    /// Mutable version of [`TriangleMesh::with_groups`].
    pub fn set_groups(&mut self, mut groups: Vec<Group>) -> Result<()> {
        let triangle_count = self.triangle_count();
        groups.sort_by_key(|g| g.start);
        let mut covered = 0u32;
        for group in &groups {
            let invalid = BvhError::InvalidGroup {
                start: group.start,
                end: group.start.saturating_add(group.count),
                triangle_count,
            };
            let end = group.start.checked_add(group.count).ok_or(invalid.clone())?;
            if end as usize > triangle_count || group.start < covered {
                return Err(invalid);
            }
            covered = end;
        }
        self.groups = groups;
        Ok(())
    }

    /// Vertex positions.
    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }

    /// Mutable vertex positions. Moving vertices requires a [`refit`] of the BVH.
    ///
    /// [`refit`]: crate::bvh::MeshBvh::refit
    pub fn positions_mut(&mut self) -> &mut [Point3] {
        &mut self.positions
    }

    /// Sets the position of a single vertex.
    pub fn set_position(&mut self, vertex: usize, position: Point3) {
        self.positions[vertex] = position;
    }

    /// Index buffer, if the mesh is indexed.
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Draw groups of the mesh.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Returns true if the mesh has an index buffer.
    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Vertex indices of triangle `triangle`.
    pub fn triangle_vertex_indices(&self, triangle: usize) -> [u32; 3] {
        let base = triangle * 3;
        match &self.indices {
            Some(indices) => [indices[base], indices[base + 1], indices[base + 2]],
            None => [base as u32, base as u32 + 1, base as u32 + 2],
        }
    }

    /// Returns triangle `triangle` in mesh space.
    pub fn triangle(&self, triangle: usize) -> Triangle {
        let [a, b, c] = self.triangle_vertex_indices(triangle);
        Triangle::new(
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        )
    }

    /// Iterates over all triangles in storage order.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangle_count()).map(move |i| self.triangle(i))
    }

    /// Triangle ranges that each become a BVH root: one per group, or the whole mesh.
    pub fn triangle_ranges(&self) -> Vec<Range<u32>> {
        if self.groups.is_empty() {
            vec![0..self.triangle_count() as u32]
        } else {
            self.groups.iter().map(|g| g.start..g.end()).collect()
        }
    }

    /// Creates an identity index buffer for non-indexed meshes.
    pub(crate) fn ensure_index(&mut self) {
        if self.indices.is_none() {
            let count = (self.triangle_count() * 3) as u32;
            self.indices = Some((0..count).collect());
        }
    }

    /// Rewrites the index buffer triangles in `range` so that slot `range.start + i` holds
    /// the triangle previously stored at `order[i]`.
    pub(crate) fn reorder_triangles(&mut self, range: Range<u32>, order: &[u32]) {
        self.ensure_index();
        if let Some(indices) = self.indices.as_mut() {
            let reordered = order
                .iter()
                .flat_map(|&t| {
                    let base = t as usize * 3;
                    [indices[base], indices[base + 1], indices[base + 2]]
                })
                .collect::<Vec<_>>();
            let start = range.start as usize * 3;
            indices[start..start + reordered.len()].copy_from_slice(&reordered);
        }
    }

    /// Replaces the index buffer with one restored from a serialized BVH.
    pub(crate) fn replace_indices(&mut self, indices: Vec<u32>) -> Result<()> {
        let vertex_count = self.positions.len();
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(BvhError::IndexOutOfRange { index, vertex_count });
        }
        self.indices = Some(indices);
        Ok(())
    }

    /// Bounding box of all vertices referenced by triangles.
    pub fn bounding_box(&self) -> Aabb {
        self.triangles()
            .fold(Aabb::empty(), |aabb, t| aabb.join(&t.aabb()))
    }
}
