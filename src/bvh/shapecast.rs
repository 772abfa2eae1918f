//! Generic traversal.
//!
//! [`MeshBvh::shapecast`] walks every root depth-first and asks a [`ShapecastVisitor`] which
//! subtrees to enter and in which order. All other queries are visitors.

use crate::aabb::Aabb;
use crate::axis::Axis;
use crate::bvh::mesh_bvh::{LeafRange, MeshBvh};
use crate::bvh::node::NodeBuffer;
use crate::geometry::TriangleMesh;
use crate::shapes::Triangle;
use crate::Real;

/// Result of testing a node's bounds against the query.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoundsHit {
    /// The query cannot touch anything in this subtree.
    Outside,
    /// The query may touch triangles in this subtree.
    Intersects,
    /// The whole subtree lies inside the query. Its leaves are visited without further
    /// bounds tests and with `contained` set.
    Contained,
}

/// Order in which the two children of a node are visited.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChildOrder {
    /// Left child first.
    LeftFirst,
    /// Right child first.
    RightFirst,
}

/// Callbacks driving [`MeshBvh::shapecast`].
///
/// Returning `true` from [`intersects_range`] or [`intersects_triangle`] stops the
/// traversal, and `shapecast` returns `true`.
///
/// [`intersects_range`]: ShapecastVisitor::intersects_range
/// [`intersects_triangle`]: ShapecastVisitor::intersects_triangle
pub trait ShapecastVisitor {
    /// Tests the bounds of a node. `score` is the value returned by [`bounds_score`] for this
    /// node, if any.
    ///
    /// [`bounds_score`]: ShapecastVisitor::bounds_score
    fn intersects_bounds(
        &mut self,
        bounds: &Aabb,
        is_leaf: bool,
        score: Option<Real>,
        depth: u32,
    ) -> BoundsHit;

    /// Scores a child node. When both children have a score the lower one is visited first.
    fn bounds_score(&mut self, _bounds: &Aabb) -> Option<Real> {
        None
    }

    /// Visit order used when [`bounds_score`] returns `None`.
    ///
    /// [`bounds_score`]: ShapecastVisitor::bounds_score
    fn split_order(&mut self, _split_axis: Axis) -> ChildOrder {
        ChildOrder::LeftFirst
    }

    /// Tests the triangles of a leaf. Defaults to calling [`intersects_triangle`] for each.
    ///
    /// [`intersects_triangle`]: ShapecastVisitor::intersects_triangle
    fn intersects_range(&mut self, range: &LeafRange<'_>, contained: bool, depth: u32) -> bool {
        for (face_index, triangle) in range.triangles() {
            if self.intersects_triangle(&triangle, face_index, contained, depth) {
                return true;
            }
        }
        false
    }

    /// Tests a single triangle.
    fn intersects_triangle(
        &mut self,
        _triangle: &Triangle,
        _face_index: u32,
        _contained: bool,
        _depth: u32,
    ) -> bool {
        false
    }
}

impl MeshBvh {
    /// Traverses the hierarchy with `visitor`. Returns `true` if the visitor stopped the
    /// traversal.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::aabb::{Aabb, IntersectsAabb};
    /// use mesh_bvh::bvh::{BoundsHit, BuildOptions, MeshBvh, ShapecastVisitor};
    /// use mesh_bvh::geometry::TriangleMesh;
    /// use mesh_bvh::shapes::Triangle;
    /// use mesh_bvh::{Point3, Real};
    ///
    /// /// Counts the triangles touching a box.
    /// struct CountInBox {
    ///     aabb: Aabb,
    ///     count: usize,
    /// }
    ///
    /// impl ShapecastVisitor for CountInBox {
    ///     fn intersects_bounds(
    ///         &mut self,
    ///         bounds: &Aabb,
    ///         _: bool,
    ///         _: Option<Real>,
    ///         _: u32,
    ///     ) -> BoundsHit {
    ///         if self.aabb.intersects(bounds) {
    ///             BoundsHit::Intersects
    ///         } else {
    ///             BoundsHit::Outside
    ///         }
    ///     }
    ///
    ///     fn intersects_triangle(
    ///         &mut self,
    ///         triangle: &Triangle,
    ///         _: u32,
    ///         _: bool,
    ///         _: u32,
    ///     ) -> bool {
    ///         if triangle.intersects_aabb(&self.aabb) {
    ///             self.count += 1;
    ///         }
    ///         false
    ///     }
    /// }
    ///
    /// let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mut mesh = TriangleMesh::from_flat(positions, None).unwrap();
    /// let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
    ///
    /// let mut visitor = CountInBox {
    ///     aabb: Aabb::with_bounds(Point3::new(-1.0, -1.0, -1.0), Point3::new(0.1, 0.1, 0.1)),
    ///     count: 0,
    /// };
    /// assert!(!bvh.shapecast(&mesh, &mut visitor));
    /// assert_eq!(visitor.count, 1);
    /// ```
    pub fn shapecast<V: ShapecastVisitor>(&self, mesh: &TriangleMesh, visitor: &mut V) -> bool {
        for root in &self.roots {
            if root.is_empty() {
                continue;
            }
            let bounds = root.bounds(0);
            let score = visitor.bounds_score(&bounds);
            let stop = match visitor.intersects_bounds(&bounds, root.is_leaf(0), score, 0) {
                BoundsHit::Outside => false,
                BoundsHit::Intersects => self.shapecast_node(mesh, root, 0, 0, false, visitor),
                BoundsHit::Contained => self.shapecast_node(mesh, root, 0, 0, true, visitor),
            };
            if stop {
                return true;
            }
        }
        false
    }

    fn shapecast_node<V: ShapecastVisitor>(
        &self,
        mesh: &TriangleMesh,
        root: &NodeBuffer,
        node: usize,
        depth: u32,
        contained: bool,
        visitor: &mut V,
    ) -> bool {
        if root.is_leaf(node) {
            let (offset, count) = root.leaf(node);
            let range = self.leaf_range(mesh, offset, count);
            return visitor.intersects_range(&range, contained, depth);
        }

        let (left, right, split_axis) = root.internal(node);
        if contained {
            return self.shapecast_node(mesh, root, left, depth + 1, true, visitor)
                || self.shapecast_node(mesh, root, right, depth + 1, true, visitor);
        }

        let left_bounds = root.bounds(left);
        let right_bounds = root.bounds(right);
        let left_score = visitor.bounds_score(&left_bounds);
        let right_score = visitor.bounds_score(&right_bounds);
        let order = match (left_score, right_score) {
            (Some(l), Some(r)) if r < l => ChildOrder::RightFirst,
            (Some(_), Some(_)) => ChildOrder::LeftFirst,
            _ => visitor.split_order(split_axis),
        };

        let children = match order {
            ChildOrder::LeftFirst => [
                (left, left_bounds, left_score),
                (right, right_bounds, right_score),
            ],
            ChildOrder::RightFirst => [
                (right, right_bounds, right_score),
                (left, left_bounds, left_score),
            ],
        };

        for (child, bounds, score) in children {
            // Re-tested in order so that a visitor can prune with state updated by the
            // first child.
            let hit = visitor.intersects_bounds(&bounds, root.is_leaf(child), score, depth + 1);
            let stop = match hit {
                BoundsHit::Outside => false,
                BoundsHit::Intersects => {
                    self.shapecast_node(mesh, root, child, depth + 1, false, visitor)
                }
                BoundsHit::Contained => {
                    self.shapecast_node(mesh, root, child, depth + 1, true, visitor)
                }
            };
            if stop {
                return true;
            }
        }
        false
    }
}
