//! Closest point queries.

use crate::aabb::{Aabb, Bounded};
use crate::bvh::mesh_bvh::MeshBvh;
use crate::bvh::options::ClosestPointOptions;
use crate::bvh::shapecast::{BoundsHit, ShapecastVisitor};
use crate::geometry::TriangleMesh;
use crate::shapes::Triangle;
use crate::{Isometry3, Point3, Real};

/// Closest point on a mesh to a query point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointHit {
    /// The closest point on the mesh.
    pub point: Point3,
    /// Distance between the query point and `point`.
    pub distance: Real,
    /// Index of the triangle `point` lies on.
    pub face_index: u32,
}

/// Closest pair of points between two meshes. Both points are in the space of the mesh the
/// query was run on.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeometryHit {
    /// The closest point on this mesh.
    pub point: Point3,
    /// The closest point on the other mesh.
    pub other_point: Point3,
    /// Distance between `point` and `other_point`.
    pub distance: Real,
    /// Index of the triangle `point` lies on.
    pub face_index: u32,
    /// Index of the triangle `other_point` lies on.
    pub other_face_index: u32,
}

struct ClosestToPoint<'a> {
    point: &'a Point3,
    options: &'a ClosestPointOptions,
    best: Option<PointHit>,
}

impl ClosestToPoint<'_> {
    fn limit(&self) -> Real {
        self.best.map_or(self.options.max_threshold, |best| best.distance)
    }
}

impl ShapecastVisitor for ClosestToPoint<'_> {
    fn intersects_bounds(
        &mut self,
        bounds: &Aabb,
        _: bool,
        score: Option<Real>,
        _: u32,
    ) -> BoundsHit {
        let distance = score.unwrap_or_else(|| bounds.distance_squared_to_point(self.point).sqrt());
        if distance > self.limit() {
            BoundsHit::Outside
        } else {
            BoundsHit::Intersects
        }
    }

    fn bounds_score(&mut self, bounds: &Aabb) -> Option<Real> {
        Some(bounds.distance_squared_to_point(self.point).sqrt())
    }

    fn intersects_triangle(
        &mut self,
        triangle: &Triangle,
        face_index: u32,
        _: bool,
        _: u32,
    ) -> bool {
        let Some(closest) = triangle.closest_point_to_point(self.point) else {
            return false;
        };
        let distance = (closest - self.point).norm();
        let improves = match self.best {
            Some(best) => distance < best.distance,
            None => distance <= self.options.max_threshold,
        };
        if improves {
            self.best = Some(PointHit {
                point: closest,
                distance,
                face_index,
            });
        }
        distance <= self.options.min_threshold
    }
}

/// Closest point search of one triangle against another hierarchy, in that hierarchy's
/// space.
struct ClosestToTriangle<'a> {
    triangle: Triangle,
    triangle_aabb: Aabb,
    options: &'a ClosestPointOptions,
    limit: Real,
    // (on triangle, on other, distance, other face)
    best: Option<(Point3, Point3, Real, u32)>,
}

impl ShapecastVisitor for ClosestToTriangle<'_> {
    fn intersects_bounds(
        &mut self,
        bounds: &Aabb,
        _: bool,
        score: Option<Real>,
        _: u32,
    ) -> BoundsHit {
        let distance =
            score.unwrap_or_else(|| bounds.distance_squared_to_aabb(&self.triangle_aabb).sqrt());
        if distance > self.limit {
            BoundsHit::Outside
        } else {
            BoundsHit::Intersects
        }
    }

    fn bounds_score(&mut self, bounds: &Aabb) -> Option<Real> {
        Some(bounds.distance_squared_to_aabb(&self.triangle_aabb).sqrt())
    }

    fn intersects_triangle(&mut self, other: &Triangle, face_index: u32, _: bool, _: u32) -> bool {
        let Some((on_self, on_other)) = self.triangle.closest_points_to_triangle(other) else {
            return false;
        };
        let distance = (on_other - on_self).norm();
        let improves = match self.best {
            Some(_) => distance < self.limit,
            None => distance <= self.limit,
        };
        if improves {
            self.limit = distance;
            self.best = Some((on_self, on_other, distance, face_index));
        }
        distance <= self.options.min_threshold
    }
}

struct ClosestToGeometry<'a> {
    other: &'a MeshBvh,
    other_mesh: &'a TriangleMesh,
    other_to_self: &'a Isometry3,
    self_to_other: Isometry3,
    other_bounds: Aabb,
    options: &'a ClosestPointOptions,
    best: Option<GeometryHit>,
}

impl ShapecastVisitor for ClosestToGeometry<'_> {
    fn intersects_bounds(
        &mut self,
        bounds: &Aabb,
        _: bool,
        score: Option<Real>,
        _: u32,
    ) -> BoundsHit {
        let distance =
            score.unwrap_or_else(|| bounds.distance_squared_to_aabb(&self.other_bounds).sqrt());
        let limit = self.best.map_or(self.options.max_threshold, |best| best.distance);
        if distance > limit {
            BoundsHit::Outside
        } else {
            BoundsHit::Intersects
        }
    }

    fn bounds_score(&mut self, bounds: &Aabb) -> Option<Real> {
        Some(bounds.distance_squared_to_aabb(&self.other_bounds).sqrt())
    }

    fn intersects_triangle(
        &mut self,
        triangle: &Triangle,
        face_index: u32,
        _: bool,
        _: u32,
    ) -> bool {
        if triangle.is_degenerate() {
            return false;
        }
        let local = triangle.transformed(&self.self_to_other);
        let mut inner = ClosestToTriangle {
            triangle: local,
            triangle_aabb: local.aabb(),
            options: self.options,
            limit: self.best.map_or(self.options.max_threshold, |best| best.distance),
            best: None,
        };
        self.other.shapecast(self.other_mesh, &mut inner);

        if let Some((on_self, on_other, distance, other_face_index)) = inner.best {
            if self.best.map_or(true, |best| distance < best.distance) {
                self.best = Some(GeometryHit {
                    point: self.other_to_self * on_self,
                    other_point: self.other_to_self * on_other,
                    distance,
                    face_index,
                    other_face_index,
                });
            }
            return distance <= self.options.min_threshold;
        }
        false
    }
}

impl MeshBvh {
    /// Returns the point on the mesh closest to `point`, or `None` if no triangle lies within
    /// [`ClosestPointOptions::max_threshold`].
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::bvh::{BuildOptions, ClosestPointOptions, MeshBvh};
    /// use mesh_bvh::geometry::TriangleMesh;
    /// use mesh_bvh::Point3;
    ///
    /// let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mut mesh = TriangleMesh::from_flat(positions, None).unwrap();
    /// let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
    ///
    /// let above = Point3::new(0.25, 0.25, 2.0);
    /// let options = ClosestPointOptions::default();
    /// let hit = bvh.closest_point_to_point(&mesh, &above, &options).unwrap();
    /// assert!((hit.distance - 2.0).abs() < 1e-6);
    ///
    /// let near_only = ClosestPointOptions::default().with_max_threshold(1.0);
    /// assert!(bvh.closest_point_to_point(&mesh, &above, &near_only).is_none());
    /// ```
    pub fn closest_point_to_point(
        &self,
        mesh: &TriangleMesh,
        point: &Point3,
        options: &ClosestPointOptions,
    ) -> Option<PointHit> {
        let mut visitor = ClosestToPoint {
            point,
            options,
            best: None,
        };
        self.shapecast(mesh, &mut visitor);
        visitor.best
    }

    /// Returns the closest pair of points between this mesh and `other_mesh`, whose hierarchy
    /// is `other`. `other_to_self` maps the space of `other_mesh` into the space of this mesh.
    pub fn closest_point_to_geometry(
        &self,
        mesh: &TriangleMesh,
        other: &MeshBvh,
        other_mesh: &TriangleMesh,
        other_to_self: &Isometry3,
        options: &ClosestPointOptions,
    ) -> Option<GeometryHit> {
        let mut visitor = ClosestToGeometry {
            other,
            other_mesh,
            other_to_self,
            self_to_other: other_to_self.inverse(),
            other_bounds: other.bounding_box().transformed(other_to_self),
            options,
            best: None,
        };
        self.shapecast(mesh, &mut visitor);
        visitor.best
    }
}
