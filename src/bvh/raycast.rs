//! Ray queries.

use crate::aabb::Aabb;
use crate::axis::Axis;
use crate::bvh::mesh_bvh::MeshBvh;
use crate::bvh::options::RaycastOptions;
use crate::bvh::shapecast::{BoundsHit, ChildOrder, ShapecastVisitor};
use crate::geometry::TriangleMesh;
use crate::ray::Ray;
use crate::shapes::Triangle;
use crate::{Point3, Real, Vector3};

/// A ray/triangle hit.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin.
    pub distance: Real,
    /// Hit point in mesh space.
    pub point: Point3,
    /// Index of the triangle that was hit.
    pub face_index: u32,
    /// Unit normal of the triangle's front face.
    pub normal: Vector3,
}

impl RayHit {
    /// Returns true if the ray hit the back face of the triangle.
    pub fn is_back_face(&self, ray: &Ray) -> bool {
        self.normal.dot(&ray.direction) > 0.0
    }
}

fn hit_triangle(
    ray: &Ray,
    options: &RaycastOptions,
    triangle: &Triangle,
    face_index: u32,
) -> Option<RayHit> {
    triangle
        .intersects_ray(ray, options.side, options.near, options.far)
        .map(|intersection| RayHit {
            distance: intersection.distance,
            point: ray.at(intersection.distance),
            face_index,
            normal: triangle.normal(),
        })
}

/// Returns true if `bounds` overlaps the `near..far` section of `ray`. The entry distance is
/// returned for ordering.
fn ray_bounds(ray: &Ray, options: &RaycastOptions, bounds: &Aabb) -> Option<Real> {
    match ray.intersection_slice_for_aabb(bounds) {
        Some((entry, exit)) if exit >= options.near && entry <= options.far => Some(entry),
        _ => None,
    }
}

struct RaycastAll<'a> {
    ray: &'a Ray,
    options: &'a RaycastOptions,
    hits: &'a mut Vec<RayHit>,
}

impl ShapecastVisitor for RaycastAll<'_> {
    fn intersects_bounds(&mut self, bounds: &Aabb, _: bool, _: Option<Real>, _: u32) -> BoundsHit {
        match ray_bounds(self.ray, self.options, bounds) {
            Some(_) => BoundsHit::Intersects,
            None => BoundsHit::Outside,
        }
    }

    fn intersects_triangle(
        &mut self,
        triangle: &Triangle,
        face_index: u32,
        _: bool,
        _: u32,
    ) -> bool {
        if let Some(hit) = hit_triangle(self.ray, self.options, triangle, face_index) {
            self.hits.push(hit);
        }
        false
    }
}

struct RaycastFirst<'a> {
    ray: &'a Ray,
    options: &'a RaycastOptions,
    best: Option<RayHit>,
}

impl ShapecastVisitor for RaycastFirst<'_> {
    fn intersects_bounds(&mut self, bounds: &Aabb, _: bool, _: Option<Real>, _: u32) -> BoundsHit {
        match ray_bounds(self.ray, self.options, bounds) {
            Some(entry) if self.best.map_or(true, |best| entry <= best.distance) => {
                BoundsHit::Intersects
            }
            _ => BoundsHit::Outside,
        }
    }

    fn split_order(&mut self, split_axis: Axis) -> ChildOrder {
        // The left child holds the smaller coordinates along the split axis.
        if self.ray.direction[split_axis] < 0.0 {
            ChildOrder::RightFirst
        } else {
            ChildOrder::LeftFirst
        }
    }

    fn intersects_triangle(
        &mut self,
        triangle: &Triangle,
        face_index: u32,
        _: bool,
        _: u32,
    ) -> bool {
        if let Some(hit) = hit_triangle(self.ray, self.options, triangle, face_index) {
            if self.best.map_or(true, |best| hit.distance < best.distance) {
                self.best = Some(hit);
            }
        }
        false
    }
}

impl MeshBvh {
    /// Returns every triangle hit by `ray`, sorted by distance.
    pub fn raycast(&self, mesh: &TriangleMesh, ray: &Ray, options: &RaycastOptions) -> Vec<RayHit> {
        let mut hits = Vec::new();
        self.raycast_into(mesh, ray, options, &mut hits);
        hits
    }

    /// Appends every triangle hit by `ray` to `hits`, sorted by distance. Reusing `hits`
    /// avoids an allocation per query.
    pub fn raycast_into(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        options: &RaycastOptions,
        hits: &mut Vec<RayHit>,
    ) {
        let start = hits.len();
        let mut visitor = RaycastAll { ray, options, hits };
        self.shapecast(mesh, &mut visitor);
        hits[start..].sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }

    /// Returns the closest triangle hit by `ray`.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::bvh::{BuildOptions, MeshBvh, RaycastOptions};
    /// use mesh_bvh::geometry::TriangleMesh;
    /// use mesh_bvh::ray::{Ray, Side};
    /// use mesh_bvh::{Point3, Vector3};
    ///
    /// // Counter-clockwise seen from +z.
    /// let positions = vec![-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0];
    /// let mut mesh = TriangleMesh::from_flat(positions, None).unwrap();
    /// let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
    ///
    /// let ray = Ray::new(Point3::new(0.0, 0.0, -3.0), Vector3::new(0.0, 0.0, 1.0));
    /// assert!(bvh.raycast_first(&mesh, &ray, &RaycastOptions::default()).is_some());
    ///
    /// let front_only = RaycastOptions::default().with_side(Side::Front);
    /// assert!(bvh.raycast_first(&mesh, &ray, &front_only).is_none());
    /// ```
    pub fn raycast_first(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        options: &RaycastOptions,
    ) -> Option<RayHit> {
        let mut visitor = RaycastFirst {
            ray,
            options,
            best: None,
        };
        self.shapecast(mesh, &mut visitor);
        visitor.best
    }
}
