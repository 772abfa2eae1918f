//! This module defines a Triangle and its intersection algorithms.
//!
//! Every triangle level test of the crate lives here: ray casts, triangle/box and
//! triangle/triangle separating axis tests and closest point computations.

use crate::aabb::{Aabb, Bounded, IntersectsAabb};
use crate::ray::{Intersection, Ray, Side};
use crate::shapes::sphere::Sphere;
use crate::utils::closest_points_segment_segment;
use crate::{Isometry3, Point3, Real, Vector3};

/// Squared cross product length below which a triangle is considered degenerate.
const DEGENERATE_AREA_SQUARED: Real = 1e-20;

/// A triangle struct. Instance of a more complex `Bounded` primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle {
    /// First point on the triangle
    pub a: Point3,
    /// Second point on the triangle
    pub b: Point3,
    /// Third point on the triangle
    pub c: Point3,
}

impl Triangle {
    /// Creates a new triangle given a counter clockwise set of points
    pub fn new(a: Point3, b: Point3, c: Point3) -> Triangle {
        Triangle { a, b, c }
    }

    /// Returns the unnormalized normal `(b - a) × (c - a)`. Its length is twice the area.
    pub fn scaled_normal(&self) -> Vector3 {
        (self.b - self.a).cross(&(self.c - self.a))
    }

    /// Returns the unit normal of the front face, or the zero vector for degenerate triangles.
    pub fn normal(&self) -> Vector3 {
        let normal = self.scaled_normal();
        if normal.norm_squared() <= DEGENERATE_AREA_SQUARED {
            Vector3::zeros()
        } else {
            normal.normalize()
        }
    }

    /// Returns the area of the triangle.
    pub fn area(&self) -> Real {
        self.scaled_normal().norm() * 0.5
    }

    /// Returns true if the triangle has (almost) no area.
    pub fn is_degenerate(&self) -> bool {
        self.scaled_normal().norm_squared() <= DEGENERATE_AREA_SQUARED
    }

    /// Returns the centroid of the triangle.
    pub fn centroid(&self) -> Point3 {
        Point3::from((self.a.coords + self.b.coords + self.c.coords) / 3.0)
    }

    /// Returns the three vertices as an array.
    pub fn vertices(&self) -> [Point3; 3] {
        [self.a, self.b, self.c]
    }

    /// Returns the three edges as `(start, end)` pairs.
    pub fn edges(&self) -> [(Point3, Point3); 3] {
        [(self.a, self.b), (self.b, self.c), (self.c, self.a)]
    }

    /// Returns this triangle with `transform` applied to every vertex.
    pub fn transformed(&self, transform: &Isometry3) -> Triangle {
        Triangle::new(transform * self.a, transform * self.b, transform * self.c)
    }

    /// Casts `ray` against this triangle and returns the intersection if it lies within
    /// `near..=far`.
    pub fn intersects_ray(
        &self,
        ray: &Ray,
        side: Side,
        near: Real,
        far: Real,
    ) -> Option<Intersection> {
        let intersection = ray.intersects_triangle(&self.a, &self.b, &self.c, side);
        if intersection.is_hit() && intersection.distance >= near && intersection.distance <= far {
            Some(intersection)
        } else {
            None
        }
    }

    /// Returns the point on the triangle closest to `p`, or `None` for degenerate triangles.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::shapes::triangle::Triangle;
    /// use mesh_bvh::Point3;
    ///
    /// let triangle = Triangle::new(
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// );
    /// let closest = triangle.closest_point_to_point(&Point3::new(0.2, 0.2, 3.0)).unwrap();
    /// assert_eq!(closest, Point3::new(0.2, 0.2, 0.0));
    /// ```
    pub fn closest_point_to_point(&self, p: &Point3) -> Option<Point3> {
        if self.is_degenerate() {
            return None;
        }

        let (a, b, c) = (self.a, self.b, self.c);
        let ab = b - a;
        let ac = c - a;

        // Vertex region a
        let ap = p - a;
        let d1 = ab.dot(&ap);
        let d2 = ac.dot(&ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return Some(a);
        }

        // Vertex region b
        let bp = p - b;
        let d3 = ab.dot(&bp);
        let d4 = ac.dot(&bp);
        if d3 >= 0.0 && d4 <= d3 {
            return Some(b);
        }

        // Edge region ab
        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return Some(a + ab * v);
        }

        // Vertex region c
        let cp = p - c;
        let d5 = ab.dot(&cp);
        let d6 = ac.dot(&cp);
        if d6 >= 0.0 && d5 <= d6 {
            return Some(c);
        }

        // Edge region ac
        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return Some(a + ac * w);
        }

        // Edge region bc
        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return Some(b + (c - b) * w);
        }

        // Face region
        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        Some(a + ab * v + ac * w)
    }

    /// Returns the point where the segment `p..q` crosses the triangle, if it does.
    pub fn intersects_segment(&self, p: &Point3, q: &Point3) -> Option<Point3> {
        let normal = self.scaled_normal();
        if normal.norm_squared() <= DEGENERATE_AREA_SQUARED {
            return None;
        }
        let dp = normal.dot(&(p - self.a));
        let dq = normal.dot(&(q - self.a));
        if (dp > 0.0 && dq > 0.0) || (dp < 0.0 && dq < 0.0) || dp == dq {
            return None;
        }

        let t = dp / (dp - dq);
        let point = p + (q - p) * t;
        if self.contains_coplanar_point(&point, &normal) {
            Some(point)
        } else {
            None
        }
    }

    /// Returns true if `point`, assumed to lie in the plane of the triangle, is inside it.
    fn contains_coplanar_point(&self, point: &Point3, normal: &Vector3) -> bool {
        let edge_sides = [
            (self.b - self.a).cross(&(point - self.a)).dot(normal),
            (self.c - self.b).cross(&(point - self.b)).dot(normal),
            (self.a - self.c).cross(&(point - self.c)).dot(normal),
        ];
        edge_sides.iter().all(|&s| s >= 0.0)
    }

    /// Returns the closest points between the segment `p..q` and the triangle as
    /// `(point_on_segment, point_on_triangle)`, or `None` for degenerate triangles.
    ///
    /// When the segment crosses the triangle both points are the crossing point.
    pub fn closest_points_to_segment(&self, p: &Point3, q: &Point3) -> Option<(Point3, Point3)> {
        if self.is_degenerate() {
            return None;
        }
        if let Some(point) = self.intersects_segment(p, q) {
            return Some((point, point));
        }

        let mut best: Option<(Point3, Point3)> = None;
        let mut best_distance = Real::INFINITY;
        let mut consider = |on_segment: Point3, on_triangle: Point3| {
            let distance = (on_segment - on_triangle).norm_squared();
            if distance < best_distance {
                best_distance = distance;
                best = Some((on_segment, on_triangle));
            }
        };

        for endpoint in [p, q] {
            if let Some(on_triangle) = self.closest_point_to_point(endpoint) {
                consider(*endpoint, on_triangle);
            }
        }
        for (start, end) in self.edges() {
            let (on_segment, on_edge) = closest_points_segment_segment(p, q, &start, &end);
            consider(on_segment, on_edge);
        }

        best
    }

    /// Returns the closest points between this triangle and `other` as
    /// `(point_on_self, point_on_other)`, or `None` if either triangle is degenerate.
    pub fn closest_points_to_triangle(&self, other: &Triangle) -> Option<(Point3, Point3)> {
        if self.is_degenerate() || other.is_degenerate() {
            return None;
        }

        let mut best: Option<(Point3, Point3)> = None;
        let mut best_distance = Real::INFINITY;

        for (start, end) in self.edges() {
            if let Some((on_self, on_other)) = other.closest_points_to_segment(&start, &end) {
                let distance = (on_self - on_other).norm_squared();
                if distance < best_distance {
                    best_distance = distance;
                    best = Some((on_self, on_other));
                }
            }
        }
        for (start, end) in other.edges() {
            if let Some((on_other, on_self)) = self.closest_points_to_segment(&start, &end) {
                let distance = (on_self - on_other).norm_squared();
                if distance < best_distance {
                    best_distance = distance;
                    best = Some((on_self, on_other));
                }
            }
        }

        best
    }

    /// Returns the distance between `p` and the triangle, or `None` for degenerate triangles.
    pub fn distance_to_point(&self, p: &Point3) -> Option<Real> {
        self.closest_point_to_point(p).map(|closest| (closest - p).norm())
    }

    /// Separating axis test against another triangle. Touching triangles intersect.
    pub fn intersects_triangle(&self, other: &Triangle) -> bool {
        let verts_a = self.vertices();
        let verts_b = other.vertices();
        let normal_a = self.scaled_normal();
        let normal_b = other.scaled_normal();
        let edges_a = [self.b - self.a, self.c - self.b, self.a - self.c];
        let edges_b = [other.b - other.a, other.c - other.b, other.a - other.c];

        let separated = |axis: &Vector3| -> bool {
            if axis.norm_squared() <= DEGENERATE_AREA_SQUARED {
                return false;
            }
            let (min_a, max_a) = project(&verts_a, axis);
            let (min_b, max_b) = project(&verts_b, axis);
            let tolerance = 1e-6 * axis.norm() * (max_a - min_a + max_b - min_b).max(1.0);
            max_a + tolerance < min_b || max_b + tolerance < min_a
        };

        if separated(&normal_a) || separated(&normal_b) {
            return false;
        }

        for edge_a in edges_a.iter() {
            for edge_b in edges_b.iter() {
                if separated(&edge_a.cross(edge_b)) {
                    return false;
                }
            }
        }

        // Coplanar triangles are separated by an in-plane edge normal.
        let parallel = normal_a.cross(&normal_b).norm_squared()
            <= 1e-6 * normal_a.norm_squared() * normal_b.norm_squared();
        if parallel {
            let plane_normal = if normal_a.norm_squared() > normal_b.norm_squared() {
                normal_a
            } else {
                normal_b
            };
            for edge in edges_a.iter().chain(edges_b.iter()) {
                if separated(&plane_normal.cross(edge)) {
                    return false;
                }
            }
        }

        true
    }

    /// Returns true if the triangle touches the sphere. Degenerate triangles never do.
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        match self.closest_point_to_point(&sphere.center) {
            Some(closest) => {
                (closest - sphere.center).norm_squared() <= sphere.radius * sphere.radius
            }
            None => false,
        }
    }

    /// Returns the barycentric-interpolated point for the coordinates of an [`Intersection`].
    pub fn point_at(&self, u: Real, v: Real) -> Point3 {
        self.a + (self.b - self.a) * u + (self.c - self.a) * v
    }
}

/// Projects `verts` onto `axis` and returns the covered interval.
fn project(verts: &[Point3; 3], axis: &Vector3) -> (Real, Real) {
    let d0 = verts[0].coords.dot(axis);
    let d1 = verts[1].coords.dot(axis);
    let d2 = verts[2].coords.dot(axis);
    (d0.min(d1).min(d2), d0.max(d1).max(d2))
}

impl Bounded for Triangle {
    fn aabb(&self) -> Aabb {
        Aabb::empty().grow(&self.a).grow(&self.b).grow(&self.c)
    }
}

impl IntersectsAabb for Triangle {
    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let c = aabb.center();
        let extents = aabb.half_size();

        let verts = [self.a - c, self.b - c, self.c - c];

        let lines = [
            verts[1] - verts[0],
            verts[2] - verts[1],
            verts[0] - verts[2],
        ];

        let normals = [Vector3::x(), Vector3::y(), Vector3::z()];

        for u in normals.iter() {
            for f in lines.iter() {
                let axis = u.cross(f);
                if !separating_axis_test(&verts, &extents, &axis) {
                    return false;
                }
            }
        }

        for a in normals.iter() {
            if !separating_axis_test(&verts, &extents, a) {
                return false;
            }
        }

        let triangle_normal = lines[0].cross(&lines[1]);
        separating_axis_test(&verts, &extents, &triangle_normal)
    }
}

/// Returns true if the box with half size `extents` centered on the origin and the triangle
/// `verts` overlap when projected onto `axis`.
fn separating_axis_test(verts: &[Vector3; 3], extents: &Vector3, axis: &Vector3) -> bool {
    let projection = Vector3::new(verts[0].dot(axis), verts[1].dot(axis), verts[2].dot(axis));

    let r = extents.x * axis.x.abs() + extents.y * axis.y.abs() + extents.z * axis.z.abs();

    let max = projection.max();
    let min = projection.min();
    (-max).max(min) <= r
}

#[cfg(test)]
mod tests {
    use crate::aabb::{Aabb, IntersectsAabb};
    use crate::ray::{Ray, Side};
    use crate::shapes::sphere::Sphere;
    use crate::shapes::triangle::Triangle;
    use crate::testbase::{tuple_to_point, tuplevec_unit_strategy};
    use crate::{Point3, Vector3};
    use float_eq::assert_float_eq;
    use proptest::prelude::*;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_closest_point_regions() {
        let t = unit_triangle();
        assert_eq!(t.closest_point_to_point(&Point3::new(-1.0, -1.0, 0.0)), Some(t.a));
        assert_eq!(t.closest_point_to_point(&Point3::new(3.0, -1.0, 1.0)), Some(t.b));
        assert_eq!(
            t.closest_point_to_point(&Point3::new(0.5, -2.0, 0.0)),
            Some(Point3::new(0.5, 0.0, 0.0))
        );
        let on_hypotenuse = t.closest_point_to_point(&Point3::new(1.0, 1.0, 0.0)).unwrap();
        assert_float_eq!(on_hypotenuse.x, 0.5, abs <= 1e-6);
        assert_float_eq!(on_hypotenuse.y, 0.5, abs <= 1e-6);
    }

    #[test]
    fn test_degenerate_triangle() {
        let t = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        assert!(t.is_degenerate());
        assert_eq!(t.normal(), Vector3::zeros());
        assert!(t.closest_point_to_point(&Point3::origin()).is_none());
        let up = Point3::new(0.0, 1.0, 0.0);
        assert!(t.closest_points_to_segment(&Point3::origin(), &up).is_none());
    }

    #[test]
    fn test_segment_crossing_triangle() {
        let t = unit_triangle();
        let start = Point3::new(0.25, 0.25, -1.0);
        let end = Point3::new(0.25, 0.25, 1.0);
        let (on_segment, on_triangle) = t.closest_points_to_segment(&start, &end).unwrap();
        assert_eq!(on_segment, on_triangle);
        assert_float_eq!(on_segment.z, 0.0, abs <= 1e-6);
    }

    #[test]
    fn test_segment_above_triangle() {
        let t = unit_triangle();
        let (on_segment, on_triangle) = t
            .closest_points_to_segment(&Point3::new(-1.0, 0.2, 0.5), &Point3::new(2.0, 0.2, 0.5))
            .unwrap();
        assert_float_eq!((on_segment - on_triangle).norm(), 0.5, abs <= 1e-5);
        assert_float_eq!(on_triangle.z, 0.0, abs <= 1e-6);
    }

    #[test]
    fn test_segment_in_plane_outside() {
        let t = unit_triangle();
        let (on_segment, on_triangle) = t
            .closest_points_to_segment(&Point3::new(2.0, -1.0, 0.0), &Point3::new(2.0, 1.0, 0.0))
            .unwrap();
        assert_float_eq!((on_segment - on_triangle).norm(), 1.0, abs <= 1e-5);
    }

    #[test]
    fn test_triangle_triangle_sat() {
        let t = unit_triangle();
        let crossing = Triangle::new(
            Point3::new(0.2, 0.2, -1.0),
            Point3::new(0.2, 0.2, 1.0),
            Point3::new(0.3, -1.0, 0.0),
        );
        assert!(t.intersects_triangle(&crossing));
        assert!(crossing.intersects_triangle(&t));

        let above = Triangle::new(
            Point3::new(0.0, 0.0, 0.5),
            Point3::new(1.0, 0.0, 0.5),
            Point3::new(0.0, 1.0, 0.5),
        );
        assert!(!t.intersects_triangle(&above));

        let coplanar_apart = Triangle::new(
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(3.0, 2.0, 0.0),
            Point3::new(2.0, 3.0, 0.0),
        );
        assert!(!t.intersects_triangle(&coplanar_apart));

        let coplanar_overlap = Triangle::new(
            Point3::new(0.2, 0.2, 0.0),
            Point3::new(2.0, 0.2, 0.0),
            Point3::new(0.2, 2.0, 0.0),
        );
        assert!(t.intersects_triangle(&coplanar_overlap));
    }

    #[test]
    fn test_triangle_triangle_closest_points() {
        let t = unit_triangle();
        let above = Triangle::new(
            Point3::new(0.0, 0.0, 0.5),
            Point3::new(1.0, 0.0, 0.5),
            Point3::new(0.0, 1.0, 0.5),
        );
        let (p, q) = t.closest_points_to_triangle(&above).unwrap();
        assert_float_eq!((p - q).norm(), 0.5, abs <= 1e-5);
    }

    #[test]
    fn test_triangle_aabb_and_sphere() {
        let t = unit_triangle();
        let touching = Aabb::with_bounds(Point3::new(0.1, 0.1, -0.1), Point3::new(0.2, 0.2, 0.1));
        let near_hypotenuse =
            Aabb::with_bounds(Point3::new(0.8, 0.8, -0.1), Point3::new(0.9, 0.9, 0.1));
        assert!(t.intersects_aabb(&touching));
        assert!(!t.intersects_aabb(&near_hypotenuse));

        assert!(t.intersects_sphere(&Sphere::new(Point3::new(0.2, 0.2, 0.5), 0.6)));
        assert!(!t.intersects_sphere(&Sphere::new(Point3::new(0.2, 0.2, 0.5), 0.4)));
    }

    #[test]
    fn test_ray_window() {
        let t = unit_triangle();
        let through = Ray::new(Point3::new(0.25, 0.25, 2.0), -Vector3::z());
        let beside = Ray::new(Point3::new(2.0, 2.0, 2.0), -Vector3::z());

        assert!(t.intersects_ray(&through, Side::Double, 0.0, f32::INFINITY).is_some());
        assert!(t.intersects_ray(&through, Side::Double, 0.0, 1.5).is_none());
        assert!(t.intersects_ray(&through, Side::Double, 2.5, f32::INFINITY).is_none());
        assert!(t.intersects_ray(&beside, Side::Double, 0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn test_ray_matches_point_at() {
        let t = unit_triangle();
        let ray = Ray::new(Point3::new(0.3, 0.2, 2.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = t.intersects_ray(&ray, Side::Front, 0.0, f32::INFINITY).unwrap();
        let point = t.point_at(hit.u, hit.v);
        assert_float_eq!((point - ray.at(hit.distance)).norm(), 0.0, abs <= 1e-5);
        assert!(t.intersects_ray(&ray, Side::Front, 0.0, 1.0).is_none());
    }

    proptest! {
        // The closest point of a point on the triangle is the point itself.
        #[test]
        fn test_closest_point_idempotent(a in tuplevec_unit_strategy(),
                                         b in tuplevec_unit_strategy(),
                                         c in tuplevec_unit_strategy(),
                                         p in tuplevec_unit_strategy()) {
            let t = Triangle::new(tuple_to_point(&a), tuple_to_point(&b), tuple_to_point(&c));
            prop_assume!(t.area() > 1e-3);
            let closest = t.closest_point_to_point(&tuple_to_point(&p)).unwrap();
            let again = t.closest_point_to_point(&closest).unwrap();
            prop_assert!((closest - again).norm() < 1e-4);
        }

        // No vertex is closer to the query point than the closest point.
        #[test]
        fn test_closest_point_is_closest(a in tuplevec_unit_strategy(),
                                         b in tuplevec_unit_strategy(),
                                         c in tuplevec_unit_strategy(),
                                         p in tuplevec_unit_strategy()) {
            let t = Triangle::new(tuple_to_point(&a), tuple_to_point(&b), tuple_to_point(&c));
            prop_assume!(t.area() > 1e-3);
            let p = tuple_to_point(&p);
            let distance = t.distance_to_point(&p).unwrap();
            for v in t.vertices().iter() {
                prop_assert!(distance <= (v - p).norm() + 1e-4);
            }
            let centroid_distance = (t.centroid() - p).norm();
            prop_assert!(distance <= centroid_distance + 1e-4);
        }

        // A triangle always intersects its own bounding box.
        #[test]
        fn test_triangle_intersects_own_aabb(a in tuplevec_unit_strategy(),
                                             b in tuplevec_unit_strategy(),
                                             c in tuplevec_unit_strategy()) {
            use crate::aabb::Bounded;
            let t = Triangle::new(tuple_to_point(&a), tuple_to_point(&b), tuple_to_point(&c));
            prop_assert!(t.intersects_aabb(&t.aabb().expanded(1e-4)));
        }
    }
}
