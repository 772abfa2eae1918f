//! This module defines a Ray structure and intersection algorithms
//! for axis aligned bounding boxes and triangles.

use crate::aabb::{Aabb, IntersectsAabb};
use crate::utils::{fast_max, fast_min};
use crate::{Isometry3, Point3, Real, Vector3};

/// Selects which faces of a triangle a [`Ray`] can hit.
///
/// A triangle `(a, b, c)` faces the direction of `(b - a) × (c - a)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    /// Only hits triangles whose normal points towards the ray origin.
    Front,
    /// Only hits triangles whose normal points away from the ray origin.
    Back,
    /// Hits triangles from both sides.
    #[default]
    Double,
}

/// A struct which defines a ray and some of its cached values.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The ray origin.
    pub origin: Point3,

    /// The ray direction.
    pub direction: Vector3,

    /// Inverse (1/x) ray direction. Cached for use in [`Aabb`] intersections.
    pub inv_direction: Vector3,
}

/// A struct which is returned by the [`Ray::intersects_triangle()`] method.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    /// Distance from the ray origin to the intersection point.
    pub distance: Real,

    /// U coordinate of the intersection.
    pub u: Real,

    /// V coordinate of the intersection.
    pub v: Real,

    /// True when the ray hit the back face of the triangle.
    pub back_face: bool,
}

impl Intersection {
    /// Constructs an [`Intersection`]. `distance` should be set to positive infinity,
    /// if the intersection does not occur.
    pub fn new(distance: Real, u: Real, v: Real) -> Intersection {
        Intersection {
            distance,
            u,
            v,
            back_face: false,
        }
    }

    /// Returns true if the intersection occurred.
    pub fn is_hit(&self) -> bool {
        self.distance.is_finite()
    }
}

impl Ray {
    /// Creates a new [`Ray`] from an `origin` and a `direction`.
    /// `direction` will be normalized.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::ray::Ray;
    /// use mesh_bvh::{Point3, Vector3};
    ///
    /// let origin = Point3::new(0.0,0.0,0.0);
    /// let direction = Vector3::new(1.0,0.0,0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// assert_eq!(ray.origin, origin);
    /// assert_eq!(ray.direction, direction);
    /// ```
    pub fn new(origin: Point3, direction: Vector3) -> Ray {
        let direction = direction.normalize();
        Ray {
            origin,
            direction,
            inv_direction: direction.map(|x| 1.0 / x),
        }
    }

    /// Returns the point at distance `t` along the ray.
    pub fn at(&self, t: Real) -> Point3 {
        self.origin + self.direction * t
    }

    /// Returns this ray with `transform` applied to its origin and direction.
    pub fn transformed(&self, transform: &Isometry3) -> Ray {
        Ray::new(transform * self.origin, transform * self.direction)
    }

    /// Tests the intersection of a [`Ray`] with an [`Aabb`] using the slab method.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::aabb::Aabb;
    /// use mesh_bvh::ray::Ray;
    /// use mesh_bvh::{Point3, Vector3};
    ///
    /// let origin = Point3::new(0.0,0.0,0.0);
    /// let direction = Vector3::new(1.0,0.0,0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// let point1 = Point3::new(99.9,-1.0,-1.0);
    /// let point2 = Point3::new(100.1,1.0,1.0);
    /// let aabb = Aabb::with_bounds(point1, point2);
    ///
    /// assert!(ray.intersects_aabb(&aabb));
    /// ```
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.intersection_slice_for_aabb(aabb).is_some()
    }

    /// Intersect [`Aabb`] by [`Ray`].
    ///
    /// Returns the distances from the ray origin to the entry and the exit point, or `None`
    /// when the ray misses the box. The entry distance is clamped to zero when the origin
    /// lies inside the box.
    pub fn intersection_slice_for_aabb(&self, aabb: &Aabb) -> Option<(Real, Real)> {
        let mut entry_distance = Real::NEG_INFINITY;
        let mut exit_distance = Real::INFINITY;
        for i in 0..3 {
            let t1 = (aabb.min[i] - self.origin[i]) * self.inv_direction[i];
            let t2 = (aabb.max[i] - self.origin[i]) * self.inv_direction[i];
            // NaN (origin on a slab plane of a parallel ray) leaves the interval unchanged.
            entry_distance = fast_max(fast_min(t1, t2), entry_distance);
            exit_distance = fast_min(fast_max(t1, t2), exit_distance);
        }

        if entry_distance > exit_distance || exit_distance < 0.0 {
            return None;
        }

        Some((fast_max(entry_distance, 0.0), exit_distance))
    }

    /// Implementation of the
    /// [Möller-Trumbore triangle/ray intersection algorithm][moller-trumbore].
    /// Returns the distance to the intersection, as well as
    /// the u and v coordinates of the intersection.
    /// The distance is set to +INFINITY if the ray does not intersect the triangle, or hits
    /// a face excluded by `side`.
    ///
    /// [moller-trumbore]: https://en.wikipedia.org/wiki/Möller–Trumbore_intersection_algorithm
    #[allow(clippy::many_single_char_names)]
    pub fn intersects_triangle(
        &self,
        a: &Point3,
        b: &Point3,
        c: &Point3,
        side: Side,
    ) -> Intersection {
        let a_to_b = *b - *a;
        let a_to_c = *c - *a;

        // u_vec lies in view plane
        let u_vec = self.direction.cross(&a_to_c);

        // det = 0 => [dir, a_to_b, a_to_c] not linearly independent, ray lies in the plane
        // det > 0 => the ray sees the front face
        let det = a_to_b.dot(&u_vec);
        let back_face = det < 0.0;

        let culled = match side {
            Side::Front => det < Real::EPSILON,
            Side::Back => det > -Real::EPSILON,
            Side::Double => det.abs() < Real::EPSILON,
        };
        if culled {
            return Intersection::new(Real::INFINITY, 0.0, 0.0);
        }

        let inv_det = 1.0 / det;

        // Vector from point a to ray origin
        let a_to_origin = self.origin - *a;

        // Test bounds: u < 0 || u > 1 => outside of triangle
        let u = a_to_origin.dot(&u_vec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return Intersection::new(Real::INFINITY, u, 0.0);
        }

        let v_vec = a_to_origin.cross(&a_to_b);
        let v = self.direction.dot(&v_vec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return Intersection::new(Real::INFINITY, u, v);
        }

        let dist = a_to_c.dot(&v_vec) * inv_det;

        if dist > Real::EPSILON {
            Intersection {
                distance: dist,
                u,
                v,
                back_face,
            }
        } else {
            Intersection::new(Real::INFINITY, u, v)
        }
    }
}

impl IntersectsAabb for Ray {
    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.intersects_aabb(aabb)
    }
}

#[cfg(test)]
mod tests {
    use std::cmp;

    use crate::aabb::Aabb;
    use crate::ray::{Ray, Side};
    use crate::testbase::{tuple_to_point, tuplevec_small_strategy, TupleVec};
    use crate::{Point3, Vector3};

    use float_eq::assert_float_eq;
    use proptest::prelude::*;

    /// Generates a random [`Ray`] which points at at a random [`Aabb`].
    fn gen_ray_to_aabb(data: (TupleVec, TupleVec, TupleVec)) -> (Ray, Aabb) {
        let aabb = Aabb::empty()
            .grow(&tuple_to_point(&data.0))
            .grow(&tuple_to_point(&data.1));

        let center = aabb.center();

        let pos = tuple_to_point(&data.2);
        let ray = Ray::new(pos, center - pos);
        (ray, aabb)
    }

    /// Make sure a ray can intersect an AABB with no depth.
    #[test]
    fn ray_hits_zero_depth_aabb() {
        let origin = Point3::new(0.0, 0.0, 0.0);
        let direction = Vector3::new(0.0, 0.0, 1.0);
        let ray = Ray::new(origin, direction);
        let min = Point3::new(-1.0, -1.0, 1.0);
        let max = Point3::new(1.0, 1.0, 1.0);
        let aabb = Aabb::with_bounds(min, max);
        assert!(ray.intersects_aabb(&aabb));
        let (entry, exit) = ray.intersection_slice_for_aabb(&aabb).unwrap();
        assert_float_eq!(entry, 1.0, abs <= 1e-6);
        assert_float_eq!(exit, 1.0, abs <= 1e-6);
    }

    #[test]
    fn ray_side_selection() {
        // Counter-clockwise seen from +z, so the front face points at +z.
        let a = Point3::new(-1.0, -1.0, 0.0);
        let b = Point3::new(1.0, -1.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        let from_front = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let from_back = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));

        let hit = from_front.intersects_triangle(&a, &b, &c, Side::Front);
        assert_float_eq!(hit.distance, 5.0, abs <= 1e-5);
        assert!(!hit.back_face);
        assert!(!from_front.intersects_triangle(&a, &b, &c, Side::Back).is_hit());

        assert!(!from_back.intersects_triangle(&a, &b, &c, Side::Front).is_hit());
        let hit = from_back.intersects_triangle(&a, &b, &c, Side::Back);
        assert!(hit.is_hit() && hit.back_face);
        assert!(from_back.intersects_triangle(&a, &b, &c, Side::Double).is_hit());
    }

    proptest! {
        // Test whether a `Ray` which points at the center of an `Aabb` intersects it.
        #[test]
        fn test_ray_points_at_aabb_center(data in (tuplevec_small_strategy(),
                                                   tuplevec_small_strategy(),
                                                   tuplevec_small_strategy())) {
            let (ray, aabb) = gen_ray_to_aabb(data);
            prop_assert!(ray.intersects_aabb(&aabb));
        }

        // Test whether a `Ray` which points away from the center of an `Aabb`
        // does not intersect it, unless its origin is inside the `Aabb`.
        #[test]
        fn test_ray_points_from_aabb_center(data in (tuplevec_small_strategy(),
                                                     tuplevec_small_strategy(),
                                                     tuplevec_small_strategy())) {
            let (ray, aabb) = gen_ray_to_aabb(data);
            let ray = Ray::new(ray.origin, -ray.direction);
            prop_assert!(!ray.intersects_aabb(&aabb) || aabb.contains(&ray.origin));
        }

        // Test whether a `Ray` which points at the center of an `Aabb` takes intersection slice.
        #[test]
        fn test_ray_slice_at_aabb_center(data in (tuplevec_small_strategy(),
                                                  tuplevec_small_strategy(),
                                                  tuplevec_small_strategy())) {
            let (ray, aabb) = gen_ray_to_aabb(data);
            let slice = ray.intersection_slice_for_aabb(&aabb);
            prop_assert!(slice.is_some());
            let (start_dist, end_dist) = slice.unwrap();
            prop_assert!(start_dist <= end_dist);
            prop_assert!(start_dist >= 0.0);
        }

        // Test whether a `Ray` which points at the center of a triangle
        // intersects it, unless it sees the back face, which is culled.
        #[test]
        fn test_ray_hits_triangle(a in tuplevec_small_strategy(),
                                  b in tuplevec_small_strategy(),
                                  c in tuplevec_small_strategy(),
                                  origin in tuplevec_small_strategy(),
                                  u: u16,
                                  v: u16) {
            let triangle = (tuple_to_point(&a), tuple_to_point(&b), tuple_to_point(&c));
            let u_vec = triangle.1 - triangle.0;
            let v_vec = triangle.2 - triangle.0;
            let normal = u_vec.cross(&v_vec);

            // Get some u and v coordinates such that u+v <= 1
            let u = u % 101;
            let v = cmp::min(100 - u, v % 101);
            let u = u as f32 / 100.0;
            let v = v as f32 / 100.0;

            let point_on_triangle = triangle.0 + u * u_vec + v * v_vec;

            let origin = tuple_to_point(&origin);
            let ray = Ray::new(origin, point_on_triangle - origin);
            let on_back_side = normal.dot(&(ray.origin - triangle.0)) <= 0.0;

            let intersects =
                ray.intersects_triangle(&triangle.0, &triangle.1, &triangle.2, Side::Front);
            let uv_sum = intersects.u + intersects.v;

            if on_back_side {
                prop_assert!(intersects.distance == f32::INFINITY);
            } else {
                let intersection_inside =
                    (0.0..=1.0).contains(&uv_sum) && intersects.distance < f32::INFINITY;

                // Or the input data was close to the border
                let close_to_border = u.abs() < f32::EPSILON
                    || (u - 1.0).abs() < f32::EPSILON
                    || v.abs() < f32::EPSILON
                    || (v - 1.0).abs() < f32::EPSILON
                    || (u + v - 1.0).abs() < f32::EPSILON;

                prop_assert!(intersection_inside || close_to_border);
            }
        }
    }
}
