//! This module defines Capsules and their intersection algorithms
use crate::aabb::{Aabb, Bounded, IntersectsAabb};
use crate::ray::Ray;
use crate::shapes::sphere::Sphere;
use crate::shapes::triangle::Triangle;
use crate::utils::closest_param_on_segment;
use crate::{Isometry3, Point3, Real, Vector3};

/// Representation of a capsule: all points within `radius` of the segment `start..end`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capsule {
    /// Start point of the line segment for the capsule
    pub start: Point3,
    /// End point of the line segment for the capsule
    pub end: Point3,
    /// Radius of the capsule
    pub radius: Real,
}

/// Closest features between a [`Capsule`] segment and a [`Triangle`].
#[derive(Debug, Clone, Copy)]
pub struct CapsuleContact {
    /// Point on the capsule segment.
    pub on_segment: Point3,
    /// Point on the triangle.
    pub on_triangle: Point3,
    /// Distance between the two points.
    pub distance: Real,
}

impl CapsuleContact {
    /// Penetration depth of the capsule surface into the triangle, zero when apart.
    pub fn depth(&self, radius: Real) -> Real {
        (radius - self.distance).max(0.0)
    }
}

impl Capsule {
    /// Creates a capsule given a start and end point for the center line and the radius around it
    pub fn new(start: Point3, end: Point3, radius: Real) -> Capsule {
        Capsule { start, end, radius }
    }

    /// Length of the capsule's line segment.
    pub fn length(&self) -> Real {
        (self.end - self.start).norm()
    }

    /// Returns the point of the center segment closest to `point`.
    pub fn closest_point_on_segment(&self, point: &Point3) -> Point3 {
        let t = closest_param_on_segment(&self.start, &self.end, point);
        self.start + (self.end - self.start) * t
    }

    /// Moves both segment end points by `offset`.
    pub fn translate(&mut self, offset: &Vector3) {
        self.start += offset;
        self.end += offset;
    }

    /// Returns this capsule with `transform` applied to the segment. The radius is kept.
    pub fn transformed(&self, transform: &Isometry3) -> Capsule {
        Capsule::new(transform * self.start, transform * self.end, self.radius)
    }

    /// Returns the closest features between the center segment and `triangle`, or `None` for
    /// degenerate triangles.
    pub fn contact_with_triangle(&self, triangle: &Triangle) -> Option<CapsuleContact> {
        triangle
            .closest_points_to_segment(&self.start, &self.end)
            .map(|(on_segment, on_triangle)| CapsuleContact {
                on_segment,
                on_triangle,
                distance: (on_segment - on_triangle).norm(),
            })
    }

    /// Returns true if the capsule overlaps `triangle`.
    pub fn intersects_triangle(&self, triangle: &Triangle) -> bool {
        self.contact_with_triangle(triangle)
            .map_or(false, |contact| contact.distance < self.radius)
    }
}

impl Bounded for Capsule {
    fn aabb(&self) -> Aabb {
        Aabb::empty()
            .grow(&self.start)
            .grow(&self.end)
            .expanded(self.radius)
    }
}

impl IntersectsAabb for Capsule {
    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        // Conservative reject: the segment must reach the box grown by the radius.
        let inflated = aabb.expanded(self.radius);
        let length = self.length();
        if length <= Real::EPSILON {
            return Sphere::new(self.start, self.radius).intersects_aabb(aabb);
        }
        let ray = Ray::new(self.start, self.end - self.start);
        match ray.intersection_slice_for_aabb(&inflated) {
            Some((entry, _)) if entry <= length => {}
            _ => return false,
        }

        // The squared distance from the segment to the box is convex in the segment
        // parameter, so a ternary search finds its minimum.
        let radius_squared = self.radius * self.radius;
        let distance_at = |t: Real| {
            let point = self.start + (self.end - self.start) * t;
            aabb.distance_squared_to_point(&point)
        };
        let (mut lo, mut hi) = (0.0, 1.0);
        for _ in 0..48 {
            let m1 = lo + (hi - lo) / 3.0;
            let m2 = hi - (hi - lo) / 3.0;
            let (d1, d2) = (distance_at(m1), distance_at(m2));
            if d1 <= radius_squared || d2 <= radius_squared {
                return true;
            }
            if d1 < d2 {
                hi = m2;
            } else {
                lo = m1;
            }
        }
        distance_at(0.0) <= radius_squared
            || distance_at(1.0) <= radius_squared
            || distance_at((lo + hi) * 0.5) <= radius_squared
    }
}
