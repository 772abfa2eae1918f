//! This module defines a Sphere and its intersection algorithms

use crate::aabb::{Aabb, Bounded, IntersectsAabb};
use crate::{Point3, Real, Vector3};

/// A representation of a Sphere
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sphere {
    /// Center of the sphere
    pub center: Point3,
    /// Radius of the sphere
    pub radius: Real,
}

impl Sphere {
    /// Creates a sphere centered on a given point with a radius
    pub fn new(center: Point3, radius: Real) -> Sphere {
        Sphere { center, radius }
    }

    /// Returns true if `point` lies inside or on the sphere.
    pub fn contains(&self, point: &Point3) -> bool {
        (point - self.center).norm_squared() <= self.radius * self.radius
    }

    /// Returns true if the whole `aabb` lies inside the sphere.
    pub fn contains_aabb(&self, aabb: &Aabb) -> bool {
        // The farthest corner decides.
        let mut distance_squared = 0.0;
        for i in 0..3 {
            let d = (self.center[i] - aabb.min[i]).abs().max((aabb.max[i] - self.center[i]).abs());
            distance_squared += d * d;
        }
        distance_squared <= self.radius * self.radius
    }
}

impl IntersectsAabb for Sphere {
    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        aabb.distance_squared_to_point(&self.center) <= self.radius * self.radius
    }
}

impl Bounded for Sphere {
    fn aabb(&self) -> Aabb {
        let min = self.center - Vector3::repeat(self.radius);
        let max = self.center + Vector3::repeat(self.radius);
        Aabb::with_bounds(min, max)
    }
}

#[cfg(test)]
mod tests {
    use crate::aabb::{Aabb, IntersectsAabb};
    use crate::shapes::sphere::Sphere;
    use crate::Point3;

    #[test]
    fn test_sphere_aabb() {
        let aabb = Aabb::with_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(Sphere::new(Point3::new(2.0, 0.5, 0.5), 1.0).intersects_aabb(&aabb));
        assert!(!Sphere::new(Point3::new(2.0, 2.0, 2.0), 1.0).intersects_aabb(&aabb));
        assert!(Sphere::new(Point3::new(0.5, 0.5, 0.5), 0.9).contains_aabb(&aabb));
        assert!(!Sphere::new(Point3::new(0.5, 0.5, 0.5), 0.8).contains_aabb(&aabb));
    }
}
