//! This module defines an Oriented Bounding Box and its intersection properties
use crate::aabb::{Aabb, Bounded, IntersectsAabb};
use crate::shapes::triangle::Triangle;
use crate::{Isometry3, Point3, Real, Vector3};

/// A box that can be rotated in any direction: a local [`Aabb`] placed in the world by a
/// rigid transform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrientedBox {
    /// Box in its own coordinate frame.
    pub local: Aabb,
    /// Transform from the box frame into the world.
    pub transform: Isometry3,
}

impl OrientedBox {
    /// Creates an oriented box from a local box and its world transform.
    pub fn new(local: Aabb, transform: Isometry3) -> OrientedBox {
        OrientedBox { local, transform }
    }

    /// World space center of the box.
    pub fn center(&self) -> Point3 {
        self.transform * self.local.center()
    }

    /// Half size of the box along its own axes.
    pub fn half_extents(&self) -> Vector3 {
        self.local.half_size()
    }

    /// World space directions of the three box axes.
    pub fn axes(&self) -> [Vector3; 3] {
        let rotation = self.transform.rotation;
        [
            rotation * Vector3::x(),
            rotation * Vector3::y(),
            rotation * Vector3::z(),
        ]
    }

    /// Returns true if the world space `point` lies inside the box.
    pub fn contains(&self, point: &Point3) -> bool {
        self.local
            .contains(&self.transform.inverse_transform_point(point))
    }

    /// Returns true if the box overlaps the world space `triangle`.
    pub fn intersects_triangle(&self, triangle: &Triangle) -> bool {
        let local = Triangle::new(
            self.transform.inverse_transform_point(&triangle.a),
            self.transform.inverse_transform_point(&triangle.b),
            self.transform.inverse_transform_point(&triangle.c),
        );
        local.intersects_aabb(&self.local)
    }

    /// Returns true if every corner of `aabb` lies inside the box.
    pub fn contains_aabb(&self, aabb: &Aabb) -> bool {
        aabb.corners().iter().all(|corner| self.contains(corner))
    }
}

impl Bounded for OrientedBox {
    fn aabb(&self) -> Aabb {
        self.local.transformed(&self.transform)
    }
}

impl IntersectsAabb for OrientedBox {
    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let axes_a = self.axes();
        let half_a = self.half_extents();
        let axes_b = [Vector3::x(), Vector3::y(), Vector3::z()];
        let half_b = aabb.half_size();
        let translation = aabb.center() - self.center();

        let separated = |axis: &Vector3| -> bool {
            if axis.norm_squared() < 1e-12 {
                return false;
            }
            let ra = (0..3)
                .map(|i| half_a[i] * axes_a[i].dot(axis).abs())
                .sum::<Real>();
            let rb = (0..3)
                .map(|i| half_b[i] * axes_b[i].dot(axis).abs())
                .sum::<Real>();
            translation.dot(axis).abs() > ra + rb
        };

        for axis in axes_a.iter().chain(axes_b.iter()) {
            if separated(axis) {
                return false;
            }
        }
        for a in axes_a.iter() {
            for b in axes_b.iter() {
                if separated(&a.cross(b)) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::aabb::{Aabb, Bounded, IntersectsAabb};
    use crate::shapes::obb::OrientedBox;
    use crate::shapes::triangle::Triangle;
    use crate::{Isometry3, Point3, Real, Vector3};

    fn unit_box() -> Aabb {
        Aabb::with_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn basic_obb() {
        let local = Aabb::with_bounds(Point3::new(-0.5, -0.5, -0.5), Point3::new(0.5, 0.5, 0.5));
        let transform = Isometry3::new(
            Vector3::new(0.5, 1.6, 0.5),
            Vector3::x() * (std::f32::consts::PI as Real / 4.0),
        );
        let obb = OrientedBox::new(local, transform);

        // Rotated by 45 degrees the box reaches down to 1.6 - sqrt(0.5).
        assert!(obb.intersects_aabb(&unit_box()));

        let tilted = Isometry3::new(Vector3::new(0.5, 1.8, 0.5), Vector3::x() * 0.785);
        let lifted = OrientedBox::new(local, tilted);
        assert!(!lifted.intersects_aabb(&unit_box()));
    }

    #[test]
    fn test_obb_bounds_and_containment() {
        let local = Aabb::with_bounds(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let transform = Isometry3::new(Vector3::new(10.0, 0.0, 0.0), Vector3::y() * 0.5);
        let obb = OrientedBox::new(local, transform);
        assert!(obb.contains(&Point3::new(10.0, 0.0, 0.0)));
        assert!(!obb.contains(&Point3::new(0.0, 0.0, 0.0)));
        assert!(obb.aabb().contains(&obb.center()));
    }

    #[test]
    fn test_obb_triangle() {
        let obb = OrientedBox::new(unit_box(), Isometry3::translation(0.0, 2.0, 0.0));
        let inside = Triangle::new(
            Point3::new(0.2, 2.5, 0.2),
            Point3::new(0.8, 2.5, 0.2),
            Point3::new(0.5, 2.5, 0.8),
        );
        let below = Triangle::new(
            Point3::new(0.2, 0.5, 0.2),
            Point3::new(0.8, 0.5, 0.2),
            Point3::new(0.5, 0.5, 0.8),
        );
        assert!(obb.intersects_triangle(&inside));
        assert!(!obb.intersects_triangle(&below));
    }
}
