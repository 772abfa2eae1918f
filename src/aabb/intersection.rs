use crate::aabb::Aabb;
use crate::Point3;

/// A trait implemented by things that may or may not intersect an AABB and, by extension,
/// things that can be used to cull subtrees while traversing a BVH.
pub trait IntersectsAabb {
    /// Returns whether this object intersects an [`Aabb`].
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::aabb::{Aabb, IntersectsAabb};
    /// use mesh_bvh::Point3;
    ///
    /// struct XyPlane;
    ///
    /// impl IntersectsAabb for XyPlane {
    ///     fn intersects_aabb(&self, aabb: &Aabb) -> bool {
    ///         aabb.min[2] <= 0.0 && aabb.max[2] >= 0.0
    ///     }
    /// }
    ///
    /// let xy_plane = XyPlane;
    /// let aabb = Aabb::with_bounds(Point3::new(-1.0,-1.0,-1.0), Point3::new(1.0,1.0,1.0));
    /// assert!(xy_plane.intersects_aabb(&aabb));
    /// ```
    ///
    fn intersects_aabb(&self, aabb: &Aabb) -> bool;
}

impl IntersectsAabb for Aabb {
    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.intersects(aabb)
    }
}

impl IntersectsAabb for Point3 {
    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        aabb.contains(self)
    }
}
