//! Boolean overlap tests against boxes, spheres and other meshes.

use crate::aabb::{Aabb, Bounded, IntersectsAabb};
use crate::bvh::bvhcast::BvhcastVisitor;
use crate::bvh::mesh_bvh::MeshBvh;
use crate::bvh::shapecast::{BoundsHit, ShapecastVisitor};
use crate::geometry::TriangleMesh;
use crate::shapes::{OrientedBox, Sphere, Triangle};
use crate::{Isometry3, Real};

struct BoxOverlap<'a>(&'a OrientedBox);

impl ShapecastVisitor for BoxOverlap<'_> {
    fn intersects_bounds(&mut self, bounds: &Aabb, _: bool, _: Option<Real>, _: u32) -> BoundsHit {
        if self.0.contains_aabb(bounds) {
            BoundsHit::Contained
        } else if self.0.intersects_aabb(bounds) {
            BoundsHit::Intersects
        } else {
            BoundsHit::Outside
        }
    }

    fn intersects_triangle(
        &mut self,
        triangle: &Triangle,
        _: u32,
        contained: bool,
        _: u32,
    ) -> bool {
        contained || self.0.intersects_triangle(triangle)
    }
}

struct SphereOverlap<'a>(&'a Sphere);

impl ShapecastVisitor for SphereOverlap<'_> {
    fn intersects_bounds(&mut self, bounds: &Aabb, _: bool, _: Option<Real>, _: u32) -> BoundsHit {
        if self.0.contains_aabb(bounds) {
            BoundsHit::Contained
        } else if self.0.intersects_aabb(bounds) {
            BoundsHit::Intersects
        } else {
            BoundsHit::Outside
        }
    }

    fn intersects_triangle(
        &mut self,
        triangle: &Triangle,
        _: u32,
        contained: bool,
        _: u32,
    ) -> bool {
        contained || triangle.intersects_sphere(self.0)
    }
}

/// Tests a single foreign triangle, already in mesh space, against the hierarchy.
struct TriangleOverlap {
    triangle: Triangle,
    aabb: Aabb,
}

impl ShapecastVisitor for TriangleOverlap {
    fn intersects_bounds(&mut self, bounds: &Aabb, _: bool, _: Option<Real>, _: u32) -> BoundsHit {
        if self.aabb.intersects(bounds) && self.triangle.intersects_aabb(bounds) {
            BoundsHit::Intersects
        } else {
            BoundsHit::Outside
        }
    }

    fn intersects_triangle(&mut self, triangle: &Triangle, _: u32, _: bool, _: u32) -> bool {
        triangle.intersects_triangle(&self.triangle)
    }
}

struct TrianglePairs;

impl BvhcastVisitor for TrianglePairs {
    fn intersects_triangles(
        &mut self,
        triangle: &Triangle,
        other: &Triangle,
        _: u32,
        _: u32,
    ) -> bool {
        triangle.intersects_triangle(other)
    }
}

impl MeshBvh {
    /// Returns true if any triangle of `mesh` touches `obb`.
    ///
    /// # Examples
    /// ```
    /// use mesh_bvh::aabb::Aabb;
    /// use mesh_bvh::bvh::{BuildOptions, MeshBvh};
    /// use mesh_bvh::geometry::TriangleMesh;
    /// use mesh_bvh::shapes::OrientedBox;
    /// use mesh_bvh::{Isometry3, Point3};
    ///
    /// let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mut mesh = TriangleMesh::from_flat(positions, None).unwrap();
    /// let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
    ///
    /// let unit = Aabb::with_bounds(Point3::new(-0.1, -0.1, -0.1), Point3::new(0.1, 0.1, 0.1));
    /// assert!(bvh.intersects_box(&mesh, &OrientedBox::new(unit, Isometry3::identity())));
    /// let lifted = Isometry3::translation(0.0, 0.0, 1.0);
    /// assert!(!bvh.intersects_box(&mesh, &OrientedBox::new(unit, lifted)));
    /// ```
    pub fn intersects_box(&self, mesh: &TriangleMesh, obb: &OrientedBox) -> bool {
        self.shapecast(mesh, &mut BoxOverlap(obb))
    }

    /// Returns true if any triangle of `mesh` touches `sphere`.
    pub fn intersects_sphere(&self, mesh: &TriangleMesh, sphere: &Sphere) -> bool {
        self.shapecast(mesh, &mut SphereOverlap(sphere))
    }

    /// Returns true if any triangle of `mesh` intersects a triangle of `other_mesh`.
    /// `other_to_self` maps the space of `other_mesh` into the space of `mesh`. When the
    /// hierarchy of `other_mesh` is supplied both trees are descended together, otherwise
    /// every triangle of `other_mesh` is cast against this hierarchy.
    pub fn intersects_geometry(
        &self,
        mesh: &TriangleMesh,
        other_mesh: &TriangleMesh,
        other_to_self: &Isometry3,
        other: Option<&MeshBvh>,
    ) -> bool {
        if let Some(other) = other {
            return self.bvhcast(mesh, other, other_mesh, other_to_self, &mut TrianglePairs);
        }

        let bounds = self.bounding_box();
        other_mesh.triangles().any(|triangle| {
            let triangle = triangle.transformed(other_to_self);
            let aabb = triangle.aabb();
            aabb.intersects(&bounds)
                && self.shapecast(mesh, &mut TriangleOverlap { triangle, aabb })
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::aabb::Aabb;
    use crate::bvh::{BuildOptions, MeshBvh};
    use crate::shapes::{OrientedBox, Sphere};
    use crate::testbase::{
        create_n_cubes, default_bounds, quad_mesh, random_triangle_soup, random_vector,
    };
    use crate::{Isometry3, Point3, Vector3};

    #[test]
    fn test_intersects_box_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(31);
        let mut mesh = random_triangle_soup(&mut rng, 300, 20.0);
        let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();

        let mut hits = 0;
        for _ in 0..200 {
            let local =
                Aabb::with_bounds(Point3::new(-1.0, -0.5, -2.0), Point3::new(1.0, 0.5, 2.0));
            let transform =
                Isometry3::new(random_vector(&mut rng, 20.0), random_vector(&mut rng, 3.0));
            let obb = OrientedBox::new(local, transform);
            let expected = mesh.triangles().any(|t| obb.intersects_triangle(&t));
            assert_eq!(bvh.intersects_box(&mesh, &obb), expected);
            hits += expected as usize;
        }
        assert!(hits > 0);
    }

    #[test]
    fn test_intersects_sphere() {
        let mut mesh = quad_mesh();
        let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
        assert!(bvh.intersects_sphere(&mesh, &Sphere::new(Point3::new(4.0, 0.5, 4.0), 0.6)));
        assert!(!bvh.intersects_sphere(&mesh, &Sphere::new(Point3::new(4.0, 0.5, 4.0), 0.4)));
        // Engulfing sphere takes the contained path.
        assert!(bvh.intersects_sphere(&mesh, &Sphere::new(Point3::origin(), 100.0)));

        let mut cubes = create_n_cubes(50, &default_bounds());
        let bvh = MeshBvh::build(&mut cubes, &BuildOptions::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            let sphere = Sphere::new(Point3::from(random_vector(&mut rng, 100.0)), 10.0);
            let expected = cubes.triangles().any(|t| t.intersects_sphere(&sphere));
            assert_eq!(bvh.intersects_sphere(&cubes, &sphere), expected);
        }
    }

    #[test]
    fn test_intersects_geometry() {
        let mut mesh = quad_mesh();
        let bvh = MeshBvh::build(&mut mesh, &BuildOptions::default()).unwrap();
        let mut other_mesh = quad_mesh();
        let other = MeshBvh::build(&mut other_mesh, &BuildOptions::default()).unwrap();

        let crossing = Isometry3::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.2));
        let above = Isometry3::new(Vector3::new(0.0, 0.5, 0.0), Vector3::new(0.0, 0.3, 0.0));

        for other_bvh in [None, Some(&other)] {
            assert!(bvh.intersects_geometry(&mesh, &other_mesh, &crossing, other_bvh));
            assert!(!bvh.intersects_geometry(&mesh, &other_mesh, &above, other_bvh));
        }
    }
}
