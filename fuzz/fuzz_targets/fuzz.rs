#![no_main]
use std::collections::HashSet;
use std::fmt::{self, Debug, Formatter};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mesh_bvh::bvh::{BuildOptions, MeshBvh, RaycastOptions, SplitStrategy};
use mesh_bvh::geometry::TriangleMesh;
use mesh_bvh::ray::Ray;
use mesh_bvh::{Point3, Vector3};
use ordered_float::NotNan;

type Float = f32;
const LIMIT: Float = 1_000.0;

fuzz_target!(|workload: Workload| {
    workload.fuzz();
});

#[derive(Arbitrary)]
struct ArbitraryPoint {
    coordinates: [NotNan<Float>; 3],
}

impl ArbitraryPoint {
    fn point(&self) -> Point3 {
        let [x, y, z] = self.coordinates.map(|f| f.into_inner().clamp(-LIMIT, LIMIT));
        Point3::new(x, y, z)
    }
}

impl Debug for ArbitraryPoint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.point(), f)
    }
}

#[derive(Arbitrary)]
struct ArbitraryRay {
    origin: ArbitraryPoint,
    destination: ArbitraryPoint,
}

impl Debug for ArbitraryRay {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.ray(), f)
    }
}

impl ArbitraryRay {
    fn ray(&self) -> Ray {
        let mut direction = self.destination.point() - self.origin.point();
        // Ensure no degenerate direction.
        if direction.norm() < 1e-3 {
            direction = Vector3::new(1.0, 1.0, 1.0);
        }
        Ray::new(self.origin.point(), direction)
    }
}

#[derive(Debug, Arbitrary)]
struct Move {
    vertex: usize,
    position: ArbitraryPoint,
}

#[derive(Debug, Arbitrary)]
struct Workload {
    vertices: Vec<ArbitraryPoint>,
    indices: Option<Vec<u16>>,
    strategy: u8,
    max_leaf_tris: u8,
    indirect: bool,
    ray: ArbitraryRay,
    moves: Vec<Move>,
}

impl Workload {
    fn options(&self) -> BuildOptions {
        let strategy = match self.strategy % 3 {
            0 => SplitStrategy::Center,
            1 => SplitStrategy::Average,
            _ => SplitStrategy::Sah,
        };
        BuildOptions::default()
            .with_strategy(strategy)
            .with_max_leaf_tris(1 + u32::from(self.max_leaf_tris % 16))
            .with_indirect(self.indirect)
            .with_verbose(false)
    }

    fn fuzz(self) {
        if self.vertices.len() > 300 {
            return;
        }
        let positions: Vec<Point3> = self.vertices.iter().map(ArbitraryPoint::point).collect();
        let indices = self
            .indices
            .as_ref()
            .map(|indices| indices.iter().map(|&i| u32::from(i)).collect::<Vec<_>>());
        let Ok(mut mesh) = TriangleMesh::new(positions, indices) else {
            return;
        };
        let mut bvh = MeshBvh::build(&mut mesh, &self.options()).unwrap();
        let ray = self.ray.ray();
        let options = RaycastOptions::default();

        let mut moves = self.moves.iter();
        loop {
            assert!(bvh.validate_bounds(&mesh));

            let hits = bvh.raycast(&mesh, &ray, &options);
            let first = bvh.raycast_first(&mesh, &ray, &options);
            assert_eq!(hits.is_empty(), first.is_none());
            if let (Some(nearest), Some(first)) = (hits.first(), first) {
                let tolerance = 1e-3 * nearest.distance.max(1.0);
                assert!((nearest.distance - first.distance).abs() <= tolerance);
            }
            let faces = hits.iter().map(|hit| hit.face_index).collect::<HashSet<_>>();
            assert!(faces.iter().all(|&face| (face as usize) < mesh.triangle_count()));

            let bytes = bvh.serialize(&mesh);
            let mut copy = mesh.clone();
            let restored = MeshBvh::deserialize(&bytes, &mut copy).unwrap();
            assert_eq!(restored.serialize(&copy), bytes);

            let Some(next) = moves.next() else {
                break;
            };
            if mesh.vertex_count() == 0 {
                break;
            }
            mesh.set_position(next.vertex % mesh.vertex_count(), next.position.point());
            bvh.refit(&mesh, None);
        }
    }
}
