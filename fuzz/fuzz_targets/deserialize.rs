#![no_main]
use libfuzzer_sys::fuzz_target;
use mesh_bvh::bvh::MeshBvh;
use mesh_bvh::geometry::TriangleMesh;
use mesh_bvh::Point3;

fuzz_target!(|bytes: &[u8]| {
    let positions = (0..12)
        .map(|i| Point3::new(i as f32, (i % 3) as f32, (i % 2) as f32))
        .collect();
    let indices = (0..36).map(|i| (i * 5) % 12).collect();
    let Ok(mut mesh) = TriangleMesh::new(positions, Some(indices)) else {
        return;
    };

    // Anything that parses must be usable.
    if let Ok(bvh) = MeshBvh::deserialize(bytes, &mut mesh) {
        let _ = bvh.stats();
        let _ = bvh.validate_bounds(&mesh);
    }
});
