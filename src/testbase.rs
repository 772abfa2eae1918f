//! Common utilities shared by unit tests.
#![cfg(test)]

use std::f32::consts::PI;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;

use crate::aabb::Aabb;
use crate::geometry::TriangleMesh;
use crate::shapes::Triangle;
use crate::{Isometry3, Point3, Vector3};

/// A vector represented as a tuple
pub type TupleVec = (f32, f32, f32);

/// Initializes `env_logger` once for the test binary so `log` output shows up with
/// `--nocapture`.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -10e10 to 10e10
/// A small enough range to prevent most fp32 errors from breaking certain tests
pub fn tuplevec_small_strategy() -> impl Strategy<Value = TupleVec> {
    (
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
        -10e10_f32..10e10_f32,
    )
}

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -1 to 1.
pub fn tuplevec_unit_strategy() -> impl Strategy<Value = TupleVec> {
    (-1.0_f32..1.0_f32, -1.0_f32..1.0_f32, -1.0_f32..1.0_f32)
}

/// Convert a `TupleVec` to a [`Point3`].
pub fn tuple_to_point(tpl: &TupleVec) -> Point3 {
    Point3::new(tpl.0, tpl.1, tpl.2)
}

/// A 10x10 quad in the XZ plane centered on the origin, facing +y, made of two triangles.
pub fn quad_mesh() -> TriangleMesh {
    TriangleMesh::from_flat(
        vec![
            -5.0, 0.0, -5.0, //
            5.0, 0.0, -5.0, //
            5.0, 0.0, 5.0, //
            -5.0, 0.0, 5.0,
        ],
        Some(vec![0, 2, 1, 0, 3, 2]),
    )
    .unwrap()
}

/// A square floor of `2 * half_size` made of `cells * cells * 2` triangles, facing +y.
pub fn grid_floor(half_size: f32, cells: u32) -> TriangleMesh {
    let step = 2.0 * half_size / cells as f32;
    let mut positions = Vec::new();
    for z in 0..=cells {
        for x in 0..=cells {
            positions.push(Point3::new(
                -half_size + x as f32 * step,
                0.0,
                -half_size + z as f32 * step,
            ));
        }
    }
    let row = cells + 1;
    let mut indices = Vec::new();
    for z in 0..cells {
        for x in 0..cells {
            let i = z * row + x;
            indices.extend_from_slice(&[i, i + row + 1, i + 1, i, i + row, i + row + 1]);
        }
    }
    TriangleMesh::new(positions, Some(indices)).unwrap()
}

/// Creates a unit size cube centered at `pos` and pushes the triangles to `shapes`.
fn push_cube(pos: Point3, shapes: &mut Vec<Triangle>) {
    let top_front_right = pos + Vector3::new(0.5, 0.5, -0.5);
    let top_back_right = pos + Vector3::new(0.5, 0.5, 0.5);
    let top_back_left = pos + Vector3::new(-0.5, 0.5, 0.5);
    let top_front_left = pos + Vector3::new(-0.5, 0.5, -0.5);
    let bottom_front_right = pos + Vector3::new(0.5, -0.5, -0.5);
    let bottom_back_right = pos + Vector3::new(0.5, -0.5, 0.5);
    let bottom_back_left = pos + Vector3::new(-0.5, -0.5, 0.5);
    let bottom_front_left = pos + Vector3::new(-0.5, -0.5, -0.5);

    shapes.push(Triangle::new(top_back_right, top_front_right, top_front_left));
    shapes.push(Triangle::new(top_front_left, top_back_left, top_back_right));
    shapes.push(Triangle::new(bottom_front_left, bottom_front_right, bottom_back_right));
    shapes.push(Triangle::new(bottom_back_right, bottom_back_left, bottom_front_left));
    shapes.push(Triangle::new(top_back_left, top_front_left, bottom_front_left));
    shapes.push(Triangle::new(bottom_front_left, bottom_back_left, top_back_left));
    shapes.push(Triangle::new(bottom_front_right, top_front_right, top_back_right));
    shapes.push(Triangle::new(top_back_right, bottom_back_right, bottom_front_right));
    shapes.push(Triangle::new(top_front_left, top_front_right, bottom_front_right));
    shapes.push(Triangle::new(bottom_front_right, bottom_front_left, top_front_left));
    shapes.push(Triangle::new(bottom_back_right, top_back_right, top_back_left));
    shapes.push(Triangle::new(top_back_left, bottom_back_left, bottom_back_right));
}

/// Implementation of splitmix64.
/// For reference see: http://xoroshiro.di.unimi.it/splitmix64.c
fn splitmix64(x: &mut u64) -> u64 {
    *x = x.wrapping_add(0x9E3779B97F4A7C15u64);
    let mut z = *x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9u64);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EBu64);
    z ^ (z >> 31)
}

/// Generates a new `Point3`, which will lie inside the given `aabb`. Mutates the seed.
pub fn next_point3(seed: &mut u64, aabb: &Aabb) -> Point3 {
    let u = splitmix64(seed);
    let unit = |bits: u64| (bits & 0x1F_FFFF) as f32 / 0x1F_FFFF as f32;
    let float_vector = Vector3::new(unit(u), unit(u >> 21), unit(u >> 42));
    aabb.min + aabb.size().component_mul(&float_vector)
}

/// Creates `n` deterministic random unit cubes inside `bounds` as a non-indexed mesh.
pub fn create_n_cubes(n: usize, bounds: &Aabb) -> TriangleMesh {
    let mut triangles = Vec::new();
    let mut seed = 0;
    for _ in 0..n {
        push_cube(next_point3(&mut seed, bounds), &mut triangles);
    }
    TriangleMesh::from_triangles(&triangles).unwrap()
}

/// Returns an `Aabb` which defines the default testing space bounds.
pub fn default_bounds() -> Aabb {
    Aabb::with_bounds(
        Point3::new(-100.0, -100.0, -100.0),
        Point3::new(100.0, 100.0, 100.0),
    )
}

/// Builds a closed UV-sphere scaled by `radii` and placed by `transform`, with outward
/// facing triangles and shared vertices.
pub fn ellipsoid_mesh(
    radii: Vector3,
    transform: &Isometry3,
    stacks: u32,
    slices: u32,
) -> TriangleMesh {
    let mut positions = vec![Point3::new(0.0, 1.0, 0.0)];
    for i in 1..stacks {
        let theta = PI * i as f32 / stacks as f32;
        for j in 0..slices {
            let phi = 2.0 * PI * j as f32 / slices as f32;
            positions.push(Point3::new(
                theta.sin() * phi.cos(),
                theta.cos(),
                theta.sin() * phi.sin(),
            ));
        }
    }
    positions.push(Point3::new(0.0, -1.0, 0.0));
    let bottom = positions.len() as u32 - 1;

    let ring = |i: u32, j: u32| 1 + (i - 1) * slices + j % slices;
    let mut indices = Vec::new();
    for j in 0..slices {
        indices.extend_from_slice(&[0, ring(1, j + 1), ring(1, j)]);
    }
    for i in 1..stacks - 1 {
        for j in 0..slices {
            indices.extend_from_slice(&[ring(i, j), ring(i + 1, j + 1), ring(i + 1, j)]);
            indices.extend_from_slice(&[ring(i, j), ring(i, j + 1), ring(i + 1, j + 1)]);
        }
    }
    for j in 0..slices {
        indices.extend_from_slice(&[ring(stacks - 1, j), ring(stacks - 1, j + 1), bottom]);
    }

    let positions = positions
        .into_iter()
        .map(|p| transform * Point3::from(p.coords.component_mul(&radii)))
        .collect();
    TriangleMesh::new(positions, Some(indices)).unwrap()
}

/// A random convex closed mesh: an ellipsoid with random radii, orientation and position.
pub fn random_ellipsoid(rng: &mut StdRng) -> TriangleMesh {
    let radii = Vector3::new(
        rng.random_range(0.5..4.0),
        rng.random_range(0.5..4.0),
        rng.random_range(0.5..4.0),
    );
    let transform = Isometry3::new(random_vector(rng, 10.0), random_vector(rng, PI));
    let stacks = rng.random_range(6..20);
    let slices = rng.random_range(6..24);
    ellipsoid_mesh(radii, &transform, stacks, slices)
}

/// A random vector with every component in `-extent..extent`.
pub fn random_vector(rng: &mut StdRng, extent: f32) -> Vector3 {
    Vector3::new(
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
    )
}

/// `n` random triangles with vertices inside `-extent..extent`, without an index buffer.
pub fn random_triangle_soup(rng: &mut StdRng, n: usize, extent: f32) -> TriangleMesh {
    let triangles = (0..n)
        .map(|_| {
            let center = Point3::from(random_vector(rng, extent));
            Triangle::new(
                center + random_vector(rng, 1.0),
                center + random_vector(rng, 1.0),
                center + random_vector(rng, 1.0),
            )
        })
        .collect::<Vec<_>>();
    TriangleMesh::from_triangles(&triangles).unwrap()
}
