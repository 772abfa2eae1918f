//! Top-down construction of a single tree.
//!
//! The builder partitions a slice of [`BuildPrimitive`]s in place and records the tree in a
//! transient arena, which is then encoded into a [`NodeBuffer`]. The arena never leaves this
//! module.

use num_traits::ToPrimitive;

use crate::aabb::{Aabb, Bounded};
use crate::axis::Axis;
use crate::bvh::node::{NodeBuffer, PackedNode, MAX_LEAF_TRIANGLES, NODE_STRIDE};
use crate::bvh::options::{BuildOptions, SplitStrategy};
use crate::geometry::TriangleMesh;
use crate::utils::Bucket;
use crate::{Point3, Real};

/// Number of bins of the SAH split search.
const NUM_BINS: usize = 32;

/// A triangle as seen by the builder.
#[derive(Debug, Copy, Clone)]
pub(crate) struct BuildPrimitive {
    /// Triangle index in the mesh.
    pub triangle: u32,
    /// Bounds of the triangle.
    pub aabb: Aabb,
    /// Center of the triangle bounds.
    pub centroid: Point3,
}

impl BuildPrimitive {
    fn new(mesh: &TriangleMesh, triangle: u32) -> BuildPrimitive {
        let aabb = mesh.triangle(triangle as usize).aabb();
        BuildPrimitive {
            triangle,
            aabb,
            centroid: aabb.center(),
        }
    }
}

/// Computes the build primitives of the triangles `triangles`.
#[cfg(feature = "rayon")]
pub(crate) fn build_primitives(
    mesh: &TriangleMesh,
    triangles: std::ops::Range<u32>,
) -> Vec<BuildPrimitive> {
    use rayon::prelude::*;

    triangles
        .into_par_iter()
        .map(|triangle| BuildPrimitive::new(mesh, triangle))
        .collect()
}

/// Computes the build primitives of the triangles `triangles`.
#[cfg(not(feature = "rayon"))]
pub(crate) fn build_primitives(
    mesh: &TriangleMesh,
    triangles: std::ops::Range<u32>,
) -> Vec<BuildPrimitive> {
    triangles
        .map(|triangle| BuildPrimitive::new(mesh, triangle))
        .collect()
}

/// Arena node. Children of internal nodes are arena indices.
#[derive(Debug, Copy, Clone)]
enum BuildNode {
    Leaf {
        aabb: Aabb,
        offset: u32,
        count: u16,
    },
    Internal {
        aabb: Aabb,
        left: usize,
        right: usize,
        split_axis: Axis,
    },
}

/// Facts collected while building one tree.
#[derive(Debug, Default, Copy, Clone)]
pub(crate) struct BuildReport {
    /// Number of leaves emitted because the depth limit was hit.
    pub depth_limited_leaves: usize,
    /// Number of times a split degenerated and the median split was used.
    pub median_fallbacks: usize,
    /// Deepest leaf.
    pub max_depth: u32,
}

struct Builder<'a> {
    options: &'a BuildOptions,
    arena: Vec<BuildNode>,
    report: BuildReport,
}

/// Builds a tree over `primitives`, reordering them into leaf order. `first` is the buffer
/// position of `primitives[0]`.
pub(crate) fn build_tree(
    primitives: &mut [BuildPrimitive],
    first: u32,
    options: &BuildOptions,
) -> (NodeBuffer, BuildReport) {
    let mut builder = Builder {
        options,
        arena: Vec::with_capacity(primitives.len() / options.max_leaf_tris.max(1) as usize * 2 + 1),
        report: BuildReport::default(),
    };
    builder.split(primitives, first, 0);

    let mut records = Vec::with_capacity(builder.arena.len());
    encode(&builder.arena, 0, &mut records);
    (NodeBuffer::from_records(records), builder.report)
}

impl Builder<'_> {
    /// Recursively builds the subtree over `primitives` and returns its arena index.
    fn split(&mut self, primitives: &mut [BuildPrimitive], offset: u32, depth: u32) -> usize {
        let aabb = primitives
            .iter()
            .fold(Aabb::empty(), |aabb, p| aabb.join(&p.aabb));
        let count = primitives.len();
        let index = self.arena.len();

        let small_enough = count <= self.options.max_leaf_tris as usize;
        let too_deep = depth >= self.options.max_depth;
        if count <= MAX_LEAF_TRIANGLES && (small_enough || too_deep) {
            if too_deep && !small_enough {
                self.report.depth_limited_leaves += 1;
            }
            self.report.max_depth = self.report.max_depth.max(depth);
            self.arena.push(BuildNode::Leaf {
                aabb,
                offset,
                count: count as u16,
            });
            return index;
        }

        let centroid_bounds = primitives
            .iter()
            .fold(Aabb::empty(), |aabb, p| aabb.grow(&p.centroid));
        let split_axis = centroid_bounds.largest_axis();

        let split = match self.options.strategy {
            SplitStrategy::Center => Some(centroid_bounds.center()[split_axis]),
            SplitStrategy::Average => {
                let sum: Real = primitives.iter().map(|p| p.centroid[split_axis]).sum();
                Some(sum / count as Real)
            }
            SplitStrategy::Sah => sah_split(primitives, &centroid_bounds, split_axis),
        };

        let mut left_count = match split {
            Some(split) => partition(primitives, split_axis, split),
            None => 0,
        };
        if left_count == 0 || left_count == count {
            // Median split on the centroids always yields two non-empty halves.
            self.report.median_fallbacks += 1;
            left_count = count / 2;
            primitives.select_nth_unstable_by(left_count, |a, b| {
                a.centroid[split_axis].total_cmp(&b.centroid[split_axis])
            });
        }

        // Placeholder until both children exist.
        self.arena.push(BuildNode::Leaf {
            aabb,
            offset,
            count: 0,
        });
        let (left_primitives, right_primitives) = primitives.split_at_mut(left_count);
        let left = self.split(left_primitives, offset, depth + 1);
        let right = self.split(right_primitives, offset + left_count as u32, depth + 1);
        self.arena[index] = BuildNode::Internal {
            aabb,
            left,
            right,
            split_axis,
        };
        index
    }
}

/// Two-pointer in-place partition. Primitives with a centroid below `split` move to the
/// front. Returns the number of primitives on the left side.
fn partition(primitives: &mut [BuildPrimitive], axis: Axis, split: Real) -> usize {
    let mut left = 0;
    let mut right = primitives.len();
    loop {
        while left < right && primitives[left].centroid[axis] < split {
            left += 1;
        }
        while left < right && primitives[right - 1].centroid[axis] >= split {
            right -= 1;
        }
        if left >= right {
            return left;
        }
        primitives.swap(left, right - 1);
        left += 1;
        right -= 1;
    }
}

/// Finds the cheapest bin boundary along `axis` and returns its position.
fn sah_split(primitives: &[BuildPrimitive], centroid_bounds: &Aabb, axis: Axis) -> Option<Real> {
    let min = centroid_bounds.min[axis];
    let extent = centroid_bounds.max[axis] - min;
    if extent <= Real::EPSILON {
        return None;
    }

    let mut bins = [Bucket::empty(); NUM_BINS];
    for primitive in primitives {
        let relative = (primitive.centroid[axis] - min) / extent;
        let bin = (relative * NUM_BINS as Real)
            .to_usize()
            .unwrap_or(0)
            .min(NUM_BINS - 1);
        bins[bin].add_aabb(&primitive.aabb);
    }

    // Sweep from the right to know the right side of every boundary.
    let mut right_buckets = [Bucket::empty(); NUM_BINS];
    let mut acc = Bucket::empty();
    for i in (1..NUM_BINS).rev() {
        acc = Bucket::join_bucket(acc, &bins[i]);
        right_buckets[i] = acc;
    }

    let mut best: Option<(Real, usize)> = None;
    let mut left = Bucket::empty();
    for i in 0..NUM_BINS - 1 {
        left = Bucket::join_bucket(left, &bins[i]);
        let right = &right_buckets[i + 1];
        if left.size == 0 || right.size == 0 {
            continue;
        }
        let cost = left.aabb.surface_area() * left.size as Real
            + right.aabb.surface_area() * right.size as Real;
        if best.map_or(true, |(best_cost, _)| cost < best_cost) {
            best = Some((cost, i));
        }
    }

    best.map(|(_, i)| min + extent * (i + 1) as Real / NUM_BINS as Real)
}

/// Writes the arena subtree rooted at `node` depth-first into `records`.
fn encode(arena: &[BuildNode], node: usize, records: &mut Vec<PackedNode>) {
    match arena[node] {
        BuildNode::Leaf {
            ref aabb,
            offset,
            count,
        } => records.push(PackedNode::leaf(aabb, offset, count)),
        BuildNode::Internal {
            ref aabb,
            left,
            right,
            split_axis,
        } => {
            let position = records.len();
            records.push(PackedNode::internal(aabb, 0, split_axis));
            encode(arena, left, records);
            let right_position = records.len();
            records[position].offset = ((right_position - position) * NODE_STRIDE) as u32;
            encode(arena, right, records);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::aabb::Aabb;
    use crate::axis::Axis;
    use crate::bvh::build::{build_primitives, build_tree, partition, sah_split, BuildPrimitive};
    use crate::bvh::node::Node;
    use crate::bvh::options::{BuildOptions, SplitStrategy};
    use crate::testbase::{create_n_cubes, default_bounds};
    use crate::Point3;

    fn points_on_x(xs: &[f32]) -> Vec<BuildPrimitive> {
        xs.iter()
            .enumerate()
            .map(|(i, &x)| {
                let p = Point3::new(x, 0.0, 0.0);
                BuildPrimitive {
                    triangle: i as u32,
                    aabb: Aabb::with_bounds(p, p),
                    centroid: p,
                }
            })
            .collect()
    }

    #[test]
    fn test_partition() {
        let mut primitives = points_on_x(&[5.0, 1.0, 4.0, 2.0, 3.0, 0.0]);
        let left = partition(&mut primitives, Axis::X, 2.5);
        assert_eq!(left, 3);
        assert!(primitives[..left].iter().all(|p| p.centroid.x < 2.5));
        assert!(primitives[left..].iter().all(|p| p.centroid.x >= 2.5));
    }

    #[test]
    fn test_sah_split_finds_gap() {
        let primitives = points_on_x(&[0.0, 0.1, 0.2, 9.8, 9.9, 10.0]);
        let centroid_bounds = primitives.iter().fold(Aabb::empty(), |a, p| a.grow(&p.centroid));
        let split = sah_split(&primitives, &centroid_bounds, Axis::X).unwrap();
        assert!(split > 0.2 && split <= 9.8);
        let point = Aabb::with_bounds(Point3::origin(), Point3::origin());
        assert!(sah_split(&primitives[..1], &point, Axis::X).is_none());
    }

    #[test]
    fn test_identical_centroids_terminate() {
        let mut primitives = points_on_x(&[1.0; 100]);
        let options = BuildOptions::default().with_max_leaf_tris(1);
        let (buffer, report) = build_tree(&mut primitives, 0, &options);
        assert!(report.median_fallbacks > 0);
        let leaves = (0..buffer.len()).filter(|&n| buffer.is_leaf(n)).count();
        assert_eq!(leaves, 100);
        assert_eq!(buffer.len(), 199);
    }

    #[test]
    fn test_depth_limit() {
        let mesh = create_n_cubes(50, &default_bounds());
        let mut primitives = build_primitives(&mesh, 0..mesh.triangle_count() as u32);
        let options = BuildOptions::default().with_max_depth(2).with_max_leaf_tris(1);
        let (buffer, report) = build_tree(&mut primitives, 0, &options);
        assert!(report.depth_limited_leaves > 0);
        assert_eq!(report.max_depth, 2);
        assert_eq!(buffer.len(), 7);
    }

    #[test]
    fn test_leaf_ranges_cover_all() {
        for strategy in [SplitStrategy::Center, SplitStrategy::Average, SplitStrategy::Sah] {
            let mesh = create_n_cubes(20, &default_bounds());
            let count = mesh.triangle_count();
            let mut primitives = build_primitives(&mesh, 0..count as u32);
            let options = BuildOptions::default().with_strategy(strategy);
            let (buffer, _) = build_tree(&mut primitives, 7, &options);

            let mut covered = vec![false; count];
            for n in 0..buffer.len() {
                if let Node::Leaf { offset, count } = buffer.node(n) {
                    assert!(count as u32 <= options.max_leaf_tris);
                    for position in offset..offset + count as u32 {
                        let local = (position - 7) as usize;
                        assert!(!covered[local]);
                        covered[local] = true;
                        // Leaf bounds contain the triangle stored at this position.
                        let triangle = primitives[local].aabb;
                        assert!(buffer.bounds(n).approx_contains_aabb_eps(&triangle, 1e-5));
                    }
                }
            }
            assert!(covered.iter().all(|&c| c));
        }
    }
}
