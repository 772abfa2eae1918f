//! Build and query configuration.

use crate::error::{BvhError, Result};
use crate::ray::Side;
use crate::Real;

/// Heuristic used to choose the split plane of an internal node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SplitStrategy {
    /// Midpoint of the longest axis of the centroid bounds.
    #[default]
    Center,
    /// Mean of the triangle centroids along the longest axis.
    Average,
    /// Binned surface area heuristic along the longest axis.
    Sah,
}

/// Options controlling [`MeshBvh::build`].
///
/// [`MeshBvh::build`]: crate::bvh::MeshBvh::build
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildOptions {
    /// Split heuristic.
    pub strategy: SplitStrategy,
    /// Depth at which a leaf is emitted regardless of its triangle count.
    pub max_depth: u32,
    /// A node with at most this many triangles becomes a leaf.
    pub max_leaf_tris: u32,
    /// Keep the triangle storage order and produce an indirect buffer instead of
    /// reordering the index buffer.
    pub indirect: bool,
    /// Log a warning when `max_depth` is reached.
    pub verbose: bool,
}

impl Default for BuildOptions {
    fn default() -> BuildOptions {
        BuildOptions {
            strategy: SplitStrategy::Center,
            max_depth: 40,
            max_leaf_tris: 10,
            indirect: false,
            verbose: true,
        }
    }
}

impl BuildOptions {
    /// Sets the split strategy.
    pub fn with_strategy(mut self, strategy: SplitStrategy) -> BuildOptions {
        self.strategy = strategy;
        self
    }

    /// Sets the maximum depth.
    pub fn with_max_depth(mut self, max_depth: u32) -> BuildOptions {
        self.max_depth = max_depth;
        self
    }

    /// Sets the maximum number of triangles per leaf.
    pub fn with_max_leaf_tris(mut self, max_leaf_tris: u32) -> BuildOptions {
        self.max_leaf_tris = max_leaf_tris;
        self
    }

    /// Enables or disables the indirect buffer.
    pub fn with_indirect(mut self, indirect: bool) -> BuildOptions {
        self.indirect = indirect;
        self
    }

    /// Enables or disables build warnings.
    pub fn with_verbose(mut self, verbose: bool) -> BuildOptions {
        self.verbose = verbose;
        self
    }

    /// Checks that the options can produce a tree.
    pub fn validate(&self) -> Result<()> {
        if self.max_leaf_tris == 0 {
            return Err(BvhError::InvalidConfig("max_leaf_tris must be at least 1"));
        }
        Ok(())
    }
}

/// Options for [`MeshBvh::raycast`] and [`MeshBvh::raycast_first`].
///
/// [`MeshBvh::raycast`]: crate::bvh::MeshBvh::raycast
/// [`MeshBvh::raycast_first`]: crate::bvh::MeshBvh::raycast_first
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RaycastOptions {
    /// Triangle faces the ray can hit.
    pub side: Side,
    /// Hits closer than this distance are ignored.
    pub near: Real,
    /// Hits farther than this distance are ignored.
    pub far: Real,
}

impl Default for RaycastOptions {
    fn default() -> RaycastOptions {
        RaycastOptions {
            side: Side::Double,
            near: 0.0,
            far: Real::INFINITY,
        }
    }
}

impl RaycastOptions {
    /// Sets the faces the ray can hit.
    pub fn with_side(mut self, side: Side) -> RaycastOptions {
        self.side = side;
        self
    }

    /// Sets the minimum hit distance.
    pub fn with_near(mut self, near: Real) -> RaycastOptions {
        self.near = near;
        self
    }

    /// Sets the maximum hit distance.
    pub fn with_far(mut self, far: Real) -> RaycastOptions {
        self.far = far;
        self
    }
}

/// Search limits of the closest point queries.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClosestPointOptions {
    /// The search stops as soon as a point at most this far away is found.
    pub min_threshold: Real,
    /// Points farther away than this are not reported.
    pub max_threshold: Real,
}

impl Default for ClosestPointOptions {
    fn default() -> ClosestPointOptions {
        ClosestPointOptions {
            min_threshold: 0.0,
            max_threshold: Real::INFINITY,
        }
    }
}

impl ClosestPointOptions {
    /// Sets the early termination distance.
    pub fn with_min_threshold(mut self, min_threshold: Real) -> ClosestPointOptions {
        self.min_threshold = min_threshold;
        self
    }

    /// Sets the maximum search distance.
    pub fn with_max_threshold(mut self, max_threshold: Real) -> ClosestPointOptions {
        self.max_threshold = max_threshold;
        self
    }
}
