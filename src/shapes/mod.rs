//! Query shapes and the triangle primitive.
//!
//! All shapes implement [`IntersectsAabb`] so they can drive a BVH traversal.
//!
//! [`IntersectsAabb`]: crate::aabb::IntersectsAabb

pub mod capsule;
pub mod obb;
pub mod sphere;
pub mod triangle;

pub use self::capsule::{Capsule, CapsuleContact};
pub use self::obb::OrientedBox;
pub use self::sphere::Sphere;
pub use self::triangle::Triangle;
