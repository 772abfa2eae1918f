//! A capsule character controller built on [`MeshBvh`] queries.
//!
//! Every tick the controller looks for ground with a downward ray, integrates gravity and
//! player input, and moves in short sub-steps, pushing the capsule out of every triangle
//! it penetrates.
//!
//! [`MeshBvh`]: crate::bvh::MeshBvh

mod config;
mod controller;

pub use self::config::ControllerConfig;
pub use self::controller::{CharacterController, Collider, GroundState, MoveInput};
