//! Controller configuration.

use crate::error::{BvhError, Result};
use crate::Real;

/// Tuning parameters of a [`CharacterController`].
///
/// Distances are in world units, speeds in units per second.
///
/// [`CharacterController`]: crate::character::CharacterController
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerConfig {
    /// Capsule radius.
    pub radius: Real,
    /// Total capsule height from feet to top, including both caps.
    pub height: Real,
    /// Vertical acceleration, negative points down.
    pub gravity: Real,
    /// Horizontal speed at full input.
    pub move_speed: Real,
    /// Vertical speed set by a jump.
    pub jump_speed: Real,
    /// Factor applied to the horizontal speed while airborne.
    pub air_control: Real,
    /// Largest gap between feet and ground, as a fraction of `height`, that still counts as
    /// grounded.
    pub ground_tolerance: Real,
    /// Maximum number of penetration resolution passes per sub-step.
    pub resolution_iterations: u32,
    /// Longest sub-step, as a fraction of `radius`.
    pub max_step_fraction: Real,
    /// Upper bound on the number of sub-steps per tick. Motion beyond this many full
    /// sub-steps is dropped.
    pub max_substeps: u32,
    /// How far above the capsule, as a multiple of `height`, a surface seen from below
    /// triggers recovery.
    pub recovery_distance: Real,
}

impl Default for ControllerConfig {
    fn default() -> ControllerConfig {
        ControllerConfig {
            radius: 0.45,
            height: 1.8,
            gravity: -20.0,
            move_speed: 6.0,
            jump_speed: 8.0,
            air_control: 0.5,
            ground_tolerance: 0.02,
            resolution_iterations: 3,
            max_step_fraction: 0.5,
            max_substeps: 32,
            recovery_distance: 4.0,
        }
    }
}

impl ControllerConfig {
    /// Sets the capsule dimensions.
    pub fn with_capsule(mut self, radius: Real, height: Real) -> ControllerConfig {
        self.radius = radius;
        self.height = height;
        self
    }

    /// Sets the vertical acceleration.
    pub fn with_gravity(mut self, gravity: Real) -> ControllerConfig {
        self.gravity = gravity;
        self
    }

    /// Sets the horizontal and jump speeds.
    pub fn with_speeds(mut self, move_speed: Real, jump_speed: Real) -> ControllerConfig {
        self.move_speed = move_speed;
        self.jump_speed = jump_speed;
        self
    }

    /// Sets the number of resolution passes per sub-step.
    pub fn with_resolution_iterations(mut self, resolution_iterations: u32) -> ControllerConfig {
        self.resolution_iterations = resolution_iterations;
        self
    }

    /// Checks that every value is in its valid range.
    pub fn validate(&self) -> Result<()> {
        if self.radius.is_nan() || self.radius <= 0.0 {
            return Err(BvhError::InvalidConfig("radius must be positive"));
        }
        if self.height.is_nan() || self.height < 2.0 * self.radius {
            return Err(BvhError::InvalidConfig("height must be at least twice the radius"));
        }
        if self.ground_tolerance.is_nan() || self.ground_tolerance < 0.0 {
            return Err(BvhError::InvalidConfig("ground tolerance must not be negative"));
        }
        if self.resolution_iterations == 0 {
            return Err(BvhError::InvalidConfig("at least one resolution pass is required"));
        }
        if self.max_step_fraction.is_nan() || self.max_step_fraction <= 0.0 {
            return Err(BvhError::InvalidConfig("max step fraction must be positive"));
        }
        if self.max_substeps == 0 {
            return Err(BvhError::InvalidConfig("at least one sub-step is required"));
        }
        if self.recovery_distance.is_nan() || self.recovery_distance < 0.0 {
            return Err(BvhError::InvalidConfig("recovery distance must not be negative"));
        }
        Ok(())
    }
}
