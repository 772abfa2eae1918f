//! Capsule character controller over a static triangle mesh.

use log::{trace, warn};

use crate::aabb::{Aabb, Bounded, IntersectsAabb};
use crate::bvh::{BoundsHit, MeshBvh, RaycastOptions, ShapecastVisitor, Side};
use crate::character::config::ControllerConfig;
use crate::error::Result;
use crate::geometry::TriangleMesh;
use crate::ray::Ray;
use crate::shapes::{Capsule, Triangle};
use crate::{Isometry3, Point3, Real, Vector3, EPSILON};

/// The static mesh a controller collides with, placed in the world by a rigid transform.
#[derive(Debug, Clone, Copy)]
pub struct Collider<'c> {
    mesh: &'c TriangleMesh,
    bvh: &'c MeshBvh,
    transform: Isometry3,
    inverse: Isometry3,
}

impl<'c> Collider<'c> {
    /// Creates a collider. `transform` maps mesh space into world space.
    pub fn new(mesh: &'c TriangleMesh, bvh: &'c MeshBvh, transform: Isometry3) -> Collider<'c> {
        Collider {
            mesh,
            bvh,
            transform,
            inverse: transform.inverse(),
        }
    }

    /// Mesh space to world space transform.
    pub fn transform(&self) -> &Isometry3 {
        &self.transform
    }

    /// Casts a world space ray and returns the hit distance and world space hit point.
    fn raycast(&self, ray: &Ray, options: &RaycastOptions) -> Option<(Real, Point3)> {
        let local = ray.transformed(&self.inverse);
        self.bvh
            .raycast_first(self.mesh, &local, options)
            .map(|hit| (hit.distance, self.transform * hit.point))
    }
}

/// Contact state of the capsule with the collider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum GroundState {
    /// Standing on a surface.
    Grounded,
    /// No surface within the ground tolerance below the feet.
    #[default]
    Airborne,
    /// The capsule fell through a surface and must be moved back on top of it.
    RecoveryNeeded,
}

/// Player input for one tick.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct MoveInput {
    /// Forward axis in `-1..=1`.
    pub forward: Real,
    /// Strafe axis in `-1..=1`, positive to the right.
    pub right: Real,
    /// Jump if grounded.
    pub jump: bool,
    /// View yaw around +y in radians. Zero looks along -z.
    pub yaw: Real,
}

impl MoveInput {
    /// Horizontal unit-or-shorter direction in world space.
    fn direction(&self) -> Vector3 {
        let (sin, cos) = self.yaw.sin_cos();
        let forward = Vector3::new(-sin, 0.0, -cos);
        let right = Vector3::new(cos, 0.0, -sin);
        let direction = forward * self.forward + right * self.right;
        let length = direction.norm();
        if length > 1.0 {
            direction / length
        } else {
            direction
        }
    }
}

/// Result of looking below (and possibly above) the capsule.
#[derive(Debug, Copy, Clone, PartialEq)]
struct GroundContact {
    state: GroundState,
    /// Grounded: feet minus ground height, may be negative. Recovery: height of the surface
    /// above the feet.
    gap: Real,
}

/// Pushes a capsule out of every triangle it overlaps. Corrections apply in visit order.
struct Depenetrate {
    capsule: Capsule,
    correction: Vector3,
}

impl ShapecastVisitor for Depenetrate {
    fn intersects_bounds(&mut self, bounds: &Aabb, _: bool, _: Option<Real>, _: u32) -> BoundsHit {
        if self.capsule.aabb().intersects(bounds) && self.capsule.intersects_aabb(bounds) {
            BoundsHit::Intersects
        } else {
            BoundsHit::Outside
        }
    }

    fn intersects_triangle(&mut self, triangle: &Triangle, _: u32, _: bool, _: u32) -> bool {
        let Some(contact) = self.capsule.contact_with_triangle(triangle) else {
            return false;
        };
        let depth = contact.depth(self.capsule.radius);
        if depth <= 0.0 {
            return false;
        }

        let normal = if contact.distance > EPSILON {
            (contact.on_segment - contact.on_triangle) / contact.distance
        } else {
            // The segment touches the triangle plane.
            let normal = triangle.normal();
            let middle = nalgebra::center(&self.capsule.start, &self.capsule.end);
            if normal.dot(&(middle - contact.on_triangle)) < 0.0 {
                -normal
            } else {
                normal
            }
        };
        if normal == Vector3::zeros() {
            return false;
        }

        let push = normal * depth;
        self.capsule.translate(&push);
        self.correction += push;
        false
    }
}

/// Moves a capsule shaped character through a [`Collider`].
///
/// The position is the bottom of the capsule (the feet). The up axis is +y.
///
/// # Examples
/// ```
/// use mesh_bvh::bvh::{BuildOptions, MeshBvh};
/// use mesh_bvh::character::{
///     CharacterController, Collider, ControllerConfig, GroundState, MoveInput,
/// };
/// use mesh_bvh::geometry::TriangleMesh;
/// use mesh_bvh::{Isometry3, Point3};
///
/// let positions = vec![-5.0, 0.0, -5.0, 5.0, 0.0, -5.0, 5.0, 0.0, 5.0, -5.0, 0.0, 5.0];
/// let mut floor = TriangleMesh::from_flat(positions, Some(vec![0, 2, 1, 0, 3, 2])).unwrap();
/// let bvh = MeshBvh::build(&mut floor, &BuildOptions::default()).unwrap();
///
/// let collider = Collider::new(&floor, &bvh, Isometry3::identity());
/// let start = Point3::new(0.3, 2.0, 0.7);
/// let mut controller =
///     CharacterController::new(ControllerConfig::default(), collider, start).unwrap();
/// for _ in 0..120 {
///     controller.tick(1.0 / 60.0, &MoveInput::default());
/// }
/// assert_eq!(controller.state(), GroundState::Grounded);
/// assert!(controller.position().y.abs() < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct CharacterController<'c> {
    config: ControllerConfig,
    collider: Collider<'c>,
    position: Point3,
    velocity: Vector3,
    state: GroundState,
}

impl<'c> CharacterController<'c> {
    /// Creates a controller with its feet at `position`.
    pub fn new(
        config: ControllerConfig,
        collider: Collider<'c>,
        position: Point3,
    ) -> Result<CharacterController<'c>> {
        config.validate()?;
        Ok(CharacterController {
            config,
            collider,
            position,
            velocity: Vector3::zeros(),
            state: GroundState::Airborne,
        })
    }

    /// Feet position.
    pub fn position(&self) -> Point3 {
        self.position
    }

    /// Moves the feet to `position` and clears the velocity.
    pub fn teleport(&mut self, position: Point3) {
        self.position = position;
        self.velocity = Vector3::zeros();
    }

    /// Current velocity.
    pub fn velocity(&self) -> Vector3 {
        self.velocity
    }

    /// Contact state after the last tick.
    pub fn state(&self) -> GroundState {
        self.state
    }

    /// Returns true if the last tick ended on the ground.
    pub fn is_grounded(&self) -> bool {
        self.state == GroundState::Grounded
    }

    /// The configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The capsule in world space.
    pub fn capsule(&self) -> Capsule {
        let radius = self.config.radius;
        Capsule::new(
            self.position + Vector3::y() * radius,
            self.position + Vector3::y() * (self.config.height - radius),
            radius,
        )
    }

    /// Advances the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: Real, input: &MoveInput) {
        let mut ground = self.ground_contact();
        self.set_state(ground.state);

        if ground.state == GroundState::RecoveryNeeded {
            warn!(
                "capsule at {} is below the collider, moving it up by {}",
                self.position, ground.gap
            );
            self.position.y += ground.gap;
            self.velocity.y = 0.0;
            ground = GroundContact {
                state: GroundState::Grounded,
                gap: 0.0,
            };
            self.set_state(GroundState::Grounded);
        }

        let grounded = ground.state == GroundState::Grounded;
        let horizontal = input.direction()
            * self.config.move_speed
            * if grounded { 1.0 } else { self.config.air_control };
        self.velocity.x = horizontal.x;
        self.velocity.z = horizontal.z;
        if grounded {
            // Stick to the ground, or climb back on top of it when the feet sank in.
            self.position.y -= ground.gap;
            self.velocity.y = if input.jump { self.config.jump_speed } else { 0.0 };
        } else {
            self.velocity.y += self.config.gravity * dt;
        }

        self.step(self.velocity * dt);
        let ground = self.ground_contact();
        self.set_state(ground.state);
    }

    fn set_state(&mut self, state: GroundState) {
        if state != self.state {
            trace!("ground state {:?} -> {:?} at {}", self.state, state, self.position);
            self.state = state;
        }
    }

    /// Classifies the current position.
    fn ground_contact(&self) -> GroundContact {
        let height = self.config.height;
        let top = self.position + Vector3::y() * height;

        let down = Ray::new(top, -Vector3::y());
        let walkable = RaycastOptions::default().with_side(Side::Front);
        if let Some((distance, _)) = self.collider.raycast(&down, &walkable) {
            let gap = distance - height;
            return GroundContact {
                state: if gap <= self.config.ground_tolerance * height {
                    GroundState::Grounded
                } else {
                    GroundState::Airborne
                },
                gap,
            };
        }

        let up = Ray::new(top, Vector3::y());
        let underside = RaycastOptions::default()
            .with_side(Side::Back)
            .with_far(self.config.recovery_distance * height);
        if let Some((_, point)) = self.collider.raycast(&up, &underside) {
            return GroundContact {
                state: GroundState::RecoveryNeeded,
                gap: point.y - self.position.y,
            };
        }

        GroundContact {
            state: GroundState::Airborne,
            gap: Real::INFINITY,
        }
    }

    /// Moves by `displacement` in sub-steps, resolving penetration after each. The
    /// displacement is cut to `max_substeps` sub-steps of the maximum length.
    fn step(&mut self, displacement: Vector3) {
        let max_step = self.config.max_step_fraction * self.config.radius;
        let max_length = max_step * self.config.max_substeps as Real;
        let length = displacement.norm();
        let displacement = if length > max_length {
            trace!("displacement of {} cut to {}", length, max_length);
            displacement * (max_length / length)
        } else {
            displacement
        };
        let steps = (displacement.norm() / max_step)
            .ceil()
            .clamp(1.0, self.config.max_substeps as Real) as u32;
        let mut step = displacement / steps as Real;

        for _ in 0..steps {
            self.position += step;
            let correction = self.resolve_penetration();
            let length = correction.norm();
            if length > 0.0 {
                // Drop the motion into the surface.
                let normal = correction / length;
                self.velocity -= normal * self.velocity.dot(&normal).min(0.0);
                step -= normal * step.dot(&normal).min(0.0);
            }
        }
    }

    /// Runs the resolution passes and returns the world space correction applied to the
    /// position.
    fn resolve_penetration(&mut self) -> Vector3 {
        let mut visitor = Depenetrate {
            capsule: self.capsule().transformed(&self.collider.inverse),
            correction: Vector3::zeros(),
        };
        for _ in 0..self.config.resolution_iterations {
            let before = visitor.correction;
            self.collider.bvh.shapecast(self.collider.mesh, &mut visitor);
            if visitor.correction == before {
                break;
            }
        }
        let correction = self.collider.transform.rotation * visitor.correction;
        self.position += correction;
        correction
    }
}
