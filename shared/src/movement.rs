//! Movement authority: input -> velocity with deflection and ground rules
//!
//! The computation is split at the trust boundary. [`MovementAuthority::desired_velocity`]
//! runs wherever the input was sampled (facing frame, sweep deflection) and
//! produces the velocity a participant asks for. [`MovementAuthority::apply`]
//! runs only on the authority: it sanitizes the request, recomputes
//! groundedness from its own world queries and preserves vertical velocity
//! while airborne. A participant the local node is authoritative for goes
//! through both halves in-process, a remote one has the second half run
//! when its intent arrives.

use crate::math::{Vec2, Vec3};
use crate::physics::PhysicsQuery;
use crate::{COLLIDER_RADIUS, PLAYER_SPEED};
use std::f32::consts::SQRT_2;

/// Largest magnitude a per-component clamped move axis can have
pub const MAX_MOVE_INPUT_MAGNITUDE: f32 = SQRT_2;

/// Movement tuning shared by submitter and authority
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementConfig {
    pub move_speed: f32,
    /// Radius of the body's collider; also the ground probe radius
    pub collider_radius: f32,
    /// Height above the feet the ground probe starts from
    pub ground_check_offset: f32,
    /// How far below the feet still counts as grounded
    pub ground_distance: f32,
    /// Physics tick length in seconds, used for the sweep distance
    pub tick_duration: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: PLAYER_SPEED,
            collider_radius: COLLIDER_RADIUS,
            ground_check_offset: 0.1,
            ground_distance: 0.1,
            tick_duration: 1.0 / 60.0,
        }
    }
}

/// Position (feet) and facing of a body
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: Vec3,
    /// Degrees about +Y; yaw 0 faces +Z
    pub yaw: f32,
}

impl Transform {
    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self { position, yaw }
    }

    /// Unit vector to the body's right
    pub fn right(&self) -> Vec3 {
        let (sin, cos) = self.yaw.to_radians().sin_cos();
        Vec3::new(cos, 0.0, -sin)
    }

    /// Unit vector the body faces
    pub fn forward(&self) -> Vec3 {
        let (sin, cos) = self.yaw.to_radians().sin_cos();
        Vec3::new(sin, 0.0, cos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MovementAuthority {
    pub config: MovementConfig,
}

impl MovementAuthority {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    /// Requested velocity in the body's facing frame, deflected along any
    /// surface the sweep reports for this tick.
    pub fn desired_velocity(
        &self,
        transform: &Transform,
        move_input: Vec2,
        physics: &dyn PhysicsQuery,
    ) -> Vec3 {
        let input = Vec2::new(move_input.x.clamp(-1.0, 1.0), move_input.y.clamp(-1.0, 1.0));
        if !input.is_finite() {
            return Vec3::ZERO;
        }

        let velocity = (transform.right() * input.x + transform.forward() * input.y)
            * self.config.move_speed;

        deflect(
            velocity,
            transform.position,
            self.config.tick_duration,
            physics,
        )
    }

    /// Authority-side resolution of a requested velocity
    ///
    /// Returns `None` for a request that cannot be trusted at all (non-finite).
    /// Requests are horizontal; any vertical component is discarded.
    pub fn apply(
        &self,
        position: Vec3,
        prior_velocity: Vec3,
        desired: Vec3,
        physics: &dyn PhysicsQuery,
    ) -> Option<Vec3> {
        if !desired.is_finite() {
            return None;
        }

        let desired = desired
            .with_y(0.0)
            .clamp_magnitude(self.config.move_speed * MAX_MOVE_INPUT_MAGNITUDE);
        let grounded = self.is_grounded(position, physics);

        Some(resolve_vertical(desired, prior_velocity, grounded))
    }

    /// Full pipeline for a body the caller is authoritative for
    pub fn compute_next_velocity(
        &self,
        transform: &Transform,
        move_input: Vec2,
        prior_velocity: Vec3,
        physics: &dyn PhysicsQuery,
    ) -> Vec3 {
        let desired = self.desired_velocity(transform, move_input, physics);
        self.apply(transform.position, prior_velocity, desired, physics)
            .unwrap_or(prior_velocity)
    }

    /// Downward sphere probe from just above the feet
    pub fn is_grounded(&self, position: Vec3, physics: &dyn PhysicsQuery) -> bool {
        let radius = self.config.collider_radius;
        let origin = position + Vec3::UP * (self.config.ground_check_offset + radius);
        physics.sphere_probe(
            origin,
            radius,
            Vec3::DOWN,
            self.config.ground_check_offset + self.config.ground_distance,
        )
    }
}

/// Projects `velocity` onto the surface the body would hit this tick, if any
pub fn deflect(
    velocity: Vec3,
    origin: Vec3,
    tick_duration: f32,
    physics: &dyn PhysicsQuery,
) -> Vec3 {
    let direction = velocity.normalize_or_zero();
    if direction == Vec3::ZERO {
        return Vec3::ZERO;
    }

    match physics.sweep_test(origin, direction, velocity.magnitude() * tick_duration) {
        Some(normal) => velocity.project_on_plane(normal),
        None => velocity,
    }
}

/// Airborne bodies keep the vertical velocity gravity gave them
pub fn resolve_vertical(desired: Vec3, prior_velocity: Vec3, grounded: bool) -> Vec3 {
    if grounded {
        desired
    } else {
        desired.with_y(prior_velocity.y)
    }
}
