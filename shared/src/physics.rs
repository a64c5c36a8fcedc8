//! Physics collaborator interface and a static-geometry implementation
//!
//! The movement core only ever asks two questions of the world: "does a
//! sweep along this direction hit something, and with what normal?" and
//! "does a sphere probe hit anything?". [`StaticWorld`] answers both for a
//! floor plane plus axis-aligned boxes, and also resolves penetration for the
//! authority's integration step.

use crate::math::{Vec3, EPSILON};
use crate::COLLIDER_RADIUS;

/// World queries consumed by the movement authority
pub trait PhysicsQuery {
    /// Sweeps the body from `origin` along `direction` for `distance`.
    /// Returns the contact normal of the first hit.
    fn sweep_test(&self, origin: Vec3, direction: Vec3, distance: f32) -> Option<Vec3>;

    /// Casts a sphere of `radius` from `origin` along `direction` for `distance`
    fn sphere_probe(&self, origin: Vec3, radius: f32, direction: Vec3, distance: f32) -> bool;
}

/// Axis-aligned box obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Minkowski sum with a sphere, approximated by the grown box
    pub fn expanded(&self, radius: f32) -> Aabb {
        let grow = Vec3::new(radius, radius, radius);
        Aabb {
            min: self.min - grow,
            max: self.max + grow,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        (0..3).all(|axis| {
            let p = component(point, axis);
            p > component(self.min, axis) && p < component(self.max, axis)
        })
    }

    /// Slab ray test. Returns `(t_enter, t_exit, entry_normal)`; `t_enter` is
    /// negative when the ray starts inside the box.
    fn ray_intersection(&self, origin: Vec3, direction: Vec3) -> Option<(f32, f32, Vec3)> {
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let o = component(origin, axis);
            let d = component(direction, axis);
            let lo = component(self.min, axis);
            let hi = component(self.max, axis);

            if d.abs() < EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let (t1, t2) = {
                let a = (lo - o) * inv;
                let b = (hi - o) * inv;
                if a < b {
                    (a, b)
                } else {
                    (b, a)
                }
            };

            if t1 > t_enter {
                t_enter = t1;
                normal = unit(axis, -d.signum());
            }
            t_exit = t_exit.min(t2);

            if t_enter > t_exit {
                return None;
            }
        }

        if t_exit < 0.0 {
            return None;
        }

        Some((t_enter, t_exit, normal))
    }
}

/// Floor plane plus static box obstacles
#[derive(Debug, Clone)]
pub struct StaticWorld {
    pub floor_y: f32,
    /// Radius of the swept body
    pub body_radius: f32,
    pub obstacles: Vec<Aabb>,
}

impl StaticWorld {
    pub fn new(floor_y: f32, body_radius: f32) -> Self {
        Self {
            floor_y,
            body_radius,
            obstacles: Vec::new(),
        }
    }

    pub fn with_obstacle(mut self, obstacle: Aabb) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    /// The walled arena both server and client load
    pub fn arena() -> Self {
        const HALF: f32 = 20.0;
        const WALL: f32 = 0.5;
        const HEIGHT: f32 = 4.0;

        StaticWorld::new(0.0, COLLIDER_RADIUS)
            .with_obstacle(Aabb::new(
                Vec3::new(-HALF - WALL, 0.0, -HALF - WALL),
                Vec3::new(HALF + WALL, HEIGHT, -HALF),
            ))
            .with_obstacle(Aabb::new(
                Vec3::new(-HALF - WALL, 0.0, HALF),
                Vec3::new(HALF + WALL, HEIGHT, HALF + WALL),
            ))
            .with_obstacle(Aabb::new(
                Vec3::new(-HALF - WALL, 0.0, -HALF),
                Vec3::new(-HALF, HEIGHT, HALF),
            ))
            .with_obstacle(Aabb::new(
                Vec3::new(HALF, 0.0, -HALF),
                Vec3::new(HALF + WALL, HEIGHT, HALF),
            ))
            .with_obstacle(Aabb::from_center(
                Vec3::new(6.0, 1.0, 6.0),
                Vec3::new(1.0, 1.0, 1.0),
            ))
            .with_obstacle(Aabb::from_center(
                Vec3::new(-6.0, 1.0, -6.0),
                Vec3::new(1.0, 1.0, 1.0),
            ))
    }

    /// Pushes a body at `position` (feet) out of the floor and obstacles.
    /// Velocity components pointing into a resolved surface are removed.
    pub fn resolve_penetration(&self, position: Vec3, velocity: Vec3) -> (Vec3, Vec3) {
        let mut position = position;
        let mut velocity = velocity;

        if position.y < self.floor_y {
            position.y = self.floor_y;
            if velocity.y < 0.0 {
                velocity.y = 0.0;
            }
        }

        for obstacle in &self.obstacles {
            let bounds = obstacle.expanded(self.body_radius);
            let center = position + Vec3::UP * self.body_radius;
            if !bounds.contains(center) {
                continue;
            }

            // Shortest way out along a single axis
            let mut best_axis = 0;
            let mut best_depth = f32::INFINITY;
            let mut best_sign = 1.0;
            for axis in 0..3 {
                let c = component(center, axis);
                let to_min = c - component(bounds.min, axis);
                let to_max = component(bounds.max, axis) - c;
                if to_min < best_depth {
                    best_depth = to_min;
                    best_axis = axis;
                    best_sign = -1.0;
                }
                if to_max < best_depth {
                    best_depth = to_max;
                    best_axis = axis;
                    best_sign = 1.0;
                }
            }

            let normal = unit(best_axis, best_sign);
            position += normal * best_depth;

            let into_surface = velocity.dot(normal);
            if into_surface < 0.0 {
                velocity = velocity - normal * into_surface;
            }
        }

        (position, velocity)
    }
}

impl Default for StaticWorld {
    fn default() -> Self {
        StaticWorld::new(0.0, COLLIDER_RADIUS)
    }
}

impl PhysicsQuery for StaticWorld {
    fn sweep_test(&self, origin: Vec3, direction: Vec3, distance: f32) -> Option<Vec3> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || distance <= 0.0 {
            return None;
        }

        let center = origin + Vec3::UP * self.body_radius;

        self.obstacles
            .iter()
            .filter_map(|obstacle| {
                obstacle
                    .expanded(self.body_radius)
                    .ray_intersection(center, direction)
            })
            // Starting inside an obstacle is not a sweep contact
            .filter(|(t_enter, _, _)| *t_enter >= 0.0 && *t_enter <= distance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, _, normal)| normal)
    }

    fn sphere_probe(&self, origin: Vec3, radius: f32, direction: Vec3, distance: f32) -> bool {
        let direction = direction.normalize_or_zero();

        let gap = origin.y - radius - self.floor_y;
        let floor_hit = if direction.y < -EPSILON {
            gap / -direction.y <= distance
        } else {
            gap <= 0.0
        };
        if floor_hit {
            return true;
        }

        self.obstacles.iter().any(|obstacle| {
            let bounds = obstacle.expanded(radius);
            if direction == Vec3::ZERO {
                return bounds.contains(origin);
            }
            matches!(
                bounds.ray_intersection(origin, direction),
                Some((t_enter, _, _)) if t_enter <= distance
            )
        })
    }
}

fn component(v: Vec3, axis: usize) -> f32 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

fn unit(axis: usize, sign: f32) -> Vec3 {
    match axis {
        0 => Vec3::new(sign, 0.0, 0.0),
        1 => Vec3::new(0.0, sign, 0.0),
        _ => Vec3::new(0.0, 0.0, sign),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn wall_world() -> StaticWorld {
        // Wall face at x = 2.0
        StaticWorld::new(0.0, 0.5).with_obstacle(Aabb::new(
            Vec3::new(2.0, 0.0, -5.0),
            Vec3::new(3.0, 3.0, 5.0),
        ))
    }

    #[test]
    fn test_sweep_hits_wall_face() {
        let world = wall_world();
        let normal = world.sweep_test(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 2.0);
        assert_eq!(normal, Some(Vec3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_sweep_out_of_range() {
        let world = wall_world();
        // Expanded face sits at x = 1.5
        assert!(world
            .sweep_test(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 1.0)
            .is_none());
    }

    #[test]
    fn test_sweep_away_from_wall() {
        let world = wall_world();
        assert!(world
            .sweep_test(Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0), 10.0)
            .is_none());
    }

    #[test]
    fn test_sweep_zero_direction() {
        let world = wall_world();
        assert!(world.sweep_test(Vec3::ZERO, Vec3::ZERO, 10.0).is_none());
    }

    #[test]
    fn test_sphere_probe_floor() {
        let world = StaticWorld::new(0.0, 0.5);

        // Sphere bottom 0.1 above the floor, probing 0.2 down
        assert!(world.sphere_probe(Vec3::new(0.0, 0.6, 0.0), 0.5, Vec3::DOWN, 0.2));
        // Sphere bottom 1.0 above the floor
        assert!(!world.sphere_probe(Vec3::new(0.0, 1.5, 0.0), 0.5, Vec3::DOWN, 0.2));
    }

    #[test]
    fn test_sphere_probe_lands_on_box() {
        let world = StaticWorld::new(-100.0, 0.5).with_obstacle(Aabb::new(
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ));

        assert!(world.sphere_probe(Vec3::new(0.0, 1.6, 0.0), 0.5, Vec3::DOWN, 0.2));
        assert!(!world.sphere_probe(Vec3::new(5.0, 1.6, 0.0), 0.5, Vec3::DOWN, 0.2));
    }

    #[test]
    fn test_resolve_floor_penetration() {
        let world = StaticWorld::new(0.0, 0.5);
        let (position, velocity) =
            world.resolve_penetration(Vec3::new(1.0, -0.3, 2.0), Vec3::new(1.0, -4.0, 0.0));

        assert_eq!(position, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(velocity, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_resolve_obstacle_penetration() {
        let world = wall_world();
        // Body center at x = 1.8 overlaps the expanded face at x = 1.5
        let (position, velocity) =
            world.resolve_penetration(Vec3::new(1.8, 0.0, 0.0), Vec3::new(5.0, 0.0, 1.0));

        assert_approx_eq!(position.x, 1.5, 1e-5);
        assert_approx_eq!(velocity.x, 0.0, 1e-5);
        assert_approx_eq!(velocity.z, 1.0, 1e-5);
    }

    #[test]
    fn test_arena_spawn_is_clear() {
        let world = StaticWorld::arena();
        let (position, _) = world.resolve_penetration(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(position, Vec3::ZERO);
    }
}
