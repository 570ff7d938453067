//! Static obstacle geometry used for line-of-sight and forward probes.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Result of a forward probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    pub distance: f32,
    /// Outward surface normal at the hit point (ground plane, unit length).
    pub normal: Vec3,
}

/// Geometry query surface consumed by perception and navigation.
pub trait ObstacleQuery {
    /// True when the segment `from → to` crosses blocking geometry.
    fn segment_blocked(&self, from: Vec3, to: Vec3) -> bool;

    /// First blocking surface along `direction` within `max_distance`.
    fn probe(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<ProbeHit>;
}

/// Obstacles are vertical prisms: the query works on the XZ ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Obstacle {
    Pillar { center: [f32; 2], radius: f32 },
    Wall { min: [f32; 2], max: [f32; 2] },
}

impl Obstacle {
    pub fn pillar(center: Vec3, radius: f32) -> Self {
        Obstacle::Pillar {
            center: [center.x, center.z],
            radius,
        }
    }

    pub fn wall(min: Vec3, max: Vec3) -> Self {
        Obstacle::Wall {
            min: [min.x.min(max.x), min.z.min(max.z)],
            max: [min.x.max(max.x), min.z.max(max.z)],
        }
    }

    /// Ray/shape intersection on the ground plane: `(t, normal)` for the entry point.
    fn raycast(&self, origin: Vec2, dir: Vec2, max_t: f32) -> Option<(f32, Vec2)> {
        match *self {
            Obstacle::Pillar { center, radius } => {
                let center = Vec2::from(center);
                let offset = origin - center;
                // Луч начинается внутри колонны — блокирует сразу
                if offset.length_squared() <= radius * radius {
                    return Some((0.0, offset.normalize_or(-dir)));
                }
                let b = offset.dot(dir);
                let c = offset.length_squared() - radius * radius;
                let discriminant = b * b - c;
                if discriminant < 0.0 {
                    return None;
                }
                let t = -b - discriminant.sqrt();
                if t < 0.0 || t > max_t {
                    return None;
                }
                let hit = origin + dir * t;
                Some((t, (hit - center).normalize_or(-dir)))
            }
            Obstacle::Wall { min, max } => {
                let (min, max) = (Vec2::from(min), Vec2::from(max));
                let mut t_enter = 0.0_f32;
                let mut t_exit = max_t;
                let mut normal = -dir;

                for axis in 0..2 {
                    let (o, d, lo, hi) = (origin[axis], dir[axis], min[axis], max[axis]);
                    if d.abs() < f32::EPSILON {
                        if o < lo || o > hi {
                            return None;
                        }
                        continue;
                    }
                    let mut t0 = (lo - o) / d;
                    let mut t1 = (hi - o) / d;
                    let mut axis_normal = Vec2::ZERO;
                    axis_normal[axis] = -1.0;
                    if t0 > t1 {
                        std::mem::swap(&mut t0, &mut t1);
                        axis_normal[axis] = 1.0;
                    }
                    if t0 > t_enter {
                        t_enter = t0;
                        normal = axis_normal;
                    }
                    t_exit = t_exit.min(t1);
                    if t_enter > t_exit {
                        return None;
                    }
                }
                Some((t_enter, normal))
            }
        }
    }
}

fn ground(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

/// Designated obstacle surface set.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleField {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    fn nearest_hit(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<ProbeHit> {
        let origin = ground(origin);
        let dir = ground(direction).normalize_or_zero();
        if dir == Vec2::ZERO || max_distance <= 0.0 {
            return None;
        }

        self.obstacles
            .iter()
            .filter_map(|obstacle| obstacle.raycast(origin, dir, max_distance))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(distance, normal)| ProbeHit {
                distance,
                normal: Vec3::new(normal.x, 0.0, normal.y),
            })
    }
}

impl ObstacleQuery for ObstacleField {
    fn segment_blocked(&self, from: Vec3, to: Vec3) -> bool {
        let delta = to - from;
        let length = ground(delta).length();
        self.nearest_hit(from, delta, length).is_some()
    }

    fn probe(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<ProbeHit> {
        self.nearest_hit(origin, direction, max_distance)
    }
}
