//! Perception: field-of-view + line-of-sight target acquisition.
//!
//! Все три условия (радиус, угол, LOS) считаются заново каждый тик.
//! Между тиками хранится только последняя подтверждённая позиция цели
//! (`TargetMemory`), и только на один grace-цикл.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::events::TargetId;

pub mod obstacles;

pub use obstacles::{Obstacle, ObstacleField, ObstacleQuery, ProbeHit};

/// Position snapshot of a candidate target plus its liveness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSnapshot {
    pub id: TargetId,
    pub position: Vec3,
    pub forward: Vec3,
    pub alive: bool,
    /// Radius of the hittable volume.
    pub hit_radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionCone {
    pub radius: f32,
    /// Half of the field-of-view, degrees. 180 means all-around.
    pub half_angle: f32,
}

impl VisionCone {
    pub fn new(radius: f32, full_angle: f32) -> Self {
        Self {
            radius,
            half_angle: full_angle * 0.5,
        }
    }

    /// Tracking cone used once engaged: no angle gate.
    pub fn all_around(radius: f32) -> Self {
        Self {
            radius,
            half_angle: 180.0,
        }
    }
}

/// A confirmed, visible target this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub target: TargetId,
    pub position: Vec3,
    pub distance: f32,
}

/// Single visibility check: radius, angle, then line of sight.
pub fn can_see(origin: Vec3, forward: Vec3, target: Vec3, cone: VisionCone, obstacles: &dyn ObstacleQuery) -> bool {
    let to_target = target - origin;
    let distance = to_target.length();
    if distance > cone.radius {
        return false;
    }
    if distance <= f32::EPSILON {
        return true;
    }

    let forward = forward.normalize_or_zero();
    if cone.half_angle < 180.0 && forward != Vec3::ZERO {
        let angle = forward.angle_between(to_target).to_degrees();
        if angle > cone.half_angle {
            return false;
        }
    }

    !obstacles.segment_blocked(origin, target)
}

/// Nearest visible live candidate; ties keep the first one found.
pub fn scan(
    origin: Vec3,
    forward: Vec3,
    cone: VisionCone,
    candidates: &[TargetSnapshot],
    obstacles: &dyn ObstacleQuery,
) -> Option<Sighting> {
    let mut best: Option<Sighting> = None;
    for candidate in candidates.iter().filter(|c| c.alive) {
        if !can_see(origin, forward, candidate.position, cone, obstacles) {
            continue;
        }
        let distance = origin.distance(candidate.position);
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(Sighting {
                target: candidate.id,
                position: candidate.position,
                distance,
            });
        }
    }
    best
}

/// What the agent knows about its target this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Awareness {
    Visible(Sighting),
    /// Not seen this tick, still inside the grace cycle.
    Remembered(Vec3),
    Lost,
}

impl Awareness {
    pub fn position(&self) -> Option<Vec3> {
        match self {
            Awareness::Visible(s) => Some(s.position),
            Awareness::Remembered(p) => Some(*p),
            Awareness::Lost => None,
        }
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, Awareness::Lost)
    }
}

/// Last confirmed target position, kept for one grace cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetMemory {
    target: Option<TargetId>,
    last_known: Option<[f32; 3]>,
    grace: u8,
}

impl TargetMemory {
    pub const GRACE_CYCLES: u8 = 1;

    pub fn observe(&mut self, sighting: Option<Sighting>) -> Awareness {
        match sighting {
            Some(sighting) => {
                self.target = Some(sighting.target);
                self.last_known = Some(sighting.position.to_array());
                self.grace = Self::GRACE_CYCLES;
                Awareness::Visible(sighting)
            }
            None => match self.last_known {
                Some(position) if self.grace > 0 => {
                    self.grace -= 1;
                    Awareness::Remembered(Vec3::from_array(position))
                }
                _ => {
                    self.forget();
                    Awareness::Lost
                }
            },
        }
    }

    /// Position hint without a sighting (e.g. where a hit came from).
    pub fn hint(&mut self, position: Vec3) {
        self.last_known = Some(position.to_array());
        self.grace = Self::GRACE_CYCLES;
    }

    /// Last known position without spending the grace cycle.
    pub fn recall(&self) -> Awareness {
        match self.last_known {
            Some(position) if self.grace > 0 => Awareness::Remembered(Vec3::from_array(position)),
            _ => Awareness::Lost,
        }
    }

    pub fn forget(&mut self) {
        self.target = None;
        self.last_known = None;
        self.grace = 0;
    }

    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    pub fn last_known(&self) -> Option<Vec3> {
        self.last_known.map(Vec3::from_array)
    }
}
