//! Knockback: displacement over a short duration.
//!
//! Идёт по своим часам, не трогая phase/patrol таймеры агента.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::profile::KnockbackSpec;

/// Direction + magnitude (units/s) + duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Knockback {
    direction: [f32; 3],
    pub magnitude: f32,
    pub duration: f32,
}

impl Knockback {
    pub fn new(direction: Vec3, magnitude: f32, duration: f32) -> Self {
        let mut direction = direction;
        direction.y = 0.0;
        Self {
            direction: direction.normalize_or_zero().to_array(),
            magnitude,
            duration,
        }
    }

    /// Push `position` away from `source`.
    pub fn away_from(source: Vec3, position: Vec3, spec: KnockbackSpec) -> Self {
        Self::new(position - source, spec.magnitude, spec.duration)
    }

    pub fn direction(&self) -> Vec3 {
        Vec3::from_array(self.direction)
    }
}

/// In-flight knockback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnockbackMotion {
    knockback: Knockback,
    elapsed: f32,
}

impl KnockbackMotion {
    pub fn new(knockback: Knockback) -> Self {
        Self {
            knockback,
            elapsed: 0.0,
        }
    }

    /// Displacement for this tick; zero once finished.
    pub fn advance(&mut self, delta: f32) -> Vec3 {
        let step = delta.max(0.0).min(self.knockback.duration - self.elapsed).max(0.0);
        self.elapsed += step;
        self.knockback.direction() * self.knockback.magnitude * step
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.knockback.duration
    }
}
