//! Combat resolver: hit window + overlap + liveness → one strike per phase.
//!
//! Парирование решает защищающаяся сторона (`TargetProvider::strike`).
//! Атакующий не знает заранее, будет ли parry: обе проверки идут по одному
//! и тому же strike.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::knockback::Knockback;
use crate::events::{AgentId, TargetId};
use crate::perception::TargetSnapshot;
use crate::profile::PhaseSpec;

/// Defender must face the attacker within this angle for a parry.
pub const PARRY_ANGLE_DEGREES: f32 = 90.0;

/// One damage delivery attempt, as seen by the defender.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub attacker: AgentId,
    /// Attacker position at the moment of the hit test.
    pub origin: Vec3,
    pub damage: u32,
    pub knockback: Option<Knockback>,
}

/// Defender-side answer to a strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeResponse {
    Hit { remaining: u32 },
    Parried,
    /// Target vanished or was already dead.
    Missed,
}

/// Position + liveness of pursued entities, and the damage entry point.
pub trait TargetProvider {
    fn candidates(&self) -> Vec<TargetSnapshot>;

    fn snapshot(&self, id: TargetId) -> Option<TargetSnapshot> {
        self.candidates().into_iter().find(|c| c.id == id)
    }

    fn strike(&mut self, target: TargetId, strike: &Strike) -> StrikeResponse;
}

/// Defender-side parry rule: actively parrying and facing the attacker.
pub fn parry_succeeds(defender_position: Vec3, defender_forward: Vec3, attacker_position: Vec3, parrying: bool) -> bool {
    if !parrying {
        return false;
    }
    let mut to_attacker = attacker_position - defender_position;
    to_attacker.y = 0.0;
    let mut forward = defender_forward;
    forward.y = 0.0;
    if to_attacker.length_squared() <= f32::EPSILON || forward.length_squared() <= f32::EPSILON {
        return false;
    }
    forward.angle_between(to_attacker).to_degrees() < PARRY_ANGLE_DEGREES
}

/// Attack volume: a sphere in front of the attacker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeVolume {
    pub center: Vec3,
    pub radius: f32,
}

impl StrikeVolume {
    pub fn for_phase(position: Vec3, forward: Vec3, phase: &PhaseSpec) -> Self {
        Self {
            center: position + forward.normalize_or_zero() * phase.reach,
            radius: phase.radius,
        }
    }

    /// Contact sphere around the attacker.
    pub fn around(position: Vec3, radius: f32) -> Self {
        Self {
            center: position,
            radius,
        }
    }

    pub fn overlaps(&self, target: &TargetSnapshot) -> bool {
        self.center.distance(target.position) <= self.radius + target.hit_radius
    }
}

/// Targets already struck during the current phase activation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitLatch {
    struck: Vec<TargetId>,
}

impl HitLatch {
    pub fn contains(&self, target: TargetId) -> bool {
        self.struck.contains(&target)
    }

    pub fn latch(&mut self, target: TargetId) {
        if !self.contains(target) {
            self.struck.push(target);
        }
    }

    pub fn reset(&mut self) {
        self.struck.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.struck.is_empty()
    }
}

/// Everything the resolver needs about the attacker this tick.
#[derive(Debug, Clone, Copy)]
pub struct StrikeAttempt {
    pub attacker: AgentId,
    pub position: Vec3,
    pub volume: StrikeVolume,
    pub damage: u32,
    pub knockback: Option<Knockback>,
    /// Active phase is inside its hit window.
    pub in_window: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Conditions not met; nothing was sent to the target.
    NoContact,
    Landed {
        target: TargetId,
        damage: u32,
        killed: bool,
    },
    Parried {
        target: TargetId,
    },
    Missed {
        target: TargetId,
    },
}

/// Apply at most one strike per latch activation.
pub fn resolve(
    attempt: &StrikeAttempt,
    target: &TargetSnapshot,
    latch: &mut HitLatch,
    provider: &mut dyn TargetProvider,
) -> Resolution {
    if !attempt.in_window || !target.alive || latch.contains(target.id) || !attempt.volume.overlaps(target) {
        return Resolution::NoContact;
    }

    latch.latch(target.id);
    let strike = Strike {
        attacker: attempt.attacker,
        origin: attempt.position,
        damage: attempt.damage,
        knockback: attempt.knockback,
    };

    match provider.strike(target.id, &strike) {
        StrikeResponse::Hit { remaining } => Resolution::Landed {
            target: target.id,
            damage: attempt.damage,
            killed: remaining == 0,
        },
        StrikeResponse::Parried => Resolution::Parried { target: target.id },
        StrikeResponse::Missed => Resolution::Missed { target: target.id },
    }
}
