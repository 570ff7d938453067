//! The pursued entity (player / training dummy) and a plain-data roster of them.

use bevy::prelude::*;

use super::knockback::KnockbackMotion;
use super::resolver::{parry_succeeds, Strike, StrikeResponse, TargetProvider};
use crate::events::TargetId;
use crate::perception::TargetSnapshot;

/// Defender state: health, facing, parry stance, knockback.
///
/// Инвариант: alive ⇔ health > 0.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct CombatTarget {
    pub position: Vec3,
    pub forward: Vec3,
    pub health: u32,
    pub max_health: u32,
    pub hit_radius: f32,
    pub parrying: bool,
    knockback: Option<KnockbackMotion>,
}

impl CombatTarget {
    pub fn new(position: Vec3, max_health: u32) -> Self {
        Self {
            position,
            forward: Vec3::NEG_Z,
            health: max_health,
            max_health,
            hit_radius: 0.5,
            parrying: false,
            knockback: None,
        }
    }

    pub fn facing(mut self, forward: Vec3) -> Self {
        self.forward = forward.normalize_or(Vec3::NEG_Z);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn snapshot(&self, id: TargetId) -> TargetSnapshot {
        TargetSnapshot {
            id,
            position: self.position,
            forward: self.forward,
            alive: self.is_alive(),
            hit_radius: self.hit_radius,
        }
    }

    /// Defender-side handling of an incoming strike.
    pub fn receive(&mut self, strike: &Strike) -> StrikeResponse {
        if !self.is_alive() {
            return StrikeResponse::Missed;
        }
        if parry_succeeds(self.position, self.forward, strike.origin, self.parrying) {
            return StrikeResponse::Parried;
        }

        self.health = self.health.saturating_sub(strike.damage);
        if let Some(knockback) = strike.knockback {
            self.knockback = Some(KnockbackMotion::new(knockback));
        }
        StrikeResponse::Hit {
            remaining: self.health,
        }
    }

    pub fn is_knocked_back(&self) -> bool {
        self.knockback.is_some()
    }

    pub fn tick_knockback(&mut self, delta: f32) {
        if let Some(motion) = self.knockback.as_mut() {
            self.position += motion.advance(delta);
            if motion.is_finished() {
                self.knockback = None;
            }
        }
    }
}

/// Targets kept as plain data, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TargetRoster {
    targets: Vec<(TargetId, CombatTarget)>,
}

impl TargetRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TargetId, target: CombatTarget) {
        match self.targets.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = target,
            None => self.targets.push((id, target)),
        }
    }

    pub fn remove(&mut self, id: TargetId) -> Option<CombatTarget> {
        let index = self.targets.iter().position(|(existing, _)| *existing == id)?;
        Some(self.targets.remove(index).1)
    }

    pub fn get(&self, id: TargetId) -> Option<&CombatTarget> {
        self.targets.iter().find(|(existing, _)| *existing == id).map(|(_, t)| t)
    }

    pub fn get_mut(&mut self, id: TargetId) -> Option<&mut CombatTarget> {
        self.targets
            .iter_mut()
            .find(|(existing, _)| *existing == id)
            .map(|(_, t)| t)
    }

    pub fn tick(&mut self, delta: f32) {
        for (_, target) in self.targets.iter_mut() {
            target.tick_knockback(delta);
        }
    }
}

impl TargetProvider for TargetRoster {
    fn candidates(&self) -> Vec<TargetSnapshot> {
        self.targets.iter().map(|(id, t)| t.snapshot(*id)).collect()
    }

    fn strike(&mut self, target: TargetId, strike: &Strike) -> StrikeResponse {
        match self.get_mut(target) {
            Some(defender) => defender.receive(strike),
            None => StrikeResponse::Missed,
        }
    }
}
