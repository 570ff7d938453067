//! Learned behavior: an external decision policy behind the same interface.
//!
//! Политика видит числовые признаки и возвращает движение в локальных
//! координатах агента + сигнал атаки. Обучение (градиенты, сеть) — вне ядра.

use bevy::prelude::*;

use super::{BehaviorSource, Intent, Observation};

pub const FEATURE_COUNT: usize = 8;

/// Distance normalisation for the distance feature.
const DISTANCE_SCALE: f32 = 20.0;

/// Attack is requested when the signal exceeds this.
const ATTACK_THRESHOLD: f32 = 0.5;

/// Raw policy output, agent-local frame (x = right, z = forward).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolicyAction {
    pub move_x: f32,
    pub move_z: f32,
    pub attack_signal: f32,
}

pub trait DecisionPolicy: Send + Sync {
    fn act(&mut self, features: &[f32; FEATURE_COUNT]) -> PolicyAction;
}

fn right_of(forward: Vec3) -> Vec3 {
    forward.cross(Vec3::Y).normalize_or_zero()
}

fn to_local(direction: Vec3, forward: Vec3) -> (f32, f32) {
    (direction.dot(right_of(forward)), direction.dot(forward))
}

/// Feature vector:
/// `[health, distance/20, visible, target_x, target_z, in_range, nav_x, nav_z]`.
pub fn features(observation: &Observation) -> [f32; FEATURE_COUNT] {
    let forward = observation.forward.normalize_or(Vec3::NEG_Z);
    let flat = |v: Vec3| Vec3::new(v.x, 0.0, v.z).normalize_or_zero();

    let (target_x, target_z) = observation
        .target_position
        .map(|p| to_local(flat(p - observation.position), forward))
        .unwrap_or((0.0, 0.0));
    let (nav_x, nav_z) = observation
        .destination
        .map(|p| to_local(flat(p - observation.position), forward))
        .unwrap_or((0.0, 0.0));
    let distance = observation
        .target_distance
        .map(|d| (d / DISTANCE_SCALE).min(1.0))
        .unwrap_or(1.0);

    [
        observation.health_fraction,
        distance,
        if observation.target_visible { 1.0 } else { 0.0 },
        target_x,
        target_z,
        if observation.in_attack_range() { 1.0 } else { 0.0 },
        nav_x,
        nav_z,
    ]
}

/// Adapter from `DecisionPolicy` to `BehaviorSource`.
pub struct LearnedBehavior<P: DecisionPolicy> {
    policy: P,
}

impl<P: DecisionPolicy> LearnedBehavior<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }
}

impl<P: DecisionPolicy> BehaviorSource for LearnedBehavior<P> {
    fn decide(&mut self, observation: &Observation) -> Intent {
        let action = self.policy.act(&features(observation));
        let forward = observation.forward.normalize_or(Vec3::NEG_Z);
        let movement = right_of(forward) * action.move_x + forward * action.move_z;

        Intent {
            movement: movement.clamp_length_max(1.0),
            attack: action.attack_signal > ATTACK_THRESHOLD,
        }
    }

    fn name(&self) -> &'static str {
        "learned"
    }
}

/// Heuristic stand-in for a trained policy: seek the target, else follow the hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeekPolicy;

impl DecisionPolicy for SeekPolicy {
    fn act(&mut self, features: &[f32; FEATURE_COUNT]) -> PolicyAction {
        let visible = features[2] > 0.5;
        let (move_x, move_z) = if visible {
            (features[3], features[4])
        } else {
            (features[6], features[7])
        };
        PolicyAction {
            move_x,
            move_z,
            attack_signal: if visible && features[5] > 0.5 { 1.0 } else { 0.0 },
        }
    }
}
