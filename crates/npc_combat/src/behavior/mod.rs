//! Behavior sources: who decides movement and attack intent each tick.
//!
//! State machine не различает scripted и learned: оба получают одно и то же
//! `Observation` и возвращают `Intent`. Таймеры, прерывания и окна удара
//! одинаковы для всех.

use bevy::prelude::*;

use crate::agent::AgentState;

pub mod learned;
pub mod rewards;
pub mod scripted;

pub use learned::{features, DecisionPolicy, LearnedBehavior, PolicyAction, SeekPolicy, FEATURE_COUNT};
pub use rewards::{RewardConfig, RewardShaper};
pub use scripted::ScriptedBehavior;

/// Observable state handed to the behavior source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub health_fraction: f32,
    pub state: AgentState,
    pub position: Vec3,
    pub forward: Vec3,
    pub target_visible: bool,
    pub target_position: Option<Vec3>,
    pub target_distance: Option<f32>,
    pub attack_range: f32,
    /// Navigation hint: patrol point or chase standoff position.
    pub destination: Option<Vec3>,
}

impl Observation {
    pub fn in_attack_range(&self) -> bool {
        self.target_distance.is_some_and(|d| d <= self.attack_range)
    }
}

/// Desired movement (world space, length ≤ 1) and attack request.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Intent {
    pub movement: Vec3,
    pub attack: bool,
}

pub trait BehaviorSource: Send + Sync {
    fn decide(&mut self, observation: &Observation) -> Intent;

    fn name(&self) -> &'static str;
}
