//! Reward shaping for training runs.
//!
//! Слушает те же события, что и audio/UI, и превращает их в скалярный reward
//! на агента. На поведение агентов не влияет.

use std::collections::BTreeMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::agent::AgentState;
use crate::events::{AgentEvent, AgentId, EventSink};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub detect: f32,
    pub chase: f32,
    pub attack: f32,
    pub hit_landed: f32,
    pub took_damage: f32,
    pub died: f32,
    pub killed_target: f32,
    pub patrol_point: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            detect: 0.5,
            chase: 0.6,
            attack: 0.8,
            hit_landed: 0.8,
            took_damage: -0.7,
            died: -1.0,
            killed_target: 1.0,
            patrol_point: 0.1,
        }
    }
}

/// Per-agent cumulative reward.
#[derive(Resource, Debug, Clone, Default)]
pub struct RewardShaper {
    pub config: RewardConfig,
    totals: BTreeMap<AgentId, f32>,
}

impl RewardShaper {
    pub fn new(config: RewardConfig) -> Self {
        Self {
            config,
            totals: BTreeMap::new(),
        }
    }

    /// Reward carried by a single event, if any.
    pub fn reward_for(&self, event: &AgentEvent) -> Option<f32> {
        let c = &self.config;
        match event {
            AgentEvent::StateEntered { state: AgentState::Alert, .. } => Some(c.detect),
            AgentEvent::StateEntered { state: AgentState::Chase, .. } => Some(c.chase),
            AgentEvent::AttackPhaseStarted { .. } => Some(c.attack),
            AgentEvent::HitLanded { .. } => Some(c.hit_landed),
            AgentEvent::DamageTaken { .. } => Some(c.took_damage),
            AgentEvent::Died { .. } => Some(c.died),
            AgentEvent::TargetKilled { .. } => Some(c.killed_target),
            AgentEvent::PatrolPointReached { .. } => Some(c.patrol_point),
            _ => None,
        }
    }

    pub fn observe(&mut self, event: &AgentEvent) {
        if let Some(reward) = self.reward_for(event) {
            *self.totals.entry(event.agent()).or_insert(0.0) += reward;
        }
    }

    pub fn total(&self, agent: AgentId) -> f32 {
        self.totals.get(&agent).copied().unwrap_or(0.0)
    }

    /// Return and reset the agent's accumulated reward (end of episode).
    pub fn take(&mut self, agent: AgentId) -> f32 {
        self.totals.remove(&agent).unwrap_or(0.0)
    }
}

impl EventSink for RewardShaper {
    fn notify(&mut self, event: AgentEvent) {
        self.observe(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TargetId;
    use crate::profile::ArchetypeKind;

    #[test]
    fn test_episode_accumulates() {
        let agent = AgentId(3);
        let mut shaper = RewardShaper::default();
        let events = [
            AgentEvent::StateEntered {
                agent,
                state: AgentState::Alert,
            },
            AgentEvent::StateEntered {
                agent,
                state: AgentState::Chase,
            },
            AgentEvent::HitLanded {
                agent,
                target: TargetId(1),
                damage: 8,
            },
            AgentEvent::DamageTaken {
                agent,
                amount: 10,
                remaining: 90,
            },
            AgentEvent::StateExited {
                agent,
                state: AgentState::Chase,
            },
        ];
        for event in events {
            shaper.notify(event);
        }

        assert!((shaper.total(agent) - (0.5 + 0.6 + 0.8 - 0.7)).abs() < 1e-5);
        assert_eq!(shaper.total(AgentId(4)), 0.0);
    }

    #[test]
    fn test_take_resets_episode() {
        let agent = AgentId(1);
        let mut shaper = RewardShaper::default();
        shaper.notify(AgentEvent::Died {
            agent,
            kind: ArchetypeKind::Learner,
            position: Vec3::ZERO,
            despawn_after: 8.0,
        });
        assert_eq!(shaper.take(agent), -1.0);
        assert_eq!(shaper.total(agent), 0.0);
    }
}
