//! Agent: the per-entity behavior state machine.
//!
//! Один и тот же цикл для всех видов (boss, обычные враги, learned):
//! perception → guards → тик активного состояния. Вид задаётся только
//! профилем (`ArchetypeProfile`) и источником поведения (`BehaviorSource`).

use std::fmt;
use std::sync::Arc;

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::behavior::BehaviorSource;
use crate::combat::{HitLatch, KnockbackMotion, Timer};
use crate::events::AgentId;
use crate::lifecycle::{Health, Lifecycle};
use crate::navigation::{PatrolRoute, WaypointSet};
use crate::perception::TargetMemory;
use crate::profile::{ArchetypeKind, ArchetypeProfile};

mod context;
mod machine;
pub mod snapshot;
mod spawn;

#[cfg(test)]
mod machine_tests;

pub use context::TickContext;
pub use snapshot::{AgentSnapshot, RngState};
pub use spawn::{agent_seed, default_behavior, Spawner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgentState {
    /// Spawned, waiting for the spawn trigger.
    #[default]
    Dormant,
    Patrol,
    /// Target spotted, not yet chasing.
    Alert,
    Chase,
    Attack {
        phase: u8,
    },
    /// Idle cooldown after a full attack cycle.
    Recover,
    HurtInterrupt,
    /// Long uninterruptible special move (boss roll).
    Skill,
    Dead,
}

impl AgentState {
    /// States that track a target with the all-around cone.
    pub fn is_engaged(&self) -> bool {
        matches!(
            self,
            AgentState::Alert
                | AgentState::Chase
                | AgentState::Attack { .. }
                | AgentState::Recover
                | AgentState::HurtInterrupt
                | AgentState::Skill
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgentState::Dormant => "Dormant",
            AgentState::Patrol => "Patrol",
            AgentState::Alert => "Alert",
            AgentState::Chase => "Chase",
            AgentState::Attack { .. } => "Attack",
            AgentState::Recover => "Recover",
            AgentState::HurtInterrupt => "HurtInterrupt",
            AgentState::Skill => "Skill",
            AgentState::Dead => "Dead",
        }
    }
}

/// ECS-authoritative position and facing of an agent.
///
/// Ядро читает и пишет тело по ссылке, не храня свою копию.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct AgentBody {
    pub position: Vec3,
    pub forward: Vec3,
}

impl AgentBody {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            forward: Vec3::NEG_Z,
        }
    }

    pub fn facing(mut self, forward: Vec3) -> Self {
        self.forward = forward.normalize_or(Vec3::NEG_Z);
        self
    }
}

/// Every countdown an agent owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentTimers {
    /// Active sequence: attack phase, skill, alert, hurt recovery.
    pub phase: Timer,
    /// Patrol dwell / lease retry.
    pub wait: Timer,
    /// Post-attack idle.
    pub cooldown: Timer,
    /// Continuous chase time until the skill fires.
    pub skill: Timer,
    pub invulnerability: Timer,
    /// Presentation delay before removal, runs once dead.
    pub despawn: Timer,
}

#[derive(Component)]
pub struct Agent {
    id: AgentId,
    profile: Arc<ArchetypeProfile>,
    waypoints: WaypointSet,
    behavior: Box<dyn BehaviorSource>,
    state: AgentState,
    health: Health,
    lifecycle: Lifecycle,
    interruptible: bool,
    timers: AgentTimers,
    latch: HitLatch,
    memory: TargetMemory,
    patrol: PatrolRoute,
    knockback: Option<KnockbackMotion>,
    rng: ChaCha8Rng,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("kind", &self.profile.kind)
            .field("state", &self.state)
            .field("health", &self.health)
            .field("behavior", &self.behavior.name())
            .finish()
    }
}

impl Agent {
    /// New agent in `Dormant`. The patrol order is drawn from `seed`.
    pub fn new(
        id: AgentId,
        profile: Arc<ArchetypeProfile>,
        waypoints: WaypointSet,
        behavior: Box<dyn BehaviorSource>,
        seed: u64,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let patrol = PatrolRoute::new(waypoints.len(), &mut rng);
        Self {
            id,
            health: Health::new(profile.max_health),
            profile,
            waypoints,
            behavior,
            state: AgentState::Dormant,
            lifecycle: Lifecycle::default(),
            interruptible: false,
            timers: AgentTimers::default(),
            latch: HitLatch::default(),
            memory: TargetMemory::default(),
            patrol,
            knockback: None,
            rng,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn kind(&self) -> ArchetypeKind {
        self.profile.kind
    }

    pub fn profile(&self) -> &ArchetypeProfile {
        &self.profile
    }

    pub fn current_state(&self) -> AgentState {
        self.state
    }

    pub fn health(&self) -> Health {
        self.health
    }

    pub fn health_fraction(&self) -> f32 {
        self.health.fraction()
    }

    pub fn is_dead(&self) -> bool {
        self.lifecycle.is_dead()
    }

    pub fn is_interruptible(&self) -> bool {
        self.interruptible
    }

    pub fn colliders_enabled(&self) -> bool {
        self.lifecycle.colliders_enabled()
    }

    /// 1-based index of the live attack phase, 0 outside `Attack`.
    pub fn phase_index(&self) -> u8 {
        match self.state {
            AgentState::Attack { phase } => phase,
            _ => 0,
        }
    }

    pub fn timers(&self) -> &AgentTimers {
        &self.timers
    }

    pub fn target_memory(&self) -> &TargetMemory {
        &self.memory
    }

    pub fn patrol(&self) -> &PatrolRoute {
        &self.patrol
    }

    pub fn is_knocked_back(&self) -> bool {
        self.knockback.is_some()
    }

    pub fn behavior_name(&self) -> &'static str {
        self.behavior.name()
    }

    /// Dead and the presentation delay has run out.
    pub fn ready_for_removal(&self) -> bool {
        self.lifecycle.is_dead() && self.timers.despawn.is_done()
    }
}
