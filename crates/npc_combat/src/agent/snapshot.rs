//! Serializable agent state for save/restore and replay.
//!
//! Профиль, маршрут и behavior source не сериализуются: это shared данные,
//! их передаёт вызывающий при восстановлении.

use std::sync::Arc;

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{Agent, AgentBody, AgentState, AgentTimers};
use crate::behavior::BehaviorSource;
use crate::combat::{HitLatch, KnockbackMotion};
use crate::events::AgentId;
use crate::lifecycle::{Health, Lifecycle};
use crate::navigation::{PatrolRoute, WaypointSet};
use crate::perception::TargetMemory;
use crate::profile::{ArchetypeKind, ArchetypeProfile};

/// Exact position of a ChaCha8 stream.
///
/// `word_pos` is a u128, split in two so every serde format can carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: [u8; 32],
    pub stream: u64,
    pub word_pos_hi: u64,
    pub word_pos_lo: u64,
}

impl RngState {
    pub fn capture(rng: &ChaCha8Rng) -> Self {
        let word_pos = rng.get_word_pos();
        Self {
            seed: rng.get_seed(),
            stream: rng.get_stream(),
            word_pos_hi: (word_pos >> 64) as u64,
            word_pos_lo: word_pos as u64,
        }
    }

    pub fn rebuild(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::from_seed(self.seed);
        rng.set_stream(self.stream);
        rng.set_word_pos(((self.word_pos_hi as u128) << 64) | self.word_pos_lo as u128);
        rng
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub kind: ArchetypeKind,
    pub state: AgentState,
    pub health: Health,
    pub lifecycle: Lifecycle,
    pub interruptible: bool,
    pub timers: AgentTimers,
    pub latch: HitLatch,
    pub memory: TargetMemory,
    pub patrol: PatrolRoute,
    pub knockback: Option<KnockbackMotion>,
    pub position: [f32; 3],
    pub forward: [f32; 3],
    pub rng: RngState,
}

impl AgentSnapshot {
    /// Phase index derived from the state, 0 outside `Attack`.
    pub fn phase_index(&self) -> u8 {
        match self.state {
            AgentState::Attack { phase } => phase,
            _ => 0,
        }
    }
}

impl Agent {
    pub fn snapshot(&self, body: &AgentBody) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            kind: self.profile.kind,
            state: self.state,
            health: self.health,
            lifecycle: self.lifecycle,
            interruptible: self.interruptible,
            timers: self.timers,
            latch: self.latch.clone(),
            memory: self.memory.clone(),
            patrol: self.patrol.clone(),
            knockback: self.knockback,
            position: body.position.to_array(),
            forward: body.forward.to_array(),
            rng: RngState::capture(&self.rng),
        }
    }

    /// Rebuild an agent from a snapshot. Subsequent ticks replay identically.
    pub fn restore(
        snapshot: &AgentSnapshot,
        profile: Arc<ArchetypeProfile>,
        waypoints: WaypointSet,
        behavior: Box<dyn BehaviorSource>,
    ) -> (Agent, AgentBody) {
        if profile.kind != snapshot.kind {
            crate::log_warning(&format!(
                "⚠️ restoring {:?} with a {} profile (snapshot says {})",
                snapshot.id,
                profile.kind.as_str(),
                snapshot.kind.as_str()
            ));
        }

        let agent = Agent {
            id: snapshot.id,
            profile,
            waypoints,
            behavior,
            state: snapshot.state,
            health: snapshot.health,
            lifecycle: snapshot.lifecycle,
            interruptible: snapshot.interruptible,
            timers: snapshot.timers,
            latch: snapshot.latch.clone(),
            memory: snapshot.memory.clone(),
            patrol: snapshot.patrol.clone(),
            knockback: snapshot.knockback,
            rng: snapshot.rng.rebuild(),
        };
        let body = AgentBody {
            position: Vec3::from_array(snapshot.position),
            forward: Vec3::from_array(snapshot.forward),
        };
        (agent, body)
    }
}
