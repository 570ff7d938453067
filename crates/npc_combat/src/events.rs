//! Agent notifications and the sink that receives them.
//!
//! Fire-and-forget: audio, VFX, UI и прогрессия подписываются на эти события,
//! ядро никогда не ждёт ответа.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::agent::AgentState;
use crate::profile::ArchetypeKind;

/// Stable agent identifier, assigned by the spawner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

/// Identifier of a pursued entity, owned by the target provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

#[derive(Event, Debug, Clone, PartialEq)]
pub enum AgentEvent {
    StateEntered {
        agent: AgentId,
        state: AgentState,
    },
    StateExited {
        agent: AgentId,
        state: AgentState,
    },
    AttackPhaseStarted {
        agent: AgentId,
        phase: u8,
    },
    SkillStarted {
        agent: AgentId,
    },
    HitLanded {
        agent: AgentId,
        target: TargetId,
        damage: u32,
    },
    Parried {
        agent: AgentId,
        target: TargetId,
    },
    DamageTaken {
        agent: AgentId,
        amount: u32,
        remaining: u32,
    },
    Died {
        agent: AgentId,
        kind: ArchetypeKind,
        position: Vec3,
        /// Presentation delay before the agent is removed.
        despawn_after: f32,
    },
    TargetKilled {
        agent: AgentId,
        target: TargetId,
    },
    PatrolPointReached {
        agent: AgentId,
        index: usize,
    },
    PatrolLoopCompleted {
        agent: AgentId,
        loops: u32,
    },
}

impl AgentEvent {
    pub fn agent(&self) -> AgentId {
        match self {
            AgentEvent::StateEntered { agent, .. }
            | AgentEvent::StateExited { agent, .. }
            | AgentEvent::AttackPhaseStarted { agent, .. }
            | AgentEvent::SkillStarted { agent }
            | AgentEvent::HitLanded { agent, .. }
            | AgentEvent::Parried { agent, .. }
            | AgentEvent::DamageTaken { agent, .. }
            | AgentEvent::Died { agent, .. }
            | AgentEvent::TargetKilled { agent, .. }
            | AgentEvent::PatrolPointReached { agent, .. }
            | AgentEvent::PatrolLoopCompleted { agent, .. } => *agent,
        }
    }
}

/// Receiver of agent notifications.
pub trait EventSink {
    fn notify(&mut self, event: AgentEvent);
}

impl EventSink for Vec<AgentEvent> {
    fn notify(&mut self, event: AgentEvent) {
        self.push(event);
    }
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&mut self, _event: AgentEvent) {}
}
