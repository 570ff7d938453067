//! Host → agent events.
//!
//! Agent → host уведомления живут в `crate::events::AgentEvent`.

use bevy::prelude::*;

/// Damage from outside the agent layer (player weapon, hazard).
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageRequest {
    /// Entity агента, получающего урон
    pub agent: Entity,
    pub amount: u32,
    /// Where the hit came from; becomes the agent's target hint.
    pub source: Vec3,
}

/// Wake every dormant agent of a spawn group.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnTriggered {
    pub group: u32,
}
