//! Agent construction from the archetype registry.

use bevy::prelude::*;

use super::{Agent, AgentBody};
use crate::behavior::{BehaviorSource, LearnedBehavior, ScriptedBehavior, SeekPolicy};
use crate::events::AgentId;
use crate::navigation::WaypointSet;
use crate::profile::{ArchetypeKind, ArchetypeRegistry};

/// Behavior source an archetype gets when the caller does not supply one.
pub fn default_behavior(kind: ArchetypeKind) -> Box<dyn BehaviorSource> {
    match kind {
        ArchetypeKind::Learner => Box::new(LearnedBehavior::new(SeekPolicy)),
        _ => Box::new(ScriptedBehavior),
    }
}

/// Hands out ids and per-agent RNG seeds.
///
/// Один и тот же `seed` и порядок вызовов → одинаковые агенты.
pub struct Spawner<'a> {
    registry: &'a ArchetypeRegistry,
    seed: u64,
    next_id: u32,
}

impl<'a> Spawner<'a> {
    pub fn new(registry: &'a ArchetypeRegistry, seed: u64) -> Self {
        Self {
            registry,
            seed,
            next_id: 0,
        }
    }

    /// Start numbering from `next_id` (ids already taken elsewhere).
    pub fn starting_at(mut self, next_id: u32) -> Self {
        self.next_id = next_id;
        self
    }

    pub fn spawn(
        &mut self,
        kind: ArchetypeKind,
        waypoints: WaypointSet,
        initial_position: Vec3,
        behavior: Option<Box<dyn BehaviorSource>>,
    ) -> (Agent, AgentBody) {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        let profile = self.registry.resolve(kind);
        let behavior = behavior.unwrap_or_else(|| default_behavior(kind));

        crate::log(&format!(
            "🐣 spawn {:?} {} at {:?} ({} waypoints, {})",
            id,
            kind.as_str(),
            initial_position,
            waypoints.len(),
            behavior.name()
        ));

        let agent = Agent::new(id, profile, waypoints, behavior, agent_seed(self.seed, id));
        (agent, AgentBody::new(initial_position))
    }
}

/// Per-agent seed derived from the world seed (splitmix64 finalizer).
pub fn agent_seed(world_seed: u64, id: AgentId) -> u64 {
    let mut z = world_seed ^ (id.0 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
