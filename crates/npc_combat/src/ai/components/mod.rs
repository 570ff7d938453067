//! ECS-side components and resources around the agent core.

use bevy::prelude::*;

use crate::events::AgentEvent;


/// Spawn group the agent waits on while `Dormant`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct SpawnGroup(pub u32);

/// Trigger volume: the first live target entering it wakes `group`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct SpawnZone {
    pub center: Vec3,
    pub radius: f32,
    pub group: u32,
    /// Зона срабатывает один раз
    pub triggered: bool,
}

impl SpawnZone {
    pub fn new(center: Vec3, radius: f32, group: u32) -> Self {
        Self {
            center,
            radius,
            group,
            triggered: false,
        }
    }

    /// Ground-plane containment.
    pub fn contains(&self, point: Vec3) -> bool {
        let mut offset = point - self.center;
        offset.y = 0.0;
        offset.length() <= self.radius
    }
}

/// Marker: agent is dead (collider off, AI off), waiting for despawn.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Dead;

/// Recent agent events, in emission order.
///
/// Хранит не больше `capacity` событий: при переполнении старая половина
/// выбрасывается. Хосту, которому нужна полная история, стоит делать `drain`
/// каждый тик.
#[derive(Resource, Debug)]
pub struct AgentEventLog {
    events: Vec<AgentEvent>,
    capacity: usize,
    dropped: usize,
}

impl Default for AgentEventLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl AgentEventLog {
    pub const DEFAULT_CAPACITY: usize = 16_384;

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity: capacity.max(2),
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: AgentEvent) {
        if self.events.len() >= self.capacity {
            let stale = self.capacity / 2;
            self.events.drain(..stale);
            self.dropped += stale;
        }
        self.events.push(event);
    }

    /// Events discarded because the log was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn events(&self) -> &[AgentEvent] {
        &self.events
    }

    pub fn count(&self, matches: impl Fn(&AgentEvent) -> bool) -> usize {
        self.events.iter().filter(|e| matches(e)).count()
    }

    pub fn drain(&mut self) -> Vec<AgentEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
