//! Agent tick system and the ECS-backed target provider.

use bevy::prelude::*;

use crate::agent::{Agent, AgentBody, TickContext};
use crate::combat::{CombatTarget, Strike, StrikeResponse, TargetProvider};
use crate::events::{AgentEvent, AgentId, TargetId};
use crate::navigation::{NavBounds, WaypointLeases};
use crate::perception::{ObstacleField, TargetSnapshot};

/// `TargetProvider` over every `CombatTarget` entity.
///
/// TargetId = `Entity::to_bits()`. Кандидаты отсортированы по entity,
/// чтобы tie-break в perception не зависел от порядка архетипов.
pub struct EcsTargets<'q, 'w, 's> {
    query: &'q mut Query<'w, 's, (Entity, &'static mut CombatTarget), Without<Agent>>,
    index: Vec<(TargetId, Entity)>,
}

impl<'q, 'w, 's> EcsTargets<'q, 'w, 's> {
    pub fn new(query: &'q mut Query<'w, 's, (Entity, &'static mut CombatTarget), Without<Agent>>) -> Self {
        let mut index: Vec<(TargetId, Entity)> = query
            .iter()
            .map(|(entity, _)| (TargetId(entity.to_bits()), entity))
            .collect();
        index.sort_by_key(|(_, entity)| *entity);
        Self { query, index }
    }

    fn entity(&self, id: TargetId) -> Option<Entity> {
        self.index.iter().find(|(known, _)| *known == id).map(|(_, e)| *e)
    }
}

impl TargetProvider for EcsTargets<'_, '_, '_> {
    fn candidates(&self) -> Vec<TargetSnapshot> {
        self.index
            .iter()
            .filter_map(|(id, entity)| self.query.get(*entity).ok().map(|(_, t)| t.snapshot(*id)))
            .collect()
    }

    fn strike(&mut self, target: TargetId, strike: &Strike) -> StrikeResponse {
        let Some(entity) = self.entity(target) else {
            return StrikeResponse::Missed;
        };
        match self.query.get_mut(entity) {
            Ok((_, mut defender)) => defender.receive(strike),
            Err(_) => StrikeResponse::Missed,
        }
    }
}

/// System: один тик state machine для каждого агента
///
/// Агенты обходятся в порядке Entity (детерминизм). Позиции соседей
/// снимаются один раз в начале тика.
pub fn tick_agents(
    time: Res<Time<Fixed>>,
    mut agents: Query<(Entity, &mut Agent, &mut AgentBody)>,
    mut targets: Query<(Entity, &'static mut CombatTarget), Without<Agent>>,
    obstacles: Res<ObstacleField>,
    bounds: Res<NavBounds>,
    mut leases: ResMut<WaypointLeases>,
    mut events: EventWriter<AgentEvent>,
) {
    let delta = time.timestep().as_secs_f32();

    let mut order: Vec<Entity> = agents.iter().map(|(entity, _, _)| entity).collect();
    order.sort();
    let mut peers: Vec<(AgentId, Vec3)> = agents
        .iter()
        .filter(|(_, agent, _)| !agent.is_dead())
        .map(|(_, agent, body)| (agent.id(), body.position))
        .collect();
    peers.sort_by_key(|(id, _)| *id);

    let mut provider = EcsTargets::new(&mut targets);
    let mut emitted: Vec<AgentEvent> = Vec::new();

    for entity in order {
        let Ok((_, mut agent, mut body)) = agents.get_mut(entity) else {
            continue;
        };
        let mut ctx = TickContext {
            targets: &mut provider,
            obstacles: &*obstacles,
            navigation: &*bounds,
            leases: &mut leases,
            peers: &peers,
            events: &mut emitted,
        };
        agent.tick(&mut body, delta, &mut ctx);
    }

    for event in emitted {
        events.write(event);
    }
}
