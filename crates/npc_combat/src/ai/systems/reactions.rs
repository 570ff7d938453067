//! Reactions to host input (spawn triggers, damage) and lifecycle bookkeeping.

use std::collections::BTreeSet;

use bevy::prelude::*;

use crate::agent::{agent_seed, default_behavior, Agent, AgentBody};
use crate::ai::components::{AgentEventLog, Dead, SpawnGroup, SpawnZone};
use crate::ai::events::{DamageRequest, SpawnTriggered};
use crate::behavior::RewardShaper;
use crate::combat::CombatTarget;
use crate::events::{AgentEvent, AgentId};
use crate::navigation::WaypointSet;
use crate::profile::{ArchetypeKind, ArchetypeRegistry};
use crate::DeterministicRng;

/// System: пробуждение spawn-групп
///
/// Группа просыпается по явному `SpawnTriggered` или когда живая цель
/// входит в `SpawnZone` этой группы (зона срабатывает один раз).
pub fn trigger_spawn_groups(
    mut triggers: EventReader<SpawnTriggered>,
    mut zones: Query<&mut SpawnZone>,
    targets: Query<&CombatTarget, Without<Agent>>,
    mut agents: Query<(Entity, &mut Agent, &SpawnGroup)>,
    mut events: EventWriter<AgentEvent>,
) {
    let mut groups: BTreeSet<u32> = triggers.read().map(|t| t.group).collect();

    for mut zone in zones.iter_mut() {
        if zone.triggered {
            continue;
        }
        if targets.iter().any(|t| t.is_alive() && zone.contains(t.position)) {
            zone.triggered = true;
            groups.insert(zone.group);
            crate::log(&format!("🚪 SpawnZone entered → group {} triggered", zone.group));
        }
    }

    if groups.is_empty() {
        return;
    }

    let mut woken: Vec<(Entity, u32)> = agents
        .iter()
        .filter(|(_, _, group)| groups.contains(&group.0))
        .map(|(entity, _, group)| (entity, group.0))
        .collect();
    woken.sort();

    let mut emitted: Vec<AgentEvent> = Vec::new();
    for (entity, group) in woken {
        let Ok((_, mut agent, _)) = agents.get_mut(entity) else {
            continue;
        };
        if agent.activate(&mut emitted) {
            crate::log(&format!("⚔️ {:?} activated (group {})", agent.id(), group));
        }
    }
    for event in emitted {
        events.write(event);
    }
}

/// System: урон от хоста → `Agent::apply_damage`
///
/// Запросы обрабатываются в порядке поступления. Урон по мёртвым и по
/// несуществующим entity молча игнорируется.
pub fn apply_damage_requests(
    mut requests: EventReader<DamageRequest>,
    mut agents: Query<(&mut Agent, &AgentBody)>,
    mut events: EventWriter<AgentEvent>,
) {
    let mut emitted: Vec<AgentEvent> = Vec::new();
    for request in requests.read() {
        let Ok((mut agent, body)) = agents.get_mut(request.agent) else {
            continue;
        };
        let outcome = agent.apply_damage(request.amount, request.source, body, &mut emitted);
        if outcome.is_lethal() {
            crate::log(&format!(
                "💥 {:?} took lethal damage ({}) from {:?}",
                agent.id(),
                request.amount,
                request.source
            ));
        }
    }
    for event in emitted {
        events.write(event);
    }
}

/// System: маркер `Dead` на умерших агентах
pub fn mark_dead_agents(mut commands: Commands, agents: Query<(Entity, &Agent), Without<Dead>>) {
    for (entity, agent) in agents.iter() {
        if agent.is_dead() {
            commands.entity(entity).insert(Dead);
        }
    }
}

/// System: удаление мёртвых агентов после presentation delay
pub fn despawn_dead_agents(mut commands: Commands, agents: Query<(Entity, &Agent), With<Dead>>) {
    for (entity, agent) in agents.iter() {
        if agent.ready_for_removal() {
            crate::log(&format!("🧹 despawn {:?} ({})", agent.id(), agent.kind().as_str()));
            commands.entity(entity).despawn();
        }
    }
}

/// System: копия всех AgentEvent в `AgentEventLog`
pub fn record_agent_events(mut reader: EventReader<AgentEvent>, mut log: ResMut<AgentEventLog>) {
    for event in reader.read() {
        log.push(event.clone());
    }
}

/// System: reward shaping для training runs
pub fn shape_rewards(mut reader: EventReader<AgentEvent>, mut shaper: ResMut<RewardShaper>) {
    for event in reader.read() {
        shaper.observe(event);
    }
}

/// Spawn an agent entity. Without a group the agent starts patrolling at once.
///
/// AgentId = entity index; per-agent seed comes from `DeterministicRng`.
pub fn spawn_agent_in_world(
    world: &mut World,
    kind: ArchetypeKind,
    waypoints: WaypointSet,
    position: Vec3,
    group: Option<u32>,
) -> Entity {
    let profile = world.get_resource_or_insert_with(ArchetypeRegistry::default).resolve(kind);
    let seed = world.get_resource::<DeterministicRng>().map_or(0, |rng| rng.seed);

    let entity = world.spawn_empty().id();
    let id = AgentId(entity.index());
    let mut agent = Agent::new(id, profile, waypoints, default_behavior(kind), agent_seed(seed, id));

    let mut emitted: Vec<AgentEvent> = Vec::new();
    match group {
        Some(group) => {
            world.entity_mut(entity).insert(SpawnGroup(group));
        }
        None => {
            agent.activate(&mut emitted);
        }
    }
    world.entity_mut(entity).insert((agent, AgentBody::new(position)));

    crate::log(&format!(
        "🐣 spawn {:?} {} at {:?} (group {:?})",
        id,
        kind.as_str(),
        position,
        group
    ));
    for event in emitted {
        world.send_event(event);
    }
    entity
}

/// Spawn a pursued entity (player stand-in, training dummy).
pub fn spawn_target_in_world(world: &mut World, position: Vec3, max_health: u32) -> Entity {
    world.spawn(CombatTarget::new(position, max_health)).id()
}
