//! ECS glue: drives agents from Bevy's fixed timestep.
//!
//! Ядро (`agent`) ничего не знает про ECS. Здесь — компоненты-маркеры,
//! события хоста и системы, которые раз в FixedUpdate собирают
//! коллабораторов (цели, препятствия, навигация, leases) и тикают агентов.

use bevy::prelude::*;

pub mod components;
pub mod events;
pub mod systems;

pub use components::{AgentEventLog, Dead, SpawnGroup, SpawnZone};
pub use events::{DamageRequest, SpawnTriggered};
pub use systems::{spawn_agent_in_world, spawn_target_in_world, EcsTargets};

use crate::behavior::RewardShaper;
use crate::events::AgentEvent;
use crate::navigation::{NavBounds, WaypointLeases};
use crate::perception::ObstacleField;
use crate::profile::ArchetypeRegistry;

/// Agent Plugin
///
/// Регистрирует agent системы в FixedUpdate для детерминизма.
/// Порядок выполнения:
/// 1. trigger_spawn_groups — Dormant → Patrol по триггеру/зоне
/// 2. advance_leases — часы waypoint leases
/// 3. apply_damage_requests — урон от хоста (игрок, ловушки)
/// 4. tick_agents — perception → guards → тик состояния
/// 5. tick_target_knockback — отброс целей после ударов
/// 6. mark_dead_agents — маркер `Dead` для хоста
/// 7. despawn_dead_agents — удаление после presentation delay
/// 8. record_agent_events — лог событий для хоста/тестов
pub struct AgentPlugin;

impl Plugin for AgentPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AgentEvent>()
            .add_event::<DamageRequest>()
            .add_event::<SpawnTriggered>()
            .init_resource::<ArchetypeRegistry>()
            .init_resource::<ObstacleField>()
            .init_resource::<NavBounds>()
            .init_resource::<WaypointLeases>()
            .init_resource::<AgentEventLog>()
            .add_systems(
                FixedUpdate,
                (
                    systems::trigger_spawn_groups,
                    systems::advance_leases,
                    systems::apply_damage_requests,
                    systems::tick_agents,
                    systems::tick_target_knockback,
                    systems::mark_dead_agents,
                    systems::despawn_dead_agents,
                    systems::record_agent_events,
                )
                    .chain(), // Последовательное выполнение для детерминизма
            );
    }
}

/// Optional training hook: accumulates per-agent reward from agent events.
pub struct RewardShapingPlugin;

impl Plugin for RewardShapingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RewardShaper>().add_systems(
            FixedUpdate,
            systems::shape_rewards.after(systems::record_agent_events),
        );
    }
}
