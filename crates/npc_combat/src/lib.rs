//! NPC Combat Core
//!
//! Enemy agents на Bevy 0.16 ECS: patrol → detection → chase → multi-phase
//! attack, hurt interrupt, death lifecycle. Один state machine для всех видов
//! (boss, обычные враги, learned policy).
//!
//! Слои:
//! - `agent` = чистое ядро (без ECS): state machine, таймеры, snapshot
//! - `ai` = ECS glue: FixedUpdate системы, spawn triggers, damage requests
//! - perception / navigation / combat / behavior = коллабораторы ядра

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod agent;
pub mod ai;
pub mod behavior;
pub mod combat;
pub mod events;
pub mod lifecycle;
pub mod logger;
pub mod navigation;
pub mod perception;
pub mod profile;

// Re-export основных типов для удобства
pub use agent::{Agent, AgentBody, AgentSnapshot, AgentState, Spawner, TickContext};
pub use ai::{
    spawn_agent_in_world, spawn_target_in_world, AgentEventLog, AgentPlugin, DamageRequest, Dead,
    RewardShapingPlugin, SpawnGroup, SpawnTriggered, SpawnZone,
};
pub use combat::CombatTarget;
pub use events::{AgentEvent, AgentId, EventSink, TargetId};
pub use lifecycle::DamageOutcome;
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, set_log_level, set_logger, LogLevel, LogPrinter, MemoryLogger,
};
pub use navigation::{NavBounds, WaypointLeases, WaypointSet};
pub use perception::{Obstacle, ObstacleField};
pub use profile::{ArchetypeKind, ArchetypeProfile, ArchetypeRegistry};

/// Главный plugin симуляции (fixed timestep + RNG + agents)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // Fixed timestep 60Hz для simulation tick
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        // Детерминистичный RNG (seed по умолчанию, если хост не задал свой)
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }
        app.add_plugins(AgentPlugin);
    }
}

/// Детерминистичный RNG resource (seeded)
///
/// Агенты берут из него только seed; у каждого свой ChaCha8 поток.
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .add_plugins(SimulationPlugin);

    app
}

/// One fixed-step tick, independent of wall-clock time.
///
/// Main schedule не запускается, поэтому буферы событий крутим сами:
/// иначе `Events<T>` растут бесконечно.
pub fn run_fixed_tick(app: &mut App) {
    let world = app.world_mut();
    world.run_schedule(FixedUpdate);
    rotate_events::<AgentEvent>(world);
    rotate_events::<DamageRequest>(world);
    rotate_events::<SpawnTriggered>(world);
}

fn rotate_events<E: Event>(world: &mut World) {
    if let Some(mut events) = world.get_resource_mut::<Events<E>>() {
        events.update();
    }
}
