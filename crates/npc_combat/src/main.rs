//! Headless симуляция агентов
//!
//! Запускает Bevy App без рендера: арена, training dummy, группа врагов
//! и boss. Полезно для проверки детерминизма и тюнинга профилей.

use bevy::prelude::*;
use clap::Parser;

use npc_combat::{
    create_headless_app, log_error, run_fixed_tick, set_log_level, spawn_agent_in_world, spawn_target_in_world, Agent,
    AgentBody, AgentEvent, AgentEventLog, ArchetypeKind, ArchetypeRegistry, CombatTarget, DamageRequest, LogLevel,
    Obstacle, ObstacleField, SpawnZone, WaypointSet,
};

/// Command line arguments for the demo
#[derive(Parser, Debug)]
#[command(name = "npc_combat")]
#[command(about = "Headless enemy-agent combat simulation")]
struct Args {
    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of fixed ticks (60 Hz) to simulate
    #[arg(long, default_value_t = 1800)]
    ticks: u64,

    /// TOML file overriding built-in archetype profiles
    #[arg(long)]
    archetypes: Option<String>,

    /// Number of regular enemies in the triggered spawn group
    #[arg(long, default_value_t = 4)]
    enemies: u32,

    /// Damage the dummy deals to the nearest agent once per second
    #[arg(long, default_value_t = 25)]
    player_damage: u32,

    /// Print every agent snapshot as JSON at the end
    #[arg(long)]
    snapshot: bool,

    /// Only print warnings and errors
    #[arg(long)]
    quiet: bool,
}

const ENEMY_KINDS: [ArchetypeKind; 4] = [
    ArchetypeKind::Creep,
    ArchetypeKind::Brute,
    ArchetypeKind::Juggernaut,
    ArchetypeKind::Learner,
];

fn main() {
    let args = Args::parse();

    println!("NPC combat headless simulation");
    println!("==============================");
    println!("Seed: {}", args.seed);
    println!("Ticks: {}", args.ticks);
    println!("Enemies: {} + boss", args.enemies);
    println!();

    let mut app = create_headless_app(args.seed);
    if args.quiet {
        set_log_level(LogLevel::Warning);
    }

    if let Some(path) = &args.archetypes {
        match ArchetypeRegistry::from_file(path) {
            Ok(registry) => {
                app.insert_resource(registry);
            }
            Err(err) => {
                log_error(&format!("❌ archetypes {}: {} (using built-in table)", path, err));
            }
        }
    }

    let dummy = build_arena(app.world_mut(), &args);
    let mut tally = Tally::default();

    for tick in 0..args.ticks {
        // Раз в секунду dummy бьёт ближайшего живого агента
        if args.player_damage > 0 && tick % 60 == 30 {
            strike_nearest(app.world_mut(), dummy, args.player_damage);
        }
        run_fixed_tick(&mut app);

        // Лог сливается каждый тик, в памяти держим только счётчики
        for event in app.world_mut().resource_mut::<AgentEventLog>().drain() {
            tally.record(&event);
        }

        if tick % 300 == 0 {
            print_status(app.world_mut(), tick);
        }
    }

    print_summary(app.world(), dummy, &tally);

    if args.snapshot {
        let mut agents = app.world_mut().query::<(Entity, &Agent, &AgentBody)>();
        let mut snapshots: Vec<_> = agents
            .iter(app.world())
            .map(|(entity, agent, body)| (entity, agent.snapshot(body)))
            .collect();
        snapshots.sort_by_key(|(entity, _)| *entity);
        for (_, snapshot) in snapshots {
            match serde_json::to_string(&snapshot) {
                Ok(json) => println!("{}", json),
                Err(err) => log_error(&format!("❌ snapshot {:?}: {}", snapshot.id, err)),
            }
        }
    }
}

/// Arena: 4 pillars, a wall, the dummy at the centre, a spawn zone around it.
fn build_arena(world: &mut World, args: &Args) -> Entity {
    world.insert_resource(ObstacleField::new(vec![
        Obstacle::pillar(Vec3::new(8.0, 0.0, 8.0), 1.0),
        Obstacle::pillar(Vec3::new(-8.0, 0.0, 8.0), 1.0),
        Obstacle::pillar(Vec3::new(8.0, 0.0, -8.0), 1.0),
        Obstacle::pillar(Vec3::new(-8.0, 0.0, -8.0), 1.0),
        Obstacle::wall(Vec3::new(-4.0, 0.0, 18.0), Vec3::new(4.0, 2.0, 19.0)),
    ]));

    let dummy = spawn_target_in_world(world, Vec3::ZERO, 500);
    world.spawn(SpawnZone::new(Vec3::ZERO, 6.0, 1));

    let ring = WaypointSet::new(
        (0..6)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 6.0;
                Vec3::new(angle.cos() * 25.0, 0.0, angle.sin() * 25.0)
            })
            .collect(),
    );
    for i in 0..args.enemies {
        let kind = ENEMY_KINDS[i as usize % ENEMY_KINDS.len()];
        let angle = i as f32 * std::f32::consts::TAU / args.enemies.max(1) as f32;
        let position = Vec3::new(angle.cos() * 30.0, 0.0, angle.sin() * 30.0);
        spawn_agent_in_world(world, kind, ring.clone(), position, Some(1));
    }

    let lair = WaypointSet::new(vec![
        Vec3::new(0.0, 0.0, -45.0),
        Vec3::new(15.0, 0.0, -50.0),
        Vec3::new(-15.0, 0.0, -50.0),
    ]);
    spawn_agent_in_world(world, ArchetypeKind::Boss, lair, Vec3::new(0.0, 0.0, -48.0), None);

    dummy
}

fn strike_nearest(world: &mut World, dummy: Entity, amount: u32) {
    let Some(origin) = world.get::<CombatTarget>(dummy).filter(|t| t.is_alive()).map(|t| t.position) else {
        return;
    };

    let mut agents = world.query::<(Entity, &Agent, &AgentBody)>();
    let nearest = agents
        .iter(world)
        .filter(|(_, agent, body)| !agent.is_dead() && body.position.distance(origin) <= 3.0)
        .min_by(|a, b| a.2.position.distance(origin).total_cmp(&b.2.position.distance(origin)))
        .map(|(entity, _, _)| entity);

    if let Some(agent) = nearest {
        world.send_event(DamageRequest {
            agent,
            amount,
            source: origin,
        });
    }
}

fn print_status(world: &mut World, tick: u64) {
    let mut agents = world.query::<&Agent>();
    let states: Vec<String> = agents
        .iter(world)
        .map(|agent| format!("{}:{}", agent.kind().as_str(), agent.current_state().label()))
        .collect();
    println!("Tick {}: {}", tick, states.join(" "));
}

/// Running event counters for the summary.
#[derive(Debug, Default)]
struct Tally {
    events: usize,
    hits: usize,
    parries: usize,
    deaths: usize,
    loops: usize,
    skills: usize,
}

impl Tally {
    fn record(&mut self, event: &AgentEvent) {
        self.events += 1;
        match event {
            AgentEvent::HitLanded { .. } => self.hits += 1,
            AgentEvent::Parried { .. } => self.parries += 1,
            AgentEvent::Died { .. } => self.deaths += 1,
            AgentEvent::PatrolLoopCompleted { .. } => self.loops += 1,
            AgentEvent::SkillStarted { .. } => self.skills += 1,
            _ => {}
        }
    }
}

fn print_summary(world: &World, dummy: Entity, tally: &Tally) {
    println!();
    println!("Simulation complete!");
    println!("Events: {}", tally.events);
    println!("Hits landed: {}, parried: {}", tally.hits, tally.parries);
    println!("Skills used: {}", tally.skills);
    println!("Patrol loops: {}", tally.loops);
    println!("Agents died: {}", tally.deaths);
    match world.get::<CombatTarget>(dummy) {
        Some(target) => println!("Dummy health: {}/{}", target.health, target.max_health),
        None => println!("Dummy removed"),
    }
}
