//! State machine tests against plain-data collaborators (no ECS).

use std::sync::Arc;

use bevy::prelude::*;

use super::*;
use crate::behavior::{LearnedBehavior, ScriptedBehavior, SeekPolicy};
use crate::combat::{CombatTarget, TargetRoster};
use crate::events::{AgentEvent, TargetId};
use crate::lifecycle::DamageOutcome;
use crate::navigation::{NavBounds, WaypointLeases};
use crate::perception::ObstacleField;
use crate::profile::PatrolSpec;

const DT: f32 = 0.125;
const TARGET: TargetId = TargetId(1);

struct Arena {
    targets: TargetRoster,
    obstacles: ObstacleField,
    bounds: NavBounds,
    leases: WaypointLeases,
    events: Vec<AgentEvent>,
}

impl Arena {
    fn new() -> Self {
        Self {
            targets: TargetRoster::new(),
            obstacles: ObstacleField::default(),
            bounds: NavBounds::square(200.0),
            leases: WaypointLeases::new(),
            events: Vec::new(),
        }
    }

    fn with_target(mut self, position: Vec3) -> Self {
        self.targets.insert(TARGET, CombatTarget::new(position, 100));
        self
    }

    fn target(&self) -> &CombatTarget {
        self.targets.get(TARGET).expect("target present")
    }

    fn target_mut(&mut self) -> &mut CombatTarget {
        self.targets.get_mut(TARGET).expect("target present")
    }

    fn tick(&mut self, agent: &mut Agent, body: &mut AgentBody) {
        self.tick_by(agent, body, DT);
    }

    fn tick_by(&mut self, agent: &mut Agent, body: &mut AgentBody, delta: f32) {
        self.leases.advance(delta);
        let mut ctx = TickContext {
            targets: &mut self.targets,
            obstacles: &self.obstacles,
            navigation: &self.bounds,
            leases: &mut self.leases,
            peers: &[],
            events: &mut self.events,
        };
        agent.tick(body, delta, &mut ctx);
        self.targets.tick(delta);
    }

    /// Tick until `done` holds; returns the number of ticks taken.
    fn tick_until(
        &mut self,
        agent: &mut Agent,
        body: &mut AgentBody,
        max_ticks: usize,
        done: impl Fn(&Agent) -> bool,
    ) -> Option<usize> {
        for tick in 1..=max_ticks {
            self.tick(agent, body);
            if done(agent) {
                return Some(tick);
            }
        }
        None
    }

    fn count(&self, matches: impl Fn(&AgentEvent) -> bool) -> usize {
        self.events.iter().filter(|e| matches(e)).count()
    }
}

fn profile(kind: ArchetypeKind) -> ArchetypeProfile {
    ArchetypeProfile::builtin(kind)
}

fn spawn(profile: ArchetypeProfile, waypoints: WaypointSet, arena: &mut Arena) -> (Agent, AgentBody) {
    let behavior: Box<dyn BehaviorSource> = match profile.kind {
        ArchetypeKind::Learner => Box::new(LearnedBehavior::new(SeekPolicy)),
        _ => Box::new(ScriptedBehavior),
    };
    let mut agent = Agent::new(AgentId(1), Arc::new(profile), waypoints, behavior, 7);
    assert!(agent.activate(&mut arena.events));
    (agent, AgentBody::new(Vec3::ZERO))
}

fn engaged(kind: ArchetypeKind, target: Vec3) -> (Arena, Agent, AgentBody) {
    let mut arena = Arena::new().with_target(target);
    let (mut agent, mut body) = spawn(profile(kind), WaypointSet::default(), &mut arena);
    arena
        .tick_until(&mut agent, &mut body, 20, |a| a.current_state() == AgentState::Chase)
        .expect("agent should start chasing");
    (arena, agent, body)
}

#[test]
fn test_dormant_until_activated() {
    let mut arena = Arena::new().with_target(Vec3::new(0.0, 0.0, -5.0));
    let mut agent = Agent::new(
        AgentId(1),
        Arc::new(profile(ArchetypeKind::Creep)),
        WaypointSet::default(),
        Box::new(ScriptedBehavior),
        1,
    );
    let mut body = AgentBody::new(Vec3::ZERO);

    for _ in 0..10 {
        arena.tick(&mut agent, &mut body);
    }
    assert_eq!(agent.current_state(), AgentState::Dormant);
    assert!(arena.events.is_empty());

    assert!(agent.activate(&mut arena.events));
    assert!(!agent.activate(&mut arena.events));
    assert_eq!(agent.current_state(), AgentState::Patrol);
    assert_eq!(
        arena.events,
        vec![
            AgentEvent::StateExited {
                agent: AgentId(1),
                state: AgentState::Dormant
            },
            AgentEvent::StateEntered {
                agent: AgentId(1),
                state: AgentState::Patrol
            },
        ]
    );
}

#[test]
fn test_detection_goes_through_alert() {
    let mut arena = Arena::new().with_target(Vec3::new(0.0, 0.0, -5.0));
    let (mut agent, mut body) = spawn(profile(ArchetypeKind::Creep), WaypointSet::default(), &mut arena);

    arena.tick(&mut agent, &mut body);
    assert_eq!(agent.current_state(), AgentState::Alert);

    // Alert 0.5s = 4 тика, затем guard → Chase
    let ticks = arena
        .tick_until(&mut agent, &mut body, 10, |a| a.current_state() == AgentState::Chase)
        .expect("alert should end");
    assert_eq!(ticks, 5);
}

#[test]
fn test_target_behind_is_not_detected() {
    let mut arena = Arena::new().with_target(Vec3::new(0.0, 0.0, 5.0));
    let (mut agent, mut body) = spawn(profile(ArchetypeKind::Creep), WaypointSet::default(), &mut arena);

    for _ in 0..10 {
        arena.tick(&mut agent, &mut body);
    }
    assert_eq!(agent.current_state(), AgentState::Patrol);
}

#[test]
fn test_lost_target_returns_to_patrol_after_grace() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Creep, Vec3::new(0.0, 0.0, -5.0));

    arena.target_mut().position = Vec3::new(0.0, 0.0, -60.0);
    arena.tick(&mut agent, &mut body);
    assert_eq!(agent.current_state(), AgentState::Chase, "one grace cycle");

    arena.tick(&mut agent, &mut body);
    assert_eq!(agent.current_state(), AgentState::Patrol);
    assert!(agent.target_memory().target().is_none());
}

#[test]
fn test_one_hit_per_phase_activation() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Creep, Vec3::new(0.0, 0.0, -1.5));

    arena
        .tick_until(&mut agent, &mut body, 5, |a| a.phase_index() == 1)
        .expect("attack should start");
    arena
        .tick_until(&mut agent, &mut body, 20, |a| a.current_state() == AgentState::Recover)
        .expect("attack should finish");

    assert_eq!(arena.count(|e| matches!(e, AgentEvent::HitLanded { .. })), 1);
    assert_eq!(arena.target().health, 96);
    assert_eq!(agent.phase_index(), 0);
}

#[test]
fn test_long_ticks_do_not_skip_hit_window() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Creep, Vec3::new(0.0, 0.0, -1.5));

    // 0.3s шаг длиннее окна удара (0.35..0.6) — окно перешагивается целиком
    for _ in 0..40 {
        arena.tick_by(&mut agent, &mut body, 0.3);
    }

    let phases = arena.count(|e| matches!(e, AgentEvent::AttackPhaseStarted { .. }));
    let hits = arena.count(|e| matches!(e, AgentEvent::HitLanded { .. }));
    assert!(phases >= 1);
    assert!(hits >= 1, "{} phases started, no hit landed", phases);
    assert!(hits <= phases);
    assert_eq!(arena.target().health, 100 - 4 * hits as u32);
}

#[test]
fn test_removed_target_degrades_to_patrol() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Creep, Vec3::new(0.0, 0.0, -5.0));

    assert!(arena.targets.remove(TARGET).is_some());
    arena.tick(&mut agent, &mut body);
    assert_eq!(agent.current_state(), AgentState::Chase, "one grace cycle");

    arena.tick(&mut agent, &mut body);
    assert_eq!(agent.current_state(), AgentState::Patrol);
    assert!(agent.target_memory().target().is_none());
    assert!(!agent.is_dead());
}

#[test]
fn test_unreachable_patrol_point_holds_position() {
    let mut arena = Arena::new();
    let far_away = WaypointSet::new(vec![Vec3::new(500.0, 0.0, 0.0), Vec3::new(500.0, 0.0, 20.0)]);
    let (mut agent, mut body) = spawn(profile(ArchetypeKind::Creep), far_away, &mut arena);

    for _ in 0..40 {
        arena.tick(&mut agent, &mut body);
    }
    assert_eq!(agent.current_state(), AgentState::Patrol);
    assert_eq!(body.position, Vec3::ZERO);
    assert_eq!(arena.count(|e| matches!(e, AgentEvent::PatrolPointReached { .. })), 0);
}

#[test]
fn test_off_mesh_chase_holds_position() {
    // Цель за краем навигационной области
    let mut arena = Arena::new().with_target(Vec3::new(0.0, 0.0, -203.5));
    let (mut agent, mut body) = spawn(profile(ArchetypeKind::Creep), WaypointSet::default(), &mut arena);
    body.position = Vec3::new(0.0, 0.0, -198.0);

    arena
        .tick_until(&mut agent, &mut body, 20, |a| a.current_state() == AgentState::Chase)
        .expect("target inside detection radius");
    for _ in 0..20 {
        arena.tick(&mut agent, &mut body);
    }
    assert_eq!(agent.current_state(), AgentState::Chase);
    assert_eq!(body.position, Vec3::new(0.0, 0.0, -198.0));
}

#[test]
fn test_recover_cooldown_then_rechase() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Creep, Vec3::new(0.0, 0.0, -1.5));
    arena
        .tick_until(&mut agent, &mut body, 30, |a| a.current_state() == AgentState::Recover)
        .expect("attack cycle");

    let ticks = arena
        .tick_until(&mut agent, &mut body, 40, |a| a.current_state() != AgentState::Recover)
        .expect("cooldown should end");
    // 2s cooldown = 16 тиков + тик guard'а
    assert_eq!(ticks, 17);
    assert_eq!(agent.current_state(), AgentState::Chase);
}

#[test]
fn test_recover_gives_up_beyond_rechase_distance() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Creep, Vec3::new(0.0, 0.0, -1.5));
    arena
        .tick_until(&mut agent, &mut body, 30, |a| a.current_state() == AgentState::Recover)
        .expect("attack cycle");

    arena.target_mut().position = Vec3::new(0.0, 0.0, -12.0);
    arena
        .tick_until(&mut agent, &mut body, 40, |a| a.current_state() != AgentState::Recover)
        .expect("cooldown should end");
    assert_eq!(agent.current_state(), AgentState::Patrol);
}

#[test]
fn test_hurt_interrupt_outside_hit_window() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Creep, Vec3::new(0.0, 0.0, -1.5));
    arena
        .tick_until(&mut agent, &mut body, 5, |a| a.phase_index() == 1)
        .expect("attack should start");
    assert!(agent.is_interruptible());

    let outcome = agent.apply_damage(10, arena.target().position, &body, &mut arena.events);
    assert_eq!(outcome, DamageOutcome::Wounded { interrupted: true });
    assert_eq!(agent.current_state(), AgentState::HurtInterrupt);
    assert!(!agent.is_interruptible());

    // Короткая неуязвимость после прерывания
    let again = agent.apply_damage(10, arena.target().position, &body, &mut arena.events);
    assert_eq!(again, DamageOutcome::Absorbed);
    assert_eq!(agent.health().current(), 90);

    arena
        .tick_until(&mut agent, &mut body, 10, |a| a.current_state() == AgentState::Chase)
        .expect("hurt recovery should end");
}

#[test]
fn test_damage_hint_survives_hurt_recovery() {
    let mut arena = Arena::new();
    let (mut agent, mut body) = spawn(profile(ArchetypeKind::Creep), WaypointSet::default(), &mut arena);
    arena.tick(&mut agent, &mut body);

    // Удар со спины, цели в поле зрения нет
    let source = Vec3::new(0.0, 0.0, 8.0);
    let outcome = agent.apply_damage(10, source, &body, &mut arena.events);
    assert_eq!(outcome, DamageOutcome::Wounded { interrupted: true });

    let ticks = arena
        .tick_until(&mut agent, &mut body, 10, |a| a.current_state() != AgentState::HurtInterrupt)
        .expect("hurt recovery should end");
    assert!(ticks > 2);
    assert_eq!(agent.current_state(), AgentState::Chase);
    assert!(body.forward.z > 0.9, "turned toward the hit");

    // Первый тик Chase идёт к месту удара, потом grace заканчивается
    arena.tick(&mut agent, &mut body);
    assert_eq!(agent.current_state(), AgentState::Chase);
    assert!(body.position.z > 0.0);
    arena.tick(&mut agent, &mut body);
    assert_eq!(agent.current_state(), AgentState::Patrol);
}

#[test]
fn test_no_interrupt_inside_hit_window() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Creep, Vec3::new(0.0, 0.0, -1.5));
    arena
        .tick_until(&mut agent, &mut body, 5, |a| a.phase_index() == 1)
        .expect("attack should start");
    arena
        .tick_until(&mut agent, &mut body, 5, |a| !a.is_interruptible())
        .expect("hit window should open");

    let outcome = agent.apply_damage(10, arena.target().position, &body, &mut arena.events);
    assert_eq!(outcome, DamageOutcome::Wounded { interrupted: false });
    assert_eq!(agent.current_state(), AgentState::Attack { phase: 1 });
    assert_eq!(agent.health().current(), 90);
}

#[test]
fn test_boss_lethal_damage_in_chase() {
    let (mut arena, mut agent, body) = engaged(ArchetypeKind::Boss, Vec3::new(0.0, 0.0, -20.0));

    let outcome = agent.apply_damage(1000, Vec3::new(0.0, 0.0, -20.0), &body, &mut arena.events);
    assert_eq!(outcome, DamageOutcome::Killed);
    assert_eq!(agent.current_state(), AgentState::Dead);
    assert!(agent.is_dead());
    assert!(!agent.colliders_enabled());
    assert_eq!(agent.health().current(), 0);
    assert_eq!(arena.count(|e| matches!(e, AgentEvent::Died { .. })), 1);
}

#[test]
fn test_dead_agent_is_terminal() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Creep, Vec3::new(0.0, 0.0, -5.0));
    agent.apply_damage(500, Vec3::ZERO, &body, &mut arena.events);
    let events_at_death = arena.events.len();

    assert_eq!(
        agent.apply_damage(10, Vec3::ZERO, &body, &mut arena.events),
        DamageOutcome::Ignored
    );
    assert!(!agent.activate(&mut arena.events));
    for _ in 0..10 {
        arena.tick(&mut agent, &mut body);
    }

    assert_eq!(arena.events.len(), events_at_death);
    assert_eq!(agent.current_state(), AgentState::Dead);
    assert_eq!(arena.count(|e| matches!(e, AgentEvent::Died { .. })), 1);
    assert!(!agent.ready_for_removal());

    // despawn_delay 8s
    arena
        .tick_until(&mut agent, &mut body, 70, |a| a.ready_for_removal())
        .expect("despawn delay should run out");
}

#[test]
fn test_skill_fires_after_continuous_chase() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Boss, Vec3::new(0.0, 0.0, -30.0));

    arena
        .tick_until(&mut agent, &mut body, 60, |a| a.current_state() == AgentState::Skill)
        .expect("skill should fire");
    assert_eq!(arena.count(|e| matches!(e, AgentEvent::SkillStarted { .. })), 1);
    assert!(!agent.is_interruptible());

    let outcome = agent.apply_damage(50, Vec3::new(0.0, 0.0, -30.0), &body, &mut arena.events);
    assert_eq!(outcome, DamageOutcome::Wounded { interrupted: false });
    assert_eq!(agent.current_state(), AgentState::Skill);

    // Рывок до контакта → сразу первая фаза атаки
    arena
        .tick_until(&mut agent, &mut body, 20, |a| a.current_state() == AgentState::Attack { phase: 1 })
        .expect("charge should reach the target");
    assert!(arena.events.contains(&AgentEvent::HitLanded {
        agent: AgentId(1),
        target: TARGET,
        damage: 20,
    }));
    assert_eq!(arena.target().health, 80);
}

#[test]
fn test_parry_recoils_the_attacker() {
    let target_position = Vec3::new(0.0, 0.0, -1.5);
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Creep, target_position);
    {
        let target = arena.target_mut();
        target.forward = Vec3::Z;
        target.parrying = true;
    }

    arena
        .tick_until(&mut agent, &mut body, 20, |a| a.is_knocked_back())
        .expect("strike should be parried");
    assert_eq!(arena.count(|e| matches!(e, AgentEvent::Parried { .. })), 1);
    assert_eq!(arena.target().health, 100);

    arena.tick(&mut agent, &mut body);
    assert!(body.position.z > 0.0, "pushed away from the defender");
}

#[test]
fn test_killing_blow_reports_target_killed() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Creep, Vec3::new(0.0, 0.0, -1.5));
    arena.target_mut().health = 3;

    arena
        .tick_until(&mut agent, &mut body, 20, |a| a.current_state() == AgentState::Recover)
        .expect("attack cycle");
    assert_eq!(arena.count(|e| matches!(e, AgentEvent::TargetKilled { .. })), 1);
    assert!(!arena.target().is_alive());
}

fn square_route() -> WaypointSet {
    WaypointSet::new(vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(4.0, 0.0, 0.0),
        Vec3::new(4.0, 0.0, 4.0),
        Vec3::new(0.0, 0.0, 4.0),
    ])
}

fn still_patrol(kind: ArchetypeKind) -> ArchetypeProfile {
    ArchetypeProfile {
        patrol: PatrolSpec {
            dwell_time: 0.25,
            jitter_radius: 0.0,
            ..PatrolSpec::default()
        },
        ..profile(kind)
    }
}

#[test]
fn test_patrol_loop_completes_once() {
    let mut arena = Arena::new();
    let (mut agent, mut body) = spawn(still_patrol(ArchetypeKind::Creep), square_route(), &mut arena);

    for _ in 0..400 {
        arena.tick(&mut agent, &mut body);
    }
    let loops = arena.count(|e| matches!(e, AgentEvent::PatrolLoopCompleted { .. }));
    assert!(loops >= 1);

    // Первые 4 прибытия = ровно один круг, каждая точка по разу
    let mut first_loop: Vec<usize> = arena
        .events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::PatrolPointReached { index, .. } => Some(*index),
            _ => None,
        })
        .take(4)
        .collect();
    first_loop.sort_unstable();
    assert_eq!(first_loop, vec![0, 1, 2, 3]);

    let reached = arena.count(|e| matches!(e, AgentEvent::PatrolPointReached { .. }));
    assert_eq!(loops, reached / 4);
    assert!(arena.events.contains(&AgentEvent::PatrolLoopCompleted {
        agent: AgentId(1),
        loops: 1
    }));
}

#[test]
fn test_patrol_without_waypoints_holds() {
    let mut arena = Arena::new();
    let (mut agent, mut body) = spawn(profile(ArchetypeKind::Creep), WaypointSet::default(), &mut arena);
    let events_before = arena.events.len();

    for _ in 0..20 {
        arena.tick(&mut agent, &mut body);
    }
    assert_eq!(agent.current_state(), AgentState::Patrol);
    assert_eq!(body.position, Vec3::ZERO);
    assert_eq!(arena.events.len(), events_before);
}

#[test]
fn test_learned_agent_shares_timing_rules() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Learner, Vec3::new(0.0, 0.0, -1.5));
    assert_eq!(agent.behavior_name(), "learned");

    arena
        .tick_until(&mut agent, &mut body, 5, |a| a.phase_index() == 1)
        .expect("policy should request the attack");
    arena
        .tick_until(&mut agent, &mut body, 5, |a| !a.is_interruptible())
        .expect("hit window should open");
    let outcome = agent.apply_damage(10, Vec3::new(0.0, 0.0, -1.5), &body, &mut arena.events);
    assert_eq!(outcome, DamageOutcome::Wounded { interrupted: false });

    arena
        .tick_until(&mut agent, &mut body, 20, |a| a.current_state() == AgentState::Recover)
        .expect("attack should finish");
    assert_eq!(arena.count(|e| matches!(e, AgentEvent::HitLanded { .. })), 1);
    assert_eq!(arena.target().health, 92);
}

#[test]
fn test_health_and_dead_stay_in_sync() {
    let (mut arena, mut agent, mut body) = engaged(ArchetypeKind::Brute, Vec3::new(0.0, 0.0, -1.5));

    for step in 0..200 {
        if step % 7 == 0 {
            agent.apply_damage(9, Vec3::new(0.0, 0.0, -1.5), &body, &mut arena.events);
        }
        arena.tick(&mut agent, &mut body);
        assert_eq!(agent.health().current() == 0, agent.is_dead());
        assert_eq!(agent.is_dead(), agent.current_state() == AgentState::Dead);
        if agent.is_dead() {
            assert!(!agent.colliders_enabled());
        }
    }
    assert!(agent.is_dead());
    assert_eq!(arena.count(|e| matches!(e, AgentEvent::Died { .. })), 1);
}

#[test]
fn test_snapshot_round_trip_replays_identically() {
    let waypoints = square_route();
    let mut arena = Arena::new();
    let (mut agent, mut body) = spawn(profile(ArchetypeKind::Creep), waypoints.clone(), &mut arena);
    for _ in 0..30 {
        arena.tick(&mut agent, &mut body);
    }

    let json = serde_json::to_string(&agent.snapshot(&body)).expect("serialize");
    let restored: AgentSnapshot = serde_json::from_str(&json).expect("deserialize");
    let (mut twin, mut twin_body) = Agent::restore(
        &restored,
        Arc::new(profile(ArchetypeKind::Creep)),
        waypoints,
        Box::new(ScriptedBehavior),
    );
    assert_eq!(twin.snapshot(&twin_body), agent.snapshot(&body));

    let mut twin_arena = Arena::new();
    twin_arena.leases = arena.leases.clone();
    for _ in 0..200 {
        arena.tick(&mut agent, &mut body);
        twin_arena.tick(&mut twin, &mut twin_body);
    }
    assert_eq!(twin.snapshot(&twin_body), agent.snapshot(&body));
}
