//! State machine tick, transitions, damage entry point.
//!
//! Порядок внутри тика:
//! 1. dead/dormant early-out, затем death check (приоритет над всем)
//! 2. invulnerability + knockback (свои часы, не трогают фазы)
//! 3. perception → observation → intent
//! 4. guards: максимум один переход за тик; при переходе тик состояния пропускается
//! 5. тик активного состояния (движение, фазы, resolver)

use bevy::prelude::*;

use super::{Agent, AgentBody, AgentState, TickContext};
use crate::behavior::{Intent, Observation};
use crate::combat::{resolve, Knockback, KnockbackMotion, Resolution, StrikeAttempt, StrikeVolume};
use crate::events::{AgentEvent, EventSink};
use crate::lifecycle::DamageOutcome;
use crate::navigation::{chase_destination, steer, PatrolStep};
use crate::perception::{self, Awareness, TargetSnapshot, VisionCone};

fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    flat(b - a).length()
}

impl Agent {
    /// Leave `Dormant` (spawn trigger fired). Returns false if already active.
    pub fn activate(&mut self, events: &mut dyn EventSink) -> bool {
        if self.state != AgentState::Dormant || self.lifecycle.is_dead() {
            return false;
        }
        self.transition(AgentState::Patrol, events);
        true
    }

    /// Advance the agent by one step.
    pub fn tick(&mut self, body: &mut AgentBody, delta: f32, ctx: &mut TickContext<'_>) {
        if self.lifecycle.is_dead() {
            self.timers.despawn.tick(delta);
            ctx.leases.release_all(self.id);
            return;
        }
        if self.state == AgentState::Dormant {
            return;
        }
        if self.health.is_depleted() {
            self.die(body, ctx.events);
            return;
        }

        self.timers.invulnerability.tick(delta);
        self.advance_knockback(body, delta, ctx);

        let candidates = ctx.targets.candidates();
        let sighting = perception::scan(body.position, body.forward, self.vision_cone(), &candidates, ctx.obstacles);
        // В hurt recovery подсказка "откуда ударили" не тратится
        let awareness = match sighting {
            None if self.state == AgentState::HurtInterrupt => self.memory.recall(),
            sighting => self.memory.observe(sighting),
        };
        let target = self
            .memory
            .target()
            .and_then(|id| candidates.iter().find(|c| c.id == id).copied());

        let observation = self.observe(body, &awareness);
        let intent = self.behavior.decide(&observation);

        let next = match self.evaluate_guards(body, &awareness, &intent) {
            Some(next) => Some(next),
            None => self.run_state(body, delta, &awareness, target, &intent, ctx),
        };
        if let Some(next) = next {
            self.transition(next, ctx.events);
        }
        self.refresh_interruptible();
    }

    /// `ApplyDamage(amount, sourcePosition)`.
    pub fn apply_damage(
        &mut self,
        amount: u32,
        source: Vec3,
        body: &AgentBody,
        events: &mut dyn EventSink,
    ) -> DamageOutcome {
        if self.lifecycle.is_dead() || amount == 0 {
            return DamageOutcome::Ignored;
        }
        if self.timers.invulnerability.is_running() {
            return DamageOutcome::Absorbed;
        }

        self.health.take_damage(amount);
        events.notify(AgentEvent::DamageTaken {
            agent: self.id,
            amount,
            remaining: self.health.current(),
        });

        if self.health.is_depleted() {
            self.die(body, events);
            return DamageOutcome::Killed;
        }

        if self.state != AgentState::Dormant {
            self.memory.hint(source);
        }
        let interrupted = self.interruptible;
        if interrupted {
            self.transition(AgentState::HurtInterrupt, events);
        }
        DamageOutcome::Wounded { interrupted }
    }

    fn vision_cone(&self) -> VisionCone {
        if self.state.is_engaged() {
            VisionCone::all_around(self.profile.disengage_distance)
        } else {
            VisionCone::new(self.profile.detection_radius, self.profile.detection_angle)
        }
    }

    fn observe(&self, body: &AgentBody, awareness: &Awareness) -> Observation {
        let target_position = awareness.position();
        let destination = match self.state {
            AgentState::Patrol => self.patrol.destination(),
            AgentState::Chase => target_position.map(|t| {
                chase_destination(body.position, t, self.profile.attack_range, self.profile.chase_margin)
            }),
            _ => None,
        };

        Observation {
            health_fraction: self.health.fraction(),
            state: self.state,
            position: body.position,
            forward: body.forward,
            target_visible: matches!(awareness, Awareness::Visible(_)),
            target_position,
            target_distance: target_position.map(|t| flat_distance(body.position, t)),
            attack_range: self.profile.attack_range,
            destination,
        }
    }

    /// Transition guards for the current state. At most one fires.
    fn evaluate_guards(&self, body: &AgentBody, awareness: &Awareness, intent: &Intent) -> Option<AgentState> {
        let distance = awareness.position().map(|t| flat_distance(body.position, t));

        match self.state {
            AgentState::Patrol => match awareness {
                Awareness::Visible(_) => Some(AgentState::Alert),
                _ => None,
            },
            AgentState::Alert => {
                if awareness.is_lost() {
                    Some(AgentState::Patrol)
                } else if self.timers.phase.is_done() {
                    Some(AgentState::Chase)
                } else {
                    None
                }
            }
            AgentState::Chase => {
                let Some(distance) = distance else {
                    return Some(AgentState::Patrol);
                };
                if distance > self.profile.disengage_distance {
                    Some(AgentState::Patrol)
                } else if self.profile.skill.is_some() && self.timers.skill.is_done() {
                    Some(AgentState::Skill)
                } else if distance <= self.profile.attack_range && intent.attack {
                    Some(AgentState::Attack { phase: 1 })
                } else {
                    None
                }
            }
            AgentState::Attack { phase } => {
                if !self.timers.phase.is_done() {
                    None
                } else if phase < self.profile.phase_count() {
                    Some(AgentState::Attack { phase: phase + 1 })
                } else {
                    Some(AgentState::Recover)
                }
            }
            AgentState::Recover => {
                if self.timers.cooldown.is_running() {
                    return None;
                }
                match (distance, self.profile.rechase_distance) {
                    (None, _) => Some(AgentState::Patrol),
                    (Some(d), Some(limit)) if d > limit => Some(AgentState::Patrol),
                    _ => Some(AgentState::Chase),
                }
            }
            AgentState::HurtInterrupt => self.timers.phase.is_done().then_some(AgentState::Chase),
            AgentState::Skill | AgentState::Dormant | AgentState::Dead => None,
        }
    }

    /// Tick behaviour of the active state. May request a transition.
    fn run_state(
        &mut self,
        body: &mut AgentBody,
        delta: f32,
        awareness: &Awareness,
        target: Option<TargetSnapshot>,
        intent: &Intent,
        ctx: &mut TickContext<'_>,
    ) -> Option<AgentState> {
        match self.state {
            AgentState::Patrol => {
                self.tick_patrol(body, delta, intent, ctx);
                None
            }
            AgentState::Alert | AgentState::HurtInterrupt => {
                if let Some(position) = awareness.position() {
                    face(body, position);
                }
                self.timers.phase.tick(delta);
                None
            }
            AgentState::Chase => {
                self.timers.skill.tick(delta);
                if let Some(position) = awareness.position() {
                    let destination = chase_destination(
                        body.position,
                        position,
                        self.profile.attack_range,
                        self.profile.chase_margin,
                    );
                    self.travel(body, intent.movement, self.profile.run_speed, delta, destination, ctx);
                    face(body, position);
                }
                None
            }
            AgentState::Attack { phase } => {
                self.tick_attack(phase, body, delta, awareness, target, ctx);
                None
            }
            AgentState::Recover => {
                if let Some(position) = awareness.position() {
                    face(body, position);
                }
                self.timers.cooldown.tick(delta);
                None
            }
            AgentState::Skill => self.tick_skill(body, delta, awareness, target, ctx),
            AgentState::Dormant | AgentState::Dead => None,
        }
    }

    fn tick_patrol(&mut self, body: &mut AgentBody, delta: f32, intent: &Intent, ctx: &mut TickContext<'_>) {
        let step = self.patrol.update(
            self.id,
            body.position,
            &self.waypoints,
            &self.profile.patrol,
            &mut self.timers.wait,
            delta,
            ctx.leases,
            &mut self.rng,
        );

        match step {
            PatrolStep::Hold => {}
            PatrolStep::MoveTo(destination) => {
                self.travel(body, intent.movement, self.profile.walk_speed, delta, destination, ctx);
            }
            PatrolStep::Arrived { index, loop_completed } => {
                ctx.events.notify(AgentEvent::PatrolPointReached { agent: self.id, index });
                if let Some(loops) = loop_completed {
                    crate::log(&format!("🔁 {:?} patrol loop {} completed", self.id, loops));
                    ctx.events.notify(AgentEvent::PatrolLoopCompleted { agent: self.id, loops });
                }
            }
        }
    }

    fn tick_attack(
        &mut self,
        phase: u8,
        body: &mut AgentBody,
        delta: f32,
        awareness: &Awareness,
        target: Option<TargetSnapshot>,
        ctx: &mut TickContext<'_>,
    ) {
        let profile = self.profile.clone();
        let Some(spec) = profile.phase(phase) else {
            self.timers.phase.clear();
            return;
        };

        // До окна удара доворачиваемся к цели, в окне — удар зафиксирован
        if self.timers.phase.elapsed() < spec.hit_start {
            if let Some(position) = awareness.position() {
                face(body, position);
            }
        }

        let before = self.timers.phase.elapsed();
        self.timers.phase.tick(delta);
        let in_window = spec.window_overlaps(before, self.timers.phase.elapsed());
        if !in_window || !self.lifecycle.colliders_enabled() {
            return;
        }
        let Some(target) = target else {
            return;
        };

        let damage = (profile.attack_damage as f32 * spec.damage_scale).round() as u32;
        let attempt = StrikeAttempt {
            attacker: self.id,
            position: body.position,
            volume: StrikeVolume::for_phase(body.position, body.forward, spec),
            damage,
            knockback: profile
                .strike_knockback
                .map(|kb| Knockback::away_from(body.position, target.position, kb)),
            in_window,
        };
        let resolution = resolve(&attempt, &target, &mut self.latch, ctx.targets);
        self.report_strike(resolution, body, &target, ctx.events);
    }

    fn tick_skill(
        &mut self,
        body: &mut AgentBody,
        delta: f32,
        awareness: &Awareness,
        target: Option<TargetSnapshot>,
        ctx: &mut TickContext<'_>,
    ) -> Option<AgentState> {
        let profile = self.profile.clone();
        let Some(skill) = profile.skill.as_ref() else {
            return Some(AgentState::Chase);
        };

        let before = self.timers.phase.elapsed();
        let finished = self.timers.phase.tick(delta) || self.timers.phase.is_done();
        let charging = skill.charge_overlaps(before, self.timers.phase.elapsed());

        if charging {
            if let Some(position) = awareness.position() {
                let heading = flat(position - body.position);
                self.travel(
                    body,
                    heading,
                    profile.run_speed * skill.speed_multiplier,
                    delta,
                    position,
                    ctx,
                );
                face(body, position);
            }
        }

        // Контакт во время рывка или на завершении → сразу в Attack(1)
        if charging || finished {
            if let Some(target) = target {
                let volume = StrikeVolume::around(body.position, skill.contact_range);
                if target.alive && volume.overlaps(&target) && self.lifecycle.colliders_enabled() {
                    let attempt = StrikeAttempt {
                        attacker: self.id,
                        position: body.position,
                        volume,
                        damage: skill.damage,
                        knockback: profile
                            .strike_knockback
                            .map(|kb| Knockback::away_from(body.position, target.position, kb)),
                        in_window: true,
                    };
                    let resolution = resolve(&attempt, &target, &mut self.latch, ctx.targets);
                    self.report_strike(resolution, body, &target, ctx.events);
                    return Some(AgentState::Attack { phase: 1 });
                }
            }
        }

        finished.then_some(AgentState::Chase)
    }

    fn report_strike(
        &mut self,
        resolution: Resolution,
        body: &AgentBody,
        target: &TargetSnapshot,
        events: &mut dyn EventSink,
    ) {
        match resolution {
            Resolution::NoContact | Resolution::Missed { .. } => {}
            Resolution::Landed { target, damage, killed } => {
                events.notify(AgentEvent::HitLanded {
                    agent: self.id,
                    target,
                    damage,
                });
                if killed {
                    crate::log(&format!("💀 {:?} killed target {:?}", self.id, target));
                    events.notify(AgentEvent::TargetKilled { agent: self.id, target });
                }
            }
            Resolution::Parried { target: parried_by } => {
                crate::log(&format!("🛡️ {:?} strike parried by {:?}", self.id, parried_by));
                events.notify(AgentEvent::Parried {
                    agent: self.id,
                    target: parried_by,
                });
                if let Some(recoil) = self.profile.parry_recoil {
                    self.knockback = Some(KnockbackMotion::new(Knockback::away_from(
                        target.position,
                        body.position,
                        recoil,
                    )));
                }
            }
        }
    }

    /// Steer and step toward `destination`; hold on a pathing failure.
    fn travel(
        &mut self,
        body: &mut AgentBody,
        desired: Vec3,
        speed: f32,
        delta: f32,
        destination: Vec3,
        ctx: &mut TickContext<'_>,
    ) {
        if desired.length_squared() <= f32::EPSILON {
            return;
        }
        let heading = steer(
            self.id,
            body.position,
            flat(desired),
            ctx.peers,
            self.profile.separation_radius,
            ctx.obstacles,
            self.profile.probe_distance,
        );
        if heading == Vec3::ZERO {
            return;
        }

        let scale = desired.length().min(1.0);
        let distance = (speed * scale * delta).min(flat_distance(body.position, destination));
        match ctx.navigation.travel(body.position, destination, heading, distance) {
            Ok(next) => {
                body.position = next;
                body.forward = heading;
            }
            Err(err) => {
                crate::log(&format!("🧭 {:?} holds position: {}", self.id, err));
            }
        }
    }

    fn advance_knockback(&mut self, body: &mut AgentBody, delta: f32, ctx: &mut TickContext<'_>) {
        let Some(motion) = self.knockback.as_mut() else {
            return;
        };
        let displacement = motion.advance(delta);
        let finished = motion.is_finished();
        if displacement != Vec3::ZERO {
            let next = body.position + displacement;
            if let Ok(next) = ctx
                .navigation
                .travel(body.position, next, displacement, displacement.length())
            {
                body.position = next;
            }
        }
        if finished {
            self.knockback = None;
        }
    }

    /// Single entry point for every state change.
    pub(super) fn transition(&mut self, next: AgentState, events: &mut dyn EventSink) {
        let previous = self.state;
        if previous == next || previous == AgentState::Dead {
            return;
        }

        if let (AgentState::Attack { .. }, AgentState::Attack { phase }) = (previous, next) {
            self.state = next;
            self.begin_phase(phase, events);
            self.refresh_interruptible();
            return;
        }

        events.notify(AgentEvent::StateExited {
            agent: self.id,
            state: previous,
        });
        self.state = next;
        crate::log(&format!(
            "🤖 {:?} ({}) {} → {}",
            self.id,
            self.profile.kind.as_str(),
            previous.label(),
            next.label()
        ));
        events.notify(AgentEvent::StateEntered {
            agent: self.id,
            state: next,
        });

        match next {
            AgentState::Patrol => {
                self.timers.wait.clear();
                self.timers.phase.clear();
                self.patrol.interrupt();
            }
            AgentState::Alert => {
                self.timers.phase.start(self.profile.alert_duration);
            }
            AgentState::Chase => {
                self.timers.phase.clear();
                if let Some(skill) = &self.profile.skill {
                    self.timers.skill.start(skill.cooldown);
                }
            }
            AgentState::Attack { phase } => {
                self.begin_phase(phase, events);
            }
            AgentState::Recover => {
                self.timers.phase.clear();
                self.latch.reset();
                self.timers.cooldown.start(self.profile.attack_cooldown);
            }
            AgentState::HurtInterrupt => {
                self.latch.reset();
                self.timers.phase.start(self.profile.hurt_recovery);
                self.timers.cooldown.clear();
                self.timers.invulnerability.start(self.profile.hurt_invulnerability);
                self.patrol.interrupt();
            }
            AgentState::Skill => {
                self.latch.reset();
                let duration = self.profile.skill.as_ref().map_or(0.0, |s| s.duration);
                self.timers.phase.start(duration);
                events.notify(AgentEvent::SkillStarted { agent: self.id });
            }
            AgentState::Dormant | AgentState::Dead => {}
        }
        self.refresh_interruptible();
    }

    fn begin_phase(&mut self, phase: u8, events: &mut dyn EventSink) {
        let duration = self.profile.phase(phase).map_or(0.0, |p| p.duration);
        self.timers.phase.start(duration);
        self.latch.reset();
        events.notify(AgentEvent::AttackPhaseStarted { agent: self.id, phase });
    }

    /// Terminal transition. Idempotent; only the first call notifies.
    fn die(&mut self, body: &AgentBody, events: &mut dyn EventSink) {
        let first = self.lifecycle.mark_dead();
        self.interruptible = false;
        self.knockback = None;
        self.latch.reset();

        if self.state != AgentState::Dead {
            let previous = self.state;
            events.notify(AgentEvent::StateExited {
                agent: self.id,
                state: previous,
            });
            self.state = AgentState::Dead;
            events.notify(AgentEvent::StateEntered {
                agent: self.id,
                state: AgentState::Dead,
            });
        }

        if first {
            self.timers.despawn.start(self.profile.despawn_delay);
            crate::log(&format!(
                "☠️ {:?} ({}) died at {:?}",
                self.id,
                self.profile.kind.as_str(),
                body.position
            ));
            events.notify(AgentEvent::Died {
                agent: self.id,
                kind: self.profile.kind,
                position: body.position,
                despawn_after: self.profile.despawn_delay,
            });
        }
    }

    fn refresh_interruptible(&mut self) {
        self.interruptible = match self.state {
            AgentState::Patrol | AgentState::Alert | AgentState::Chase | AgentState::Recover => true,
            AgentState::Attack { phase } => self
                .profile
                .phase(phase)
                .map_or(true, |spec| !spec.in_hit_window(self.timers.phase.elapsed())),
            AgentState::Dormant | AgentState::HurtInterrupt | AgentState::Skill | AgentState::Dead => false,
        };
    }
}

fn face(body: &mut AgentBody, point: Vec3) {
    let direction = flat(point - body.position).normalize_or_zero();
    if direction != Vec3::ZERO {
        body.forward = direction;
    }
}
