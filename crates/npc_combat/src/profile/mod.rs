//! Archetype profiles: immutable per-kind tuning.
//!
//! Один профиль на вид агента, разделяется всеми экземплярами через `Arc`.
//! Профили валидируются при регистрации; битый профиль заменяется
//! консервативным дефолтом (см. `ArchetypeRegistry::resolve`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod registry;


pub use registry::{ArchetypeRegistry, BUILTIN_ARCHETYPES};

/// Agent kinds known to the built-in registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeKind {
    Creep,
    Brute,
    Juggernaut,
    Boss,
    /// Driven by an external decision policy.
    Learner,
}

impl ArchetypeKind {
    pub const ALL: [ArchetypeKind; 5] = [
        ArchetypeKind::Creep,
        ArchetypeKind::Brute,
        ArchetypeKind::Juggernaut,
        ArchetypeKind::Boss,
        ArchetypeKind::Learner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchetypeKind::Creep => "creep",
            ArchetypeKind::Brute => "brute",
            ArchetypeKind::Juggernaut => "juggernaut",
            ArchetypeKind::Boss => "boss",
            ArchetypeKind::Learner => "learner",
        }
    }
}

/// One step of the attack sequence.
///
/// The hit window `[hit_start, hit_end)` is measured from the phase start and
/// must be a strict sub-interval of `[0, duration]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    pub duration: f32,
    pub hit_start: f32,
    pub hit_end: f32,
    #[serde(default = "default_damage_scale")]
    pub damage_scale: f32,
    /// Forward offset of the strike volume centre.
    pub reach: f32,
    /// Strike volume radius.
    pub radius: f32,
}

fn default_damage_scale() -> f32 {
    1.0
}

impl PhaseSpec {
    pub fn new(name: &str, duration: f32, hit_start: f32, hit_end: f32, reach: f32, radius: f32) -> Self {
        Self {
            name: name.to_string(),
            duration,
            hit_start,
            hit_end,
            damage_scale: 1.0,
            reach,
            radius,
        }
    }

    pub fn with_damage_scale(mut self, scale: f32) -> Self {
        self.damage_scale = scale;
        self
    }

    pub fn in_hit_window(&self, elapsed: f32) -> bool {
        elapsed >= self.hit_start && elapsed < self.hit_end
    }

    /// Did the step `(before, after]` touch the hit window?
    ///
    /// Длинный тик может перешагнуть окно целиком; удар всё равно засчитывается.
    pub fn window_overlaps(&self, before: f32, after: f32) -> bool {
        self.in_hit_window(after) || (before < self.hit_end && after > self.hit_start)
    }
}

/// Boss-only "roll": a long uninterruptible charge at the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSpec {
    /// Continuous `Chase` time before the skill fires.
    pub cooldown: f32,
    pub duration: f32,
    pub charge_start: f32,
    pub charge_end: f32,
    pub speed_multiplier: f32,
    pub damage: u32,
    pub contact_range: f32,
}

impl SkillSpec {
    pub fn is_charging(&self, elapsed: f32) -> bool {
        elapsed >= self.charge_start && elapsed < self.charge_end
    }

    /// Did the step `(before, after]` touch the charge window?
    pub fn charge_overlaps(&self, before: f32, after: f32) -> bool {
        self.is_charging(after) || (before < self.charge_end && after > self.charge_start)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolSpec {
    pub dwell_time: f32,
    pub jitter_radius: f32,
    pub lease_duration: f32,
    pub arrival_tolerance: f32,
    /// Delay before retrying a point held by another agent.
    pub lease_retry: f32,
    /// Retries before moving on without a lease.
    pub max_lease_retries: u8,
}

impl Default for PatrolSpec {
    fn default() -> Self {
        Self {
            dwell_time: 4.0,
            jitter_radius: 5.0,
            lease_duration: 2.0,
            arrival_tolerance: 0.5,
            lease_retry: 0.5,
            max_lease_retries: 3,
        }
    }
}

/// Direction-free knockback tuning; the direction comes from the hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnockbackSpec {
    pub magnitude: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeProfile {
    pub kind: ArchetypeKind,
    pub max_health: u32,
    pub walk_speed: f32,
    pub run_speed: f32,
    pub attack_damage: u32,
    pub detection_radius: f32,
    /// Full field-of-view angle, degrees.
    pub detection_angle: f32,
    pub disengage_distance: f32,
    pub attack_range: f32,
    #[serde(default = "default_chase_margin")]
    pub chase_margin: f32,
    /// Give up after an attack cycle when the target is farther than this.
    #[serde(default)]
    pub rechase_distance: Option<f32>,
    pub phases: Vec<PhaseSpec>,
    pub attack_cooldown: f32,
    pub hurt_recovery: f32,
    #[serde(default)]
    pub hurt_invulnerability: f32,
    #[serde(default)]
    pub alert_duration: f32,
    #[serde(default)]
    pub skill: Option<SkillSpec>,
    #[serde(default)]
    pub patrol: PatrolSpec,
    pub separation_radius: f32,
    pub probe_distance: f32,
    #[serde(default)]
    pub strike_knockback: Option<KnockbackSpec>,
    #[serde(default)]
    pub parry_recoil: Option<KnockbackSpec>,
    pub despawn_delay: f32,
}

fn default_chase_margin() -> f32 {
    0.2
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("{kind:?}: `{field}` must be positive")]
    NonPositive {
        kind: ArchetypeKind,
        field: &'static str,
    },
    #[error("{kind:?}: profile has no attack phases")]
    NoPhases { kind: ArchetypeKind },
    #[error("{kind:?}: phase {phase} hit window {start}..{end} is not a strict sub-interval of {duration}s")]
    HitWindow {
        kind: ArchetypeKind,
        phase: usize,
        start: f32,
        end: f32,
        duration: f32,
    },
    #[error("{kind:?}: disengage distance {disengage} must exceed detection radius {detection}")]
    Hysteresis {
        kind: ArchetypeKind,
        disengage: f32,
        detection: f32,
    },
    #[error("{kind:?}: skill charge window {start}..{end} does not fit in {duration}s")]
    SkillWindow {
        kind: ArchetypeKind,
        start: f32,
        end: f32,
        duration: f32,
    },
    #[error("{kind:?}: {field} must be a finite, non-negative number")]
    NotFinite { kind: ArchetypeKind, field: &'static str },
    #[error("archetype {0:?} is not registered")]
    Missing(ArchetypeKind),
    #[error("failed to read archetype file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse archetype table: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ArchetypeProfile {
    pub fn phase_count(&self) -> u8 {
        self.phases.len().min(u8::MAX as usize) as u8
    }

    /// Phase spec by 1-based index.
    pub fn phase(&self, index: u8) -> Option<&PhaseSpec> {
        if index == 0 {
            return None;
        }
        self.phases.get(index as usize - 1)
    }

    /// Half of the field-of-view, degrees.
    pub fn half_fov(&self) -> f32 {
        self.detection_angle * 0.5
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let kind = self.kind;
        let positive = |value: f32, field: &'static str| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ProfileError::NonPositive { kind, field })
            }
        };

        let finite = |value: f32, field: &'static str| {
            if value >= 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ProfileError::NotFinite { kind, field })
            }
        };

        if self.max_health == 0 {
            return Err(ProfileError::NonPositive {
                kind,
                field: "max_health",
            });
        }
        positive(self.walk_speed, "walk_speed")?;
        positive(self.run_speed, "run_speed")?;
        positive(self.detection_radius, "detection_radius")?;
        positive(self.detection_angle, "detection_angle")?;
        positive(self.attack_range, "attack_range")?;
        positive(self.attack_cooldown, "attack_cooldown")?;
        positive(self.hurt_recovery, "hurt_recovery")?;
        positive(self.despawn_delay, "despawn_delay")?;
        positive(self.disengage_distance, "disengage_distance")?;
        finite(self.chase_margin, "chase_margin")?;
        finite(self.hurt_invulnerability, "hurt_invulnerability")?;
        finite(self.alert_duration, "alert_duration")?;
        finite(self.separation_radius, "separation_radius")?;
        finite(self.probe_distance, "probe_distance")?;
        if let Some(rechase) = self.rechase_distance {
            finite(rechase, "rechase_distance")?;
        }
        for spec in [&self.strike_knockback, &self.parry_recoil].into_iter().flatten() {
            finite(spec.magnitude, "knockback.magnitude")?;
            finite(spec.duration, "knockback.duration")?;
        }
        finite(self.patrol.dwell_time, "patrol.dwell_time")?;
        finite(self.patrol.jitter_radius, "patrol.jitter_radius")?;
        finite(self.patrol.lease_duration, "patrol.lease_duration")?;
        finite(self.patrol.arrival_tolerance, "patrol.arrival_tolerance")?;
        finite(self.patrol.lease_retry, "patrol.lease_retry")?;

        if self.disengage_distance <= self.detection_radius {
            return Err(ProfileError::Hysteresis {
                kind,
                disengage: self.disengage_distance,
                detection: self.detection_radius,
            });
        }

        if self.phases.is_empty() {
            return Err(ProfileError::NoPhases { kind });
        }
        for (i, phase) in self.phases.iter().enumerate() {
            positive(phase.duration, "phase.duration")?;
            positive(phase.radius, "phase.radius")?;
            finite(phase.reach, "phase.reach")?;
            finite(phase.damage_scale, "phase.damage_scale")?;
            finite(phase.hit_start, "phase.hit_start")?;
            finite(phase.hit_end, "phase.hit_end")?;
            let strict = phase.hit_start > 0.0 || phase.hit_end < phase.duration;
            if phase.hit_start < 0.0 || phase.hit_start >= phase.hit_end || phase.hit_end > phase.duration || !strict {
                return Err(ProfileError::HitWindow {
                    kind,
                    phase: i + 1,
                    start: phase.hit_start,
                    end: phase.hit_end,
                    duration: phase.duration,
                });
            }
        }

        if let Some(skill) = &self.skill {
            positive(skill.cooldown, "skill.cooldown")?;
            positive(skill.duration, "skill.duration")?;
            positive(skill.speed_multiplier, "skill.speed_multiplier")?;
            finite(skill.contact_range, "skill.contact_range")?;
            finite(skill.charge_start, "skill.charge_start")?;
            finite(skill.charge_end, "skill.charge_end")?;
            if skill.charge_start < 0.0 || skill.charge_start >= skill.charge_end || skill.charge_end > skill.duration {
                return Err(ProfileError::SkillWindow {
                    kind,
                    start: skill.charge_start,
                    end: skill.charge_end,
                    duration: skill.duration,
                });
            }
        }

        Ok(())
    }

    /// Safe fallback used when a kind is missing or its profile is invalid.
    ///
    /// Single slow swing, short sight, no skill.
    pub fn conservative(kind: ArchetypeKind) -> Self {
        Self {
            kind,
            max_health: 100,
            walk_speed: 3.0,
            run_speed: 5.0,
            attack_damage: 5,
            detection_radius: 10.0,
            detection_angle: 90.0,
            disengage_distance: 15.0,
            attack_range: 2.0,
            chase_margin: default_chase_margin(),
            rechase_distance: Some(6.0),
            phases: vec![PhaseSpec::new("swing", 1.0, 0.4, 0.6, 1.0, 1.0)],
            attack_cooldown: 2.0,
            hurt_recovery: 0.5,
            hurt_invulnerability: 0.0,
            alert_duration: 0.5,
            skill: None,
            patrol: PatrolSpec::default(),
            separation_radius: 2.0,
            probe_distance: 1.5,
            strike_knockback: None,
            parry_recoil: None,
            despawn_delay: 8.0,
        }
    }

    /// Built-in tuning per kind.
    pub fn builtin(kind: ArchetypeKind) -> Self {
        match kind {
            ArchetypeKind::Creep => Self::generic(kind, 100, 4, 6.0, 9.0, 2.0),
            ArchetypeKind::Brute => Self::generic(kind, 150, 6, 5.0, 7.0, 2.2),
            ArchetypeKind::Juggernaut => Self::generic(kind, 200, 8, 4.0, 5.0, 2.5),
            ArchetypeKind::Learner => Self::generic(kind, 100, 8, 6.0, 9.0, 2.0),
            ArchetypeKind::Boss => Self::boss(),
        }
    }

    fn generic(kind: ArchetypeKind, max_health: u32, damage: u32, walk: f32, run: f32, range: f32) -> Self {
        Self {
            kind,
            max_health,
            walk_speed: walk,
            run_speed: run,
            attack_damage: damage,
            detection_radius: 15.0,
            detection_angle: 90.0,
            disengage_distance: 22.0,
            attack_range: range,
            chase_margin: default_chase_margin(),
            rechase_distance: Some(6.0),
            phases: vec![PhaseSpec::new("swing", 1.0, 0.35, 0.6, range * 0.5, range * 0.6)],
            attack_cooldown: 2.0,
            hurt_recovery: 0.4,
            hurt_invulnerability: 0.2,
            alert_duration: 0.5,
            skill: None,
            patrol: PatrolSpec::default(),
            separation_radius: 2.0,
            probe_distance: 1.5,
            strike_knockback: None,
            parry_recoil: Some(KnockbackSpec {
                magnitude: 10.0,
                duration: 0.5,
            }),
            despawn_delay: 8.0,
        }
    }

    fn boss() -> Self {
        Self {
            kind: ArchetypeKind::Boss,
            max_health: 1000,
            walk_speed: 4.0,
            run_speed: 4.0,
            attack_damage: 15,
            detection_radius: 40.0,
            detection_angle: 360.0,
            disengage_distance: 60.0,
            attack_range: 3.0,
            chase_margin: default_chase_margin(),
            rechase_distance: None,
            phases: vec![
                PhaseSpec::new("stomp", 1.5, 1.25, 1.45, 1.7, 2.0),
                PhaseSpec::new("charge", 1.5, 0.25, 0.5, 1.5, 1.5).with_damage_scale(1.2),
                PhaseSpec::new("spin", 1.5, 0.6, 0.85, 0.0, 3.0),
            ],
            attack_cooldown: 2.0,
            hurt_recovery: 0.5,
            hurt_invulnerability: 0.0,
            alert_duration: 0.0,
            skill: Some(SkillSpec {
                cooldown: 5.0,
                duration: 2.0,
                charge_start: 0.2,
                charge_end: 1.8,
                speed_multiplier: 3.0,
                damage: 20,
                contact_range: 3.0,
            }),
            patrol: PatrolSpec {
                dwell_time: 2.0,
                jitter_radius: 1.0,
                ..PatrolSpec::default()
            },
            separation_radius: 3.0,
            probe_distance: 2.5,
            strike_knockback: Some(KnockbackSpec {
                magnitude: 6.0,
                duration: 0.3,
            }),
            parry_recoil: None,
            despawn_delay: 10.0,
        }
    }
}
