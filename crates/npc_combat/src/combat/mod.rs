//! Combat: multi-tick timers, strike resolution, parry, knockback.
//!
//! Agent-side sequencing (какая фаза живая, когда окно удара) живёт в
//! state machine; здесь — правила одного удара и данные защищающегося.

pub mod knockback;
pub mod resolver;
pub mod target;
pub mod timer;


pub use knockback::{Knockback, KnockbackMotion};
pub use resolver::{
    parry_succeeds, resolve, HitLatch, Resolution, Strike, StrikeAttempt, StrikeResponse, StrikeVolume,
    TargetProvider, PARRY_ANGLE_DEGREES,
};
pub use target::{CombatTarget, TargetRoster};
pub use timer::Timer;
