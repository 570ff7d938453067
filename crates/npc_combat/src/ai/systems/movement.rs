//! Clock-driven systems: lease expiry, target knockback.

use bevy::prelude::*;

use crate::agent::Agent;
use crate::combat::CombatTarget;
use crate::navigation::WaypointLeases;

/// System: часы waypoint leases (истёкшие удаляются)
pub fn advance_leases(time: Res<Time<Fixed>>, mut leases: ResMut<WaypointLeases>) {
    leases.advance(time.timestep().as_secs_f32());
}

/// System: отброс целей после попаданий с knockback
pub fn tick_target_knockback(time: Res<Time<Fixed>>, mut targets: Query<&mut CombatTarget, Without<Agent>>) {
    let delta = time.timestep().as_secs_f32();
    for mut target in targets.iter_mut() {
        if target.is_knocked_back() {
            target.tick_knockback(delta);
        }
    }
}
