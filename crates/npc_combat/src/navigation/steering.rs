//! Local steering: peer separation, obstacle deflection, chase offset.

use bevy::prelude::*;

use crate::events::AgentId;
use crate::perception::ObstacleQuery;

/// Below this two agents count as stacked on one spot.
const COINCIDENT_DISTANCE: f32 = 1e-4;

/// Repulsion from peers inside `radius`, each contributing `1 / distance`.
///
/// The agent's own entry is skipped by id. Peers stacked on exactly the same
/// spot push apart along a direction derived from the id pair, mirrored for
/// each side, so the split is deterministic.
pub fn separation(agent: AgentId, position: Vec3, peers: &[(AgentId, Vec3)], radius: f32) -> Vec3 {
    let mut push = Vec3::ZERO;
    for &(peer, peer_position) in peers {
        if peer == agent {
            continue;
        }
        let mut away = position - peer_position;
        away.y = 0.0;
        let distance = away.length();
        if distance >= radius {
            continue;
        }
        if distance <= COINCIDENT_DISTANCE {
            push += split_direction(agent, peer) / radius.max(COINCIDENT_DISTANCE) * 2.0;
            continue;
        }
        push += away.normalize() / distance;
    }
    push
}

/// Unit direction on the ground plane for a stacked pair; `(b, a)` gives the opposite of `(a, b)`.
fn split_direction(agent: AgentId, peer: AgentId) -> Vec3 {
    let (low, high) = if agent < peer { (agent, peer) } else { (peer, agent) };
    let mixed = (u64::from(low.0) << 32 | u64::from(high.0)).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let angle = (mixed >> 40) as f32 / (1u64 << 24) as f32 * std::f32::consts::TAU;
    let direction = Vec3::new(angle.cos(), 0.0, angle.sin());
    if agent < peer {
        direction
    } else {
        -direction
    }
}

/// Forward probe; on a hit, blend the heading with the surface tangent.
///
/// The tangent is orthogonal to the hit normal, on the side closest to the
/// original heading, so the agent slides along the obstacle instead of stopping.
pub fn deflect(position: Vec3, direction: Vec3, obstacles: &dyn ObstacleQuery, probe_distance: f32) -> Vec3 {
    let heading = direction.normalize_or_zero();
    if heading == Vec3::ZERO {
        return heading;
    }
    let Some(hit) = obstacles.probe(position, heading, probe_distance) else {
        return heading;
    };

    let mut tangent = hit.normal.cross(Vec3::Y).normalize_or_zero();
    if tangent.dot(heading) < 0.0 {
        tangent = -tangent;
    }
    // Чем ближе стена, тем сильнее уводим вдоль неё
    let urgency = 1.0 - (hit.distance / probe_distance).clamp(0.0, 1.0);
    let blended = heading * (1.0 - urgency) + tangent * (1.0 + urgency);
    blended.normalize_or(tangent)
}

/// Desired direction plus separation, then obstacle deflection.
pub fn steer(
    agent: AgentId,
    position: Vec3,
    desired: Vec3,
    peers: &[(AgentId, Vec3)],
    separation_radius: f32,
    obstacles: &dyn ObstacleQuery,
    probe_distance: f32,
) -> Vec3 {
    let combined = desired.normalize_or_zero() + separation(agent, position, peers, separation_radius);
    deflect(position, combined, obstacles, probe_distance)
}

/// Chase destination: stop `attack_range - margin` short of the target, on our side.
pub fn chase_destination(position: Vec3, target: Vec3, attack_range: f32, margin: f32) -> Vec3 {
    let mut back = position - target;
    back.y = 0.0;
    let standoff = (attack_range - margin).max(0.0);
    match back.try_normalize() {
        Some(dir) => target + dir * standoff,
        None => position,
    }
}
