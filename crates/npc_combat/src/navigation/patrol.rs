//! Waypoint patrol: shuffled cyclic order, dwell, jitter, leases.

use std::sync::Arc;

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::leases::{LeaseKey, WaypointLeases};
use crate::combat::Timer;
use crate::events::AgentId;
use crate::profile::PatrolSpec;

/// Ordered patrol points, owned by the spawner and read-only to agents.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointSet(Arc<[Vec3]>);

impl Default for WaypointSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl WaypointSet {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self(points.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Vec3> {
        self.0.get(index).copied()
    }

    pub fn points(&self) -> &[Vec3] {
        &self.0
    }
}

/// Outcome of one patrol tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatrolStep {
    /// Dwelling, waiting for a lease, or nothing to patrol.
    Hold,
    MoveTo(Vec3),
    Arrived {
        index: usize,
        /// Set when this arrival closed a full loop.
        loop_completed: Option<u32>,
    },
}

/// Per-agent patrol progress.
///
/// Invariant: `order` is a permutation of the waypoint indices, so two
/// consecutive visits never hit the same point unless there is only one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatrolRoute {
    order: Vec<usize>,
    cursor: usize,
    arrivals: u32,
    loops: u32,
    destination: Option<[f32; 3]>,
    lease_retries: u8,
}

impl PatrolRoute {
    /// Shuffle the visit order for a set of `len` points.
    pub fn new(len: usize, rng: &mut ChaCha8Rng) -> Self {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(rng);
        Self {
            order,
            ..Self::default()
        }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn current_index(&self) -> Option<usize> {
        self.order.get(self.cursor).copied()
    }

    pub fn destination(&self) -> Option<Vec3> {
        self.destination.map(Vec3::from_array)
    }

    pub fn loops_completed(&self) -> u32 {
        self.loops
    }

    /// Drop the current leg; the next tick re-picks a jittered destination.
    pub fn interrupt(&mut self) {
        self.destination = None;
        self.lease_retries = 0;
    }

    /// One patrol tick. `wait` is the agent's dwell timer.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        agent: AgentId,
        position: Vec3,
        waypoints: &WaypointSet,
        spec: &PatrolSpec,
        wait: &mut Timer,
        delta: f32,
        leases: &mut WaypointLeases,
        rng: &mut ChaCha8Rng,
    ) -> PatrolStep {
        if waypoints.is_empty() || self.order.len() != waypoints.len() {
            return PatrolStep::Hold;
        }

        if wait.is_running() {
            wait.tick(delta);
            return PatrolStep::Hold;
        }

        let Some(index) = self.current_index() else {
            return PatrolStep::Hold;
        };

        let destination = match self.destination() {
            Some(destination) => destination,
            None => {
                let Some(point) = waypoints.get(index) else {
                    return PatrolStep::Hold;
                };
                let claimed = leases.try_claim(LeaseKey::from_point(point), agent, spec.lease_duration);
                if !claimed && self.lease_retries < spec.max_lease_retries {
                    self.lease_retries += 1;
                    wait.start(spec.lease_retry);
                    crate::log(&format!(
                        "⏳ {:?}: waypoint {} leased, retry {}/{}",
                        agent, index, self.lease_retries, spec.max_lease_retries
                    ));
                    return PatrolStep::Hold;
                }
                self.lease_retries = 0;
                let destination = point + jitter(spec.jitter_radius, rng);
                self.destination = Some(destination.to_array());
                destination
            }
        };

        let mut offset = destination - position;
        offset.y = 0.0;
        if offset.length() > spec.arrival_tolerance {
            return PatrolStep::MoveTo(destination);
        }

        self.arrivals += 1;
        self.destination = None;
        self.cursor = (self.cursor + 1) % self.order.len();
        wait.start(spec.dwell_time);

        let loop_completed = if self.arrivals as usize % self.order.len() == 0 {
            self.loops += 1;
            Some(self.loops)
        } else {
            None
        };

        PatrolStep::Arrived { index, loop_completed }
    }
}

/// Uniform offset inside a disk on the ground plane.
fn jitter(radius: f32, rng: &mut ChaCha8Rng) -> Vec3 {
    if radius <= 0.0 {
        return Vec3::ZERO;
    }
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = radius * rng.gen::<f32>().sqrt();
    Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance)
}
