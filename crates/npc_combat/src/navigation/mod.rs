//! Navigation: patrol sequencing, chase retargeting, local steering.
//!
//! Сам pathfinding — внешний примитив (`Navigable`). Ядро только выбирает
//! направление и дистанцию шага; недостижимая цель = стоим на месте.

use bevy::prelude::*;
use thiserror::Error;

pub mod leases;
pub mod patrol;
pub mod steering;

pub use leases::{LeaseKey, WaypointLeases};
pub use patrol::{PatrolRoute, PatrolStep, WaypointSet};
pub use steering::{chase_destination, deflect, separation, steer};

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum NavError {
    #[error("destination {0:?} is unreachable")]
    Unreachable(Vec3),
    #[error("step from {0:?} leaves the navigable area")]
    OffMesh(Vec3),
}

/// Underlying pathing primitive.
pub trait Navigable {
    /// Move from `from` along `heading` by at most `distance`, heading for `destination`.
    fn travel(&self, from: Vec3, destination: Vec3, heading: Vec3, distance: f32) -> Result<Vec3, NavError>;
}

/// Axis-aligned walkable area on the ground plane.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct NavBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for NavBounds {
    fn default() -> Self {
        Self::square(1000.0)
    }
}

impl NavBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Square arena centred on the origin.
    pub fn square(half_extent: f32) -> Self {
        Self::new(
            Vec3::new(-half_extent, f32::MIN, -half_extent),
            Vec3::new(half_extent, f32::MAX, half_extent),
        )
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.z >= self.min.z && point.z <= self.max.z
    }
}

impl Navigable for NavBounds {
    fn travel(&self, from: Vec3, destination: Vec3, heading: Vec3, distance: f32) -> Result<Vec3, NavError> {
        if !self.contains(destination) {
            return Err(NavError::Unreachable(destination));
        }

        let mut heading = heading;
        heading.y = 0.0;
        let next = from + heading.normalize_or_zero() * distance.max(0.0);
        if !self.contains(next) {
            return Err(NavError::OffMesh(from));
        }
        Ok(next)
    }
}
