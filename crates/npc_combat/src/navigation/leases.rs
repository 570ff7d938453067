//! Waypoint leases: time-bounded, best-effort claims on patrol points.
//!
//! Единственный разделяемый между агентами изменяемый ресурс. Не мьютекс:
//! проигравший просто ждёт или идёт дальше, дедлок невозможен.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::events::AgentId;

/// Waypoint position quantized to centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeaseKey(i32, i32, i32);

impl LeaseKey {
    pub fn from_point(point: Vec3) -> Self {
        let q = |v: f32| (v * 100.0).round() as i32;
        Self(q(point.x), q(point.y), q(point.z))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lease {
    pub holder: AgentId,
    pub expires_at: f64,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct WaypointLeases {
    clock: f64,
    leases: BTreeMap<LeaseKey, Lease>,
}

impl WaypointLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the lease clock by one tick and drop expired leases.
    pub fn advance(&mut self, delta: f32) {
        self.clock += delta.max(0.0) as f64;
        let now = self.clock;
        self.leases.retain(|_, lease| lease.expires_at > now);
    }

    pub fn now(&self) -> f64 {
        self.clock
    }

    /// Claim `key` for `duration` seconds.
    ///
    /// Succeeds when the point is free, expired, or already held by `holder`.
    pub fn try_claim(&mut self, key: LeaseKey, holder: AgentId, duration: f32) -> bool {
        let now = self.clock;
        if let Some(lease) = self.leases.get(&key) {
            if lease.holder != holder && lease.expires_at > now {
                return false;
            }
        }
        self.leases.insert(
            key,
            Lease {
                holder,
                expires_at: now + duration.max(0.0) as f64,
            },
        );
        true
    }

    pub fn holder(&self, key: LeaseKey) -> Option<AgentId> {
        self.leases
            .get(&key)
            .filter(|lease| lease.expires_at > self.clock)
            .map(|lease| lease.holder)
    }

    pub fn release_all(&mut self, holder: AgentId) {
        self.leases.retain(|_, lease| lease.holder != holder);
    }

    pub fn len(&self) -> usize {
        self.leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }
}
