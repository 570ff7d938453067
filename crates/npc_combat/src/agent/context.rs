use bevy::prelude::*;

use crate::combat::TargetProvider;
use crate::events::{AgentId, EventSink};
use crate::navigation::{Navigable, WaypointLeases};
use crate::perception::ObstacleQuery;

/// Collaborators handed to an agent for one tick.
///
/// Всё передаётся явно: никаких глобальных синглтонов для поиска цели,
/// геометрии или подписчиков на события.
pub struct TickContext<'a> {
    pub targets: &'a mut dyn TargetProvider,
    pub obstacles: &'a dyn ObstacleQuery,
    pub navigation: &'a dyn Navigable,
    pub leases: &'a mut WaypointLeases,
    /// Live agents and their positions; this agent's own entry is skipped by id.
    pub peers: &'a [(AgentId, Vec3)],
    pub events: &'a mut dyn EventSink,
}
