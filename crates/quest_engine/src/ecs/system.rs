//! System trait and the context handed to every hook

use super::entity::EntityId;
use super::error::EcsError;
use super::manager::{EntityManager, IdentityOverride};
use super::prefab::PrefabLibrary;
use crate::events::GameEvent;
use crate::foundation::time::FrameTime;
use crate::pathfinding::Pathfinder;

/// Conventional execution order tiers, lower runs first
///
/// Any integer is a valid order; these only name the common slots.
#[derive(Debug, Clone, Copy)]
pub struct SystemOrder;

impl SystemOrder {
    /// Input collection
    pub const INPUT: i32 = -5;
    /// Default tier
    pub const NORMAL: i32 = 0;
    /// Movement and pathing
    pub const MOVEMENT: i32 = 10;
    /// Work that has to see final positions before drawing
    pub const PRE_RENDER: i32 = 900;
    /// World rendering
    pub const RENDER: i32 = 1000;
    /// Interface rendering
    pub const UI_RENDER: i32 = 1100;
    /// After everything was drawn
    pub const POST_RENDER: i32 = 2000;
    /// End of frame housekeeping
    pub const LATE: i32 = 3000;
}

/// Everything a system hook may touch during one call
///
/// Events passed to [`broadcast`](Self::broadcast) are delivered to every
/// system right after the hook returns, before the next system runs.
pub struct SystemContext<'a> {
    /// Live entities
    pub entities: &'a mut EntityManager,
    /// Pathing grid
    pub pathfinder: &'a mut Pathfinder,
    /// Loaded prefabs
    pub prefabs: &'a PrefabLibrary,
    /// Current frame timing
    pub time: FrameTime,
    events: Vec<GameEvent>,
}

impl<'a> SystemContext<'a> {
    /// Build a context over the world's tables
    pub fn new(
        entities: &'a mut EntityManager,
        pathfinder: &'a mut Pathfinder,
        prefabs: &'a PrefabLibrary,
        time: FrameTime,
    ) -> Self {
        Self {
            entities,
            pathfinder,
            prefabs,
            time,
            events: Vec::new(),
        }
    }

    /// Raise an event for every system
    pub fn broadcast(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Instantiate a loaded prefab, see [`EntityManager::create_entity_from_loaded_prefab`]
    pub fn spawn(
        &mut self,
        prefab: &str,
        parent: Option<EntityId>,
        identity: &IdentityOverride,
    ) -> Result<EntityId, EcsError> {
        self.entities
            .create_entity_from_loaded_prefab(self.prefabs, prefab, parent, identity)
    }

    /// Events raised so far
    pub fn pending_events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Take the raised events, leaving none behind
    pub fn into_events(self) -> Vec<GameEvent> {
        self.events
    }
}

/// Unit of per-frame logic
///
/// Every hook is optional. A hook returning `Err` is logged with the system's
/// name and the frame carries on with the next system.
pub trait System {
    /// Unique name used for registration and logging
    fn name(&self) -> &'static str;

    /// Execution order, lower runs first
    fn order(&self) -> i32 {
        SystemOrder::NORMAL
    }

    /// Called once when the world wakes up
    fn awake(&mut self, _ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        Ok(())
    }

    /// Called once after the scene is in place
    fn start(&mut self, _ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        Ok(())
    }

    /// Called every frame while enabled
    fn update(&mut self, _ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        Ok(())
    }

    /// Called for every broadcast event, enabled or not
    fn on_notify(&mut self, _ctx: &mut SystemContext<'_>, _event: &GameEvent) -> Result<(), EcsError> {
        Ok(())
    }
}
