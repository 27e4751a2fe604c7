//! Grid movement system
//!
//! Walks entities carrying a [`Movement`] component along A* paths, one cell
//! at a time, and keeps the pathing grid's occupancy flags in sync with every
//! blocking [`Collidable`].
//!
//! A walk is planned when a movement target appears or changes. The target
//! cell is reserved as a destination so two walkers never head for the same
//! cell. When the next cell turns out to be occupied the walk is dropped and
//! planned again on the following frame.

use std::collections::{HashMap, VecDeque};

use crate::ecs::components::{Collidable, Movement, Transform};
use crate::ecs::system::{System, SystemContext, SystemOrder};
use crate::ecs::{EcsError, EntityId};
use crate::events::GameEvent;
use crate::pathfinding::{GridPos, PathMode, PathingFlags};

/// Cells a walker may not enter
pub const BLOCKED_BY: PathingFlags = PathingFlags::OBSTACLES.union(PathingFlags::COLLIDABLES);

#[derive(Debug)]
struct Walk {
    target: GridPos,
    path: VecDeque<GridPos>,
    progress: f32,
}

/// Plans and steps grid walks, maintains grid occupancy
#[derive(Debug, Default)]
pub struct MovementSystem {
    walks: HashMap<EntityId, Walk>,
    occupied: HashMap<EntityId, GridPos>,
}

impl MovementSystem {
    /// Create the system
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of walks in progress
    pub fn active_walks(&self) -> usize {
        self.walks.len()
    }

    /// Mirror the cells of every blocking collidable into the grid
    ///
    /// Stale cells are cleared before new ones are set, so an entity moving
    /// into a cell another one just left keeps it marked.
    fn sync_occupancy(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        let mut cells = HashMap::new();
        for id in ctx.entities.entities_with::<(Transform, Collidable)>()? {
            if let Some((transform, collidable)) = ctx.entities.node::<(Transform, Collidable)>(id) {
                if let Some(cell) = transform.cell().filter(|_| collidable.blocking) {
                    cells.insert(id, cell);
                }
            }
        }

        for (id, cell) in &self.occupied {
            if cells.get(id) != Some(cell) {
                ctx.pathfinder.clear_collidable(cell.x, cell.y);
            }
        }
        for (id, cell) in &cells {
            if self.occupied.get(id) != Some(cell) {
                ctx.pathfinder.set_collidable(cell.x, cell.y);
            }
        }
        self.occupied = cells;
        Ok(())
    }

    /// Drop walks of entities that no longer exist
    fn prune(&mut self, ctx: &mut SystemContext<'_>) {
        let entities = &*ctx.entities;
        let pathfinder = &mut *ctx.pathfinder;
        self.walks.retain(|id, walk| {
            let alive = entities.contains(*id);
            if !alive {
                pathfinder.clear_destination(walk.target.x, walk.target.y);
            }
            alive
        });
    }

    fn cancel(&mut self, ctx: &mut SystemContext<'_>, id: EntityId) {
        if let Some(walk) = self.walks.remove(&id) {
            ctx.pathfinder.clear_destination(walk.target.x, walk.target.y);
        }
    }

    fn plan(ctx: &mut SystemContext<'_>, id: EntityId, from: GridPos, target: GridPos, mode: PathMode) -> Option<Walk> {
        let reserved = target != from && ctx.pathfinder.has(target.x, target.y, PathingFlags::DESTINATIONS);
        let path = if reserved {
            Vec::new()
        } else {
            ctx.pathfinder.find_path(from, target, mode, BLOCKED_BY)
        };

        if path.is_empty() {
            log::debug!("No {} path for {} from {} to {}", mode, id, from, target);
            if let Some(movement) = ctx.entities.get_component_mut::<Movement>(id) {
                movement.stop();
            }
            ctx.broadcast(GameEvent::path_failed(id, target));
            return None;
        }

        ctx.pathfinder.set_destination(target.x, target.y);
        let mut path = VecDeque::from(path);
        path.pop_front();
        log::trace!("Planned {} steps for {} to {}", path.len(), id, target);
        Some(Walk {
            target,
            path,
            progress: 0.0,
        })
    }

    fn advance(&mut self, ctx: &mut SystemContext<'_>, id: EntityId) {
        let Some((transform, movement)) = ctx.entities.node::<(Transform, Movement)>(id) else {
            return;
        };
        let request = movement.target().filter(|_| movement.moving);
        let mode = movement.path_mode().unwrap_or(ctx.pathfinder.default_mode());
        let speed = movement.speed;
        let cell = transform.cell();
        let blocking = ctx
            .entities
            .get_component::<Collidable>(id)
            .is_some_and(|collidable| collidable.blocking);

        let (Some(target), Some(mut current)) = (request, cell) else {
            self.cancel(ctx, id);
            return;
        };

        if self.walks.get(&id).map_or(true, |walk| walk.target != target) {
            self.cancel(ctx, id);
            match Self::plan(ctx, id, current, target, mode) {
                Some(walk) => {
                    self.walks.insert(id, walk);
                }
                None => return,
            }
        }

        let Some(walk) = self.walks.get_mut(&id) else {
            return;
        };
        walk.progress += speed * ctx.time.delta;

        let mut blocked = false;
        while walk.progress >= 1.0 {
            let Some(&next) = walk.path.front() else {
                break;
            };
            if !ctx.pathfinder.grid().is_passable(next.x, next.y, BLOCKED_BY) {
                log::debug!("{} is blocked at {}, replanning", id, next);
                blocked = true;
                break;
            }

            if blocking {
                ctx.pathfinder.clear_collidable(current.x, current.y);
                ctx.pathfinder.set_collidable(next.x, next.y);
                self.occupied.insert(id, next);
            }
            if let Some(transform) = ctx.entities.get_component_mut::<Transform>(id) {
                transform.face(next);
                transform.set_cell(next);
            }
            ctx.broadcast(GameEvent::moved(id, current, next));

            walk.path.pop_front();
            walk.progress -= 1.0;
            current = next;
        }

        if blocked {
            self.cancel(ctx, id);
        } else if walk.path.is_empty() {
            log::debug!("{} arrived at {}", id, target);
            self.cancel(ctx, id);
            if let Some(movement) = ctx.entities.get_component_mut::<Movement>(id) {
                movement.stop();
            }
        }
    }
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "MovementSystem"
    }

    fn order(&self) -> i32 {
        SystemOrder::MOVEMENT
    }

    fn start(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        self.sync_occupancy(ctx)
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        self.sync_occupancy(ctx)?;
        self.prune(ctx);
        for id in ctx.entities.entities_with::<(Transform, Movement)>()? {
            self.advance(ctx, id);
        }
        Ok(())
    }

    fn on_notify(&mut self, ctx: &mut SystemContext<'_>, event: &GameEvent) -> Result<(), EcsError> {
        if let GameEvent::SceneLoaded { .. } = event {
            self.sync_occupancy(ctx)?;
        }
        Ok(())
    }
}
