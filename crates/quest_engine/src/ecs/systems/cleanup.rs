//! End of frame cleanup
//!
//! Entities that died or were despawned by the server are collected while
//! events arrive and deleted together once every other system has run, so no
//! system loses an entity in the middle of its update.

use crate::ecs::components::{Collidable, Identifiable, Transform};
use crate::ecs::system::{System, SystemContext, SystemOrder};
use crate::ecs::{EcsError, EntityId};
use crate::events::GameEvent;

/// Deletes dead and despawned entities at the end of the frame
#[derive(Debug, Default)]
pub struct CleanupSystem {
    pending: Vec<EntityId>,
}

impl CleanupSystem {
    /// Entities queued for deletion
    pub fn pending(&self) -> &[EntityId] {
        &self.pending
    }

    fn queue(&mut self, id: EntityId) {
        if !self.pending.contains(&id) {
            self.pending.push(id);
        }
    }

    fn find_server_entity(ctx: &SystemContext<'_>, server_id: i32) -> Option<EntityId> {
        ctx.entities
            .entities_with_component::<Identifiable>()
            .into_iter()
            .find(|id| {
                ctx.entities
                    .get_component::<Identifiable>(*id)
                    .is_some_and(|identity| identity.id == server_id)
            })
    }

    fn free_cell(ctx: &mut SystemContext<'_>, id: EntityId) {
        let Some((transform, collidable)) = ctx.entities.node::<(Transform, Collidable)>(id) else {
            return;
        };
        if let Some(cell) = transform.cell().filter(|_| collidable.blocking) {
            ctx.pathfinder.clear_collidable(cell.x, cell.y);
        }
    }
}

impl System for CleanupSystem {
    fn name(&self) -> &'static str {
        "CleanupSystem"
    }

    fn order(&self) -> i32 {
        SystemOrder::LATE
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        for id in std::mem::take(&mut self.pending) {
            if !ctx.entities.contains(id) {
                continue;
            }
            Self::free_cell(ctx, id);
            ctx.entities.delete_entity(id);
            log::debug!("Cleaned up {}", id);
        }
        Ok(())
    }

    fn on_notify(&mut self, ctx: &mut SystemContext<'_>, event: &GameEvent) -> Result<(), EcsError> {
        match event {
            GameEvent::Death { entity } => self.queue(*entity),
            GameEvent::ServerDespawn { server_id } => match Self::find_server_entity(ctx, *server_id) {
                Some(id) => self.queue(id),
                None => log::warn!("Despawn for unknown server id {}", server_id),
            },
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{EntityManager, PrefabLibrary};
    use crate::foundation::time::FrameTime;
    use crate::pathfinding::{GridPos, Pathfinder, PathingFlags};

    #[test]
    fn test_dead_and_despawned_entities_are_deleted_on_update() {
        let mut entities = EntityManager::with_builtin_components().unwrap();
        let mut pathfinder = Pathfinder::new(4, 4);
        let prefabs = PrefabLibrary::new();

        let rat = entities.create_entity("rat", None).unwrap();
        entities.add_component::<Transform>(rat).unwrap().set_cell(GridPos::new(2, 1));
        entities.add_component::<Collidable>(rat).unwrap();
        pathfinder.set_collidable(2, 1);
        let ghost = entities.create_entity("ghost", None).unwrap();
        entities.add_component::<Identifiable>(ghost).unwrap().id = 77;

        let mut system = CleanupSystem::default();
        let mut ctx = SystemContext::new(&mut entities, &mut pathfinder, &prefabs, FrameTime::default());
        system.on_notify(&mut ctx, &GameEvent::death(rat)).unwrap();
        system.on_notify(&mut ctx, &GameEvent::death(rat)).unwrap();
        system.on_notify(&mut ctx, &GameEvent::despawn(77)).unwrap();
        system.on_notify(&mut ctx, &GameEvent::despawn(78)).unwrap();
        assert_eq!(system.pending(), &[rat, ghost]);
        // Nothing is deleted before the update
        assert!(ctx.entities.contains(rat));

        system.update(&mut ctx).unwrap();
        assert!(system.pending().is_empty());
        assert!(!ctx.entities.contains(rat));
        assert!(!ctx.entities.contains(ghost));
        assert!(!ctx.pathfinder.has(2, 1, PathingFlags::COLLIDABLES));
    }
}
