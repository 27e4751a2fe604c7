//! Combat resolution
//!
//! Applies [`GameEvent::Damage`] to the target's [`Health`] and announces a
//! [`GameEvent::Death`] the moment hit points reach zero. Dead entities take
//! no further damage and die only once. A dying entity that carries [`Loot`]
//! drops it on its cell.

use crate::ecs::components::{Health, Loot, Transform};
use crate::ecs::system::{System, SystemContext};
use crate::ecs::{EcsError, EntityId};
use crate::events::GameEvent;

/// Turns damage events into health changes and deaths
#[derive(Debug, Default)]
pub struct CombatSystem {
    kills: u32,
}

impl CombatSystem {
    /// Number of deaths this system announced
    pub const fn kills(&self) -> u32 {
        self.kills
    }

    fn apply_damage(&mut self, ctx: &mut SystemContext<'_>, target: EntityId, amount: f32) {
        let Some(health) = ctx.entities.get_component_mut::<Health>(target) else {
            log::warn!("Damage for {} which has no Health", target);
            return;
        };
        if health.is_dead() {
            return;
        }
        let left = health.take_damage(amount);
        log::debug!("{} took {} damage, {} hp left", target, amount, left);
        if health.is_dead() {
            self.kills += 1;
            ctx.broadcast(GameEvent::death(target));
            Self::drop_loot(ctx, target);
        }
    }

    fn drop_loot(ctx: &mut SystemContext<'_>, target: EntityId) {
        let Some(item) = ctx.entities.get_component::<Loot>(target).map(|loot| loot.item.clone()) else {
            return;
        };
        let Some(cell) = ctx.entities.get_component::<Transform>(target).and_then(Transform::cell) else {
            return;
        };
        ctx.broadcast(GameEvent::loot_dropped(target, item, cell));
    }
}

impl System for CombatSystem {
    fn name(&self) -> &'static str {
        "CombatSystem"
    }

    fn on_notify(&mut self, ctx: &mut SystemContext<'_>, event: &GameEvent) -> Result<(), EcsError> {
        if let GameEvent::Damage { target, amount } = event {
            self.apply_damage(ctx, *target, *amount);
        }
        Ok(())
    }
}
