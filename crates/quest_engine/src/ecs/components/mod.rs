//! ECS Components module
//!
//! Built-in gameplay components. Registration order below fixes the bit each
//! type owns, so new types must be appended at the end.

pub mod transform;
pub mod identity;
pub mod movement;
pub mod health;
pub mod collision;
pub mod loot;

pub use transform::Transform;
pub use identity::Identifiable;
pub use movement::Movement;
pub use health::Health;
pub use collision::Collidable;
pub use loot::Loot;

use super::component::ComponentRegistry;
use super::error::EcsError;

/// Register every built-in component type in declaration order
pub fn register_builtin(registry: &mut ComponentRegistry) -> Result<(), EcsError> {
    registry.register::<Transform>()?;
    registry.register::<Identifiable>()?;
    registry.register::<Movement>()?;
    registry.register::<Health>()?;
    registry.register::<Collidable>()?;
    registry.register::<Loot>()?;
    Ok(())
}

impl ComponentRegistry {
    /// Registry holding the built-in component types
    pub fn builtin() -> Result<Self, EcsError> {
        let mut registry = Self::new();
        register_builtin(&mut registry)?;
        Ok(registry)
    }
}
