//! ECS Systems module
//!
//! Gameplay systems shipped with the engine. Games register them with
//! [`World::register_system`](crate::ecs::World::register_system) next to
//! their own.

pub mod cleanup;
pub mod combat;
pub mod movement;

pub use cleanup::CleanupSystem;
pub use combat::CombatSystem;
pub use movement::MovementSystem;
