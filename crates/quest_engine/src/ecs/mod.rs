//! Entity-Component-System implementation
//!
//! Entities live in an [`EntityManager`] that keeps one insertion-ordered
//! index per component type. Component types are registered up front and
//! each owns one bit of a 96-bit [`Bitfield`](crate::foundation::Bitfield),
//! so "has these components" is a mask test. Systems are driven by the
//! [`World`] in a fixed order and talk to each other through broadcast
//! [`GameEvent`](crate::events::GameEvent)s.

pub mod component;
pub mod components;
pub mod entity;
pub mod error;
pub mod manager;
pub mod prefab;
pub mod query;
pub mod system;
pub mod systems;
pub mod world;

#[cfg(test)]
mod tests;

pub use component::{
    Component, ComponentData, ComponentInfo, ComponentRegistry, ComponentSlot, FieldSpec, FieldType, FieldValue,
};
pub use entity::{Entity, EntityId};
pub use error::EcsError;
pub use manager::{EntityManager, IdentityOverride, WORLD_TAG};
pub use prefab::{AttributeMap, ChildPrefab, ComponentValues, Prefab, PrefabLibrary, SceneDocument};
pub use query::ComponentSet;
pub use system::{System, SystemContext, SystemOrder};
pub use world::{SystemPool, World, WorldState};
