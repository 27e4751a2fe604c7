//! ECS error types

use thiserror::Error;

use super::entity::EntityId;
use super::world::WorldState;

/// Errors raised by the ECS core
///
/// Lookups that simply find nothing are not errors; they return `None`.
/// These variants cover data and programmer mistakes that would otherwise
/// corrupt the entity tables or indices.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EcsError {
    /// More component types registered than the bitfield can tag
    #[error("Component capacity exceeded: cannot register '{0}', all {1} bits are taken")]
    ComponentCapacityExceeded(&'static str, u32),

    /// Component name not present in the registry
    #[error("Unknown component type: {0}")]
    UnknownComponent(String),

    /// Two different types registered under one component name
    #[error("Component name '{0}' is already registered by another type")]
    DuplicateComponentName(&'static str),

    /// Prefab attribute string could not be coerced into the field's type
    #[error("Invalid value '{value}' for {component}.{field}: expected {expected}")]
    InvalidAttribute {
        /// Component name
        component: String,
        /// Field name
        field: String,
        /// Raw string value from the prefab
        value: String,
        /// Expected field type
        expected: &'static str,
    },

    /// Prefab name not present in the loaded library
    #[error("Unknown prefab: {0}")]
    UnknownPrefab(String),

    /// Prefab `ref` chain loops back on itself
    #[error("Prefab reference cycle through '{0}'")]
    PrefabCycle(String),

    /// Prefab or component document is not valid JSON for the expected shape
    #[error("Malformed prefab data: {0}")]
    MalformedPrefab(String),

    /// Entity id not present in the entity table
    #[error("Entity {0} does not exist")]
    MissingEntity(EntityId),

    /// Tag already owned by a different entity
    #[error("Tag '{tag}' is already used by entity {owner}")]
    TagInUse {
        /// Requested tag
        tag: String,
        /// Entity currently holding the tag
        owner: EntityId,
    },

    /// Parenting would make an entity its own ancestor
    #[error("Cannot attach {child} under {parent}: it would create a cycle")]
    InvalidHierarchy {
        /// Requested parent
        parent: EntityId,
        /// Requested child
        child: EntityId,
    },

    /// Typed query names the same component type twice
    #[error("Query requires the same component type more than once")]
    DuplicateQueryComponent,

    /// System name registered twice in the pool
    #[error("System '{0}' is already registered")]
    DuplicateSystem(String),

    /// Lifecycle call made in the wrong world state
    #[error("Invalid world state for {operation}: world is {state:?}")]
    InvalidState {
        /// Attempted operation
        operation: &'static str,
        /// State the world was in
        state: WorldState,
    },

    /// Error reported by a system hook
    #[error("System '{system}' failed: {message}")]
    SystemFailed {
        /// System name
        system: &'static str,
        /// Failure description
        message: String,
    },
}

impl From<serde_json::Error> for EcsError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedPrefab(err.to_string())
    }
}
