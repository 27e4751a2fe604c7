//! # Quest Engine
//!
//! Client-side simulation core for a networked 2D action game.
//!
//! ## Features
//!
//! - **ECS Runtime**: Entities in a tree, components tagged by a 96-bit mask,
//!   per-component indices for fast iteration
//! - **Prefabs**: JSON prefab and scene documents with references and overrides
//! - **Systems**: Ordered lifecycle hooks and synchronous event broadcast
//! - **Pathfinding**: Grid A* with Manhattan, diagonal and euclidean modes
//! - **Asset Loading**: Background loads with timeout and cancellation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quest_engine::prelude::*;
//!
//! struct MyGame;
//!
//! impl Application for MyGame {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         engine.world_mut().register_system::<MovementSystem>()?;
//!         engine.load_scene("scenes/town.json")?;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::load_or_default("config.toml")?;
//!     Engine::run(config, &mut MyGame)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;

pub mod foundation;
pub mod ecs;
pub mod events;
pub mod pathfinding;
pub mod assets;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        AppError, Application,
        Engine, EngineError,
        assets::{AssetError, AssetSource, FileSource, LoadTask},
        config::Config,
        core::config::{AssetConfig, EngineConfig, PathfindingConfig, WorldConfig},
        ecs::{
            components::{Collidable, Health, Identifiable, Loot, Movement, Transform},
            systems::{CleanupSystem, CombatSystem, MovementSystem},
            Component, EcsError, Entity, EntityId, EntityManager, IdentityOverride, PrefabLibrary,
            SceneDocument, System, SystemContext, SystemOrder, World,
        },
        events::{EventKind, GameEvent},
        foundation::time::FrameTime,
        pathfinding::{GridPos, PathMode, Pathfinder, PathingFlags},
    };
}
