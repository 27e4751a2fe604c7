//! Application trait and lifecycle management

use crate::ecs::EcsError;
use crate::engine::{Engine, EngineError};
use thiserror::Error;

/// Application lifecycle trait
///
/// Implement this trait to drive a game session with the engine.
pub trait Application {
    /// Initialize the application
    ///
    /// Called once after prefabs are loaded and before the world wakes up.
    /// Register systems, subscribe listeners and load the first scene here.
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError>;

    /// Update the application
    ///
    /// Called every frame before the world's systems run.
    ///
    /// # Arguments
    /// * `engine` - Mutable reference to the engine
    /// * `delta_time` - Time since last frame in seconds
    fn update(&mut self, engine: &mut Engine, delta_time: f32) -> Result<(), AppError> {
        let _ = (engine, delta_time);
        Ok(())
    }

    /// Cleanup the application
    ///
    /// Called once when the frame loop ends.
    fn cleanup(&mut self, engine: &mut Engine) {
        let _ = engine;
    }
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Engine error propagated to application level
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Entity or world error
    #[error("World error: {0}")]
    Ecs(#[from] EcsError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),
}
