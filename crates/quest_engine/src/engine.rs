//! Core engine implementation

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::{
    application::Application,
    assets::{self, AssetError, AssetSource, FileSource, LoadTask},
    config::ConfigError,
    core::config::EngineConfig,
    ecs::{EcsError, EntityId, SceneDocument, World},
    foundation::logging,
};
use thiserror::Error;

/// Main engine struct
///
/// Owns the world and the asset source, and runs the frame loop.
pub struct Engine {
    /// ECS world containing all entities, systems and the pathing grid
    pub world: World,

    /// Where prefab and scene documents are read from
    source: Arc<dyn AssetSource>,

    /// Engine configuration
    config: EngineConfig,

    /// Whether the engine should continue running
    running: bool,

    /// Frames completed by the loop
    frames: u64,
}

impl Engine {
    /// Create a new engine reading assets from `config.assets.root`
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let source = Arc::new(FileSource::new(&config.assets.root));
        Self::with_source(config, source)
    }

    /// Create a new engine reading assets from a custom source
    pub fn with_source(config: EngineConfig, source: Arc<dyn AssetSource>) -> Result<Self, EngineError> {
        log::info!("Initializing engine...");
        config.validate()?;

        let mut world = World::new(config.world)?;
        world.pathfinder_mut().set_default_mode(config.pathfinding.mode());

        let prefabs = assets::load_prefabs(Arc::clone(&source), config.assets.prefab_file.clone())
            .wait(config.assets.load_timeout())?;
        world.set_prefabs(prefabs);

        Ok(Self {
            world,
            source,
            config,
            running: false,
            frames: 0,
        })
    }

    /// Run the engine main loop with the given application
    pub fn run<T: Application>(config: EngineConfig, app: &mut T) -> Result<(), EngineError> {
        logging::init_with_level(&config.log_level);
        let mut engine = Self::new(config)?;
        engine.run_app(app)?;
        Ok(())
    }

    /// Boot the world for `app` and loop until it quits or the frame limit is hit
    ///
    /// Returns the number of frames run.
    pub fn run_app<T: Application>(&mut self, app: &mut T) -> Result<u64, EngineError> {
        app.initialize(self)
            .map_err(|e| EngineError::Application(format!("App initialization: {e}")))?;
        self.world.awake()?;
        self.world.start()?;

        log::info!("Starting main loop...");
        self.running = true;
        let budget = self.config.frame_budget();
        let mut last_frame = Instant::now();

        while self.running && !self.frame_limit_reached() {
            let frame_start = Instant::now();
            let delta_time = frame_start.duration_since(last_frame).as_secs_f32();
            last_frame = frame_start;

            app.update(self, delta_time)
                .map_err(|e| EngineError::Application(format!("App update: {e}")))?;
            self.world.update(delta_time)?;
            self.frames += 1;

            if let Some(budget) = budget {
                let spent = frame_start.elapsed();
                if spent < budget {
                    thread::sleep(budget - spent);
                }
            }
        }

        app.cleanup(self);
        self.running = false;

        log::info!("Engine shutdown complete after {} frames", self.frames);
        Ok(self.frames)
    }

    fn frame_limit_reached(&self) -> bool {
        self.config.max_frames.is_some_and(|max| self.frames >= max)
    }

    /// Start loading a scene document in the background
    pub fn begin_scene_load(&self, path: impl Into<String>) -> LoadTask<SceneDocument> {
        assets::load_scene(Arc::clone(&self.source), path)
    }

    /// Load a scene document and instantiate it, waiting up to the configured timeout
    pub fn load_scene(&mut self, path: impl Into<String>) -> Result<EntityId, EngineError> {
        let scene = self.begin_scene_load(path).wait(self.config.assets.load_timeout())?;
        Ok(self.world.load_scene(&scene)?)
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// True while the frame loop is running
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Frames completed so far
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Engine configuration
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the ECS world
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration failed to load or validate
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Asset loading error
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// World or entity error
    #[error("World error: {0}")]
    Ecs(#[from] EcsError),

    /// Application error
    #[error("Application error: {0}")]
    Application(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AppError;
    use crate::core::config::AssetConfig;
    use crate::ecs::components::Health;
    use crate::ecs::systems::{CleanupSystem, CombatSystem};
    use crate::events::GameEvent;
    use crate::pathfinding::PathMode;

    const PREFABS: &str = r#"[{ "name": "Rat", "components": { "Transform": {}, "Health": { "hp": "3" } } }]"#;
    const SCENE: &str = r#"{ "name": "cellar", "root": { "name": "Cellar", "children": [ { "ref": "Rat" } ] } }"#;

    fn assets_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("prefabs.json"), PREFABS).unwrap();
        std::fs::write(dir.path().join("cellar.json"), SCENE).unwrap();
        dir
    }

    fn config(dir: &tempfile::TempDir) -> EngineConfig {
        EngineConfig::new()
            .with_target_fps(None)
            .with_assets(AssetConfig::new().with_root(dir.path().display().to_string()))
    }

    #[derive(Default)]
    struct CellarApp {
        updates: u32,
        quit_after: Option<u32>,
        cleaned_up: bool,
    }

    impl Application for CellarApp {
        fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
            engine.world_mut().register_system::<CombatSystem>()?;
            engine.world_mut().register_system::<CleanupSystem>()?;
            engine.load_scene("cellar.json")?;
            Ok(())
        }

        fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
            self.updates += 1;
            if self.updates == 1 {
                let rat = engine
                    .world()
                    .entities()
                    .get_first_entity_with_component::<Health>()
                    .ok_or_else(|| AppError::Custom("no rat".into()))?;
                engine.world_mut().broadcast(GameEvent::damage(rat, 5.0));
            }
            if self.quit_after == Some(self.updates) {
                engine.quit();
            }
            Ok(())
        }

        fn cleanup(&mut self, _engine: &mut Engine) {
            self.cleaned_up = true;
        }
    }

    #[test]
    fn test_runs_until_frame_limit() {
        let dir = assets_dir();
        let mut engine = Engine::new(config(&dir).with_max_frames(3)).unwrap();
        let mut app = CellarApp::default();

        assert_eq!(engine.run_app(&mut app).unwrap(), 3);
        assert_eq!(app.updates, 3);
        assert!(app.cleaned_up);
        assert!(!engine.is_running());
        // The rat died on the first frame and was removed by the cleanup
        assert!(engine.world().entities().get_entity_with_name("Rat").is_none());
    }

    #[test]
    fn test_quit_stops_the_loop() {
        let dir = assets_dir();
        let mut engine = Engine::new(config(&dir).with_max_frames(100)).unwrap();
        let mut app = CellarApp {
            quit_after: Some(2),
            ..CellarApp::default()
        };
        assert_eq!(engine.run_app(&mut app).unwrap(), 2);
    }

    #[test]
    fn test_missing_prefabs_fail_startup() {
        let dir = tempfile::tempdir().unwrap();
        let result = Engine::new(config(&dir));
        assert!(matches!(result, Err(EngineError::Asset(AssetError::Io { .. }))));
    }

    #[test]
    fn test_invalid_config_fails_startup() {
        let dir = assets_dir();
        let result = Engine::new(config(&dir).with_max_event_depth(0));
        assert!(matches!(result, Err(EngineError::Config(ConfigError::Invalid(_)))));
    }

    #[test]
    fn test_default_path_mode_comes_from_config() {
        let dir = assets_dir();
        let mut config = config(&dir);
        config.pathfinding.default_mode = "Diagonal".into();
        let engine = Engine::new(config).unwrap();
        assert_eq!(engine.world().pathfinder().default_mode(), PathMode::Diagonal);
    }
}
