//! # Engine Configuration
//!
//! All tunables of the simulation in one serializable tree. Every section
//! has defaults, so a config file only needs the keys it changes.
//!
//! ```toml
//! log_level = "debug"
//! target_fps = 30
//!
//! [assets]
//! root = "assets"
//! prefab_file = "prefabs.json"
//!
//! [world]
//! max_event_depth = 16
//! ```

use serde::{Deserialize, Serialize};

use crate::pathfinding::PathMode;

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// Log levels accepted by `log_level`
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// # Asset Configuration
///
/// Where prefab and scene documents are read from and how long startup may
/// wait for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Base directory for assets
    pub root: String,
    /// Prefab document, relative to `root`
    pub prefab_file: String,
    /// How long startup waits for a document before giving up, in milliseconds
    pub load_timeout_ms: u64,
}

impl AssetConfig {
    /// Create an asset configuration with defaults
    pub fn new() -> Self {
        Self {
            root: "assets".to_string(),
            prefab_file: "prefabs.json".to_string(),
            load_timeout_ms: 5_000,
        }
    }

    /// Set the assets directory
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the prefab document
    pub fn with_prefab_file(mut self, file: impl Into<String>) -> Self {
        self.prefab_file = file.into();
        self
    }

    /// Set the load timeout
    pub fn with_load_timeout_ms(mut self, timeout: u64) -> Self {
        self.load_timeout_ms = timeout;
        self
    }

    /// Load timeout as a duration
    pub const fn load_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.load_timeout_ms)
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # World Configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Deepest chain of events raised from event handlers before further ones are dropped
    pub max_event_depth: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self { max_event_depth: 32 }
    }
}

/// # Pathfinding Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Path mode used when a walker does not name one
    pub default_mode: String,
}

impl PathfindingConfig {
    /// Parsed default mode
    pub fn mode(&self) -> PathMode {
        PathMode::from_name(&self.default_mode)
    }
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            default_mode: PathMode::Manhattan.name().to_string(),
        }
    }
}

/// # Engine Configuration
///
/// Top-level configuration: logging, frame pacing and the subsystem sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Target FPS for frame rate limiting, unlimited when unset
    pub target_fps: Option<u32>,
    /// Stop after this many frames, run until the application quits when unset
    pub max_frames: Option<u64>,
    /// Asset loading
    pub assets: AssetConfig,
    /// World orchestration
    pub world: WorldConfig,
    /// Pathfinding
    pub pathfinding: PathfindingConfig,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            target_fps: Some(60),
            max_frames: None,
            assets: AssetConfig::default(),
            world: WorldConfig::default(),
            pathfinding: PathfindingConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set target FPS, `None` for unlimited
    pub fn with_target_fps(mut self, fps: Option<u32>) -> Self {
        self.target_fps = fps;
        self
    }

    /// Stop after a fixed number of frames
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Set the asset section
    pub fn with_assets(mut self, assets: AssetConfig) -> Self {
        self.assets = assets;
        self
    }

    /// Set the event nesting limit
    pub fn with_max_event_depth(mut self, depth: usize) -> Self {
        self.world.max_event_depth = depth;
        self
    }

    /// Frame budget derived from `target_fps`
    pub fn frame_budget(&self) -> Option<std::time::Duration> {
        self.target_fps
            .filter(|fps| *fps > 0)
            .map(|fps| std::time::Duration::from_secs_f64(1.0 / f64::from(fps)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level '{}' is not one of {:?}",
                self.log_level, LOG_LEVELS
            )));
        }
        if self.target_fps == Some(0) {
            return Err(ConfigError::Invalid("target_fps must be at least 1".to_string()));
        }
        if self.world.max_event_depth == 0 {
            return Err(ConfigError::Invalid("world.max_event_depth must be at least 1".to_string()));
        }
        if self.assets.prefab_file.is_empty() {
            return Err(ConfigError::Invalid("assets.prefab_file cannot be empty".to_string()));
        }
        if self.pathfinding.default_mode.parse::<PathMode>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "pathfinding.default_mode '{}' is not a known path mode",
                self.pathfinding.default_mode
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}
