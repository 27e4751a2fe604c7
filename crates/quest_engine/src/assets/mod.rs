//! Asset loading
//!
//! Prefab and scene documents are fetched and parsed off the simulation
//! thread. A [`LoadTask`] owns the worker and hands the parsed result back
//! through a channel; the frame loop polls it or blocks with a timeout.

pub mod loader;

pub use loader::{LoadTask, LoadTaskState};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::ecs::{EcsError, PrefabLibrary, SceneDocument};

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Document could not be read
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// Requested path
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Document was read but does not describe prefabs or a scene
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        /// Requested path
        path: String,
        /// Parse failure
        #[source]
        source: EcsError,
    },

    /// Load did not finish in time
    #[error("Loading '{path}' timed out after {after:?}")]
    Timeout {
        /// Requested path
        path: String,
        /// Time waited
        after: Duration,
    },

    /// Load was cancelled before its result was taken
    #[error("Loading '{0}' was cancelled")]
    Cancelled(String),

    /// Worker thread exited without reporting a result
    #[error("Loader for '{0}' stopped without a result")]
    WorkerLost(String),

    /// Result was already taken from the task
    #[error("Result for '{0}' was already taken")]
    AlreadyTaken(String),
}

/// Where asset documents come from
pub trait AssetSource: Send + Sync {
    /// Read a document as text
    fn read_to_string(&self, path: &str) -> Result<String, AssetError>;
}

/// Reads documents from a directory on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    /// Source rooted at a directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for FileSource {
    fn read_to_string(&self, path: &str) -> Result<String, AssetError> {
        let full = self.root.join(path);
        log::debug!("Reading asset {}", full.display());
        std::fs::read_to_string(&full).map_err(|source| AssetError::Io {
            path: full.display().to_string(),
            source,
        })
    }
}

/// Start loading a prefab document
pub fn load_prefabs(source: Arc<dyn AssetSource>, path: impl Into<String>) -> LoadTask<PrefabLibrary> {
    LoadTask::spawn(source, path, PrefabLibrary::from_json)
}

/// Start loading a scene document
pub fn load_scene(source: Arc<dyn AssetSource>, path: impl Into<String>) -> LoadTask<SceneDocument> {
    LoadTask::spawn(source, path, SceneDocument::from_json)
}
