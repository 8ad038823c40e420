//! Error types for the hot-reload watcher.

use std::path::PathBuf;
use thiserror::Error;

use crate::patterns::ValidationError;

/// Errors from watcher setup and the manual reload trigger.
///
/// Steady-state failures (bad edits, watch backend hiccups, sink errors) are
/// never returned from the background loop; they are logged, counted and
/// reported through the sink.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Hot-reload requires a filesystem patterns directory")]
    NoPatternsDirectory,

    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Hot-reload watcher is already running")]
    AlreadyStarted,

    #[error("Pattern file not found: {name}")]
    PatternFileNotFound { name: String },

    #[error("Validation failed for {name}: {source}")]
    Validation {
        name: String,
        #[source]
        source: ValidationError,
    },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
