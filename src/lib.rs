pub mod cli;
pub mod config;
pub mod logging;
pub mod patterns;
pub mod watcher;

pub use config::Settings;
pub use patterns::{Pattern, PatternError, PatternStore, PatternSummary, ValidationError};
pub use watcher::{
    HotReloadStatus, HotReloader, OutcomeKind, ReloadBroadcaster, ReloadOutcome, ReloadSink,
    WatchError,
};
