//! Hot reload of the pattern library.
//!
//! Watches the patterns directory and keeps the shared [`PatternStore`]
//! in step with edits on disk, without a restart.
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher  (root + search-path subdirectories)
//!         |
//!     mpsc channel
//!         |
//!   dispatch task  --filter--> Debouncer (one timer per path)
//!                                  |
//!                            settled event
//!                                  |
//!                      ReloadPipeline (blocking task)
//!                        validate -> apply | reject
//!                                  |
//!                  PatternStore  +  ReloadSink
//! ```
//!
//! [`PatternStore`]: crate::patterns::PatternStore

mod debouncer;
mod error;
mod event;
mod hot_reload;
mod metrics;
mod notifications;
mod pipeline;
mod scope;
mod sink;
mod watch_set;

pub use debouncer::Debouncer;
pub use error::WatchError;
pub use event::{ChangeEvent, ChangeKind};
pub use hot_reload::{HotReloadStatus, HotReloader, HotReloaderBuilder, LifecycleState, STOP_GRACE};
pub use metrics::{MetricsSnapshot, ReloadMetrics};
pub use notifications::ReloadBroadcaster;
pub use pipeline::{ReloadPhase, ReloadPipeline};
pub use sink::{OutcomeKind, ReloadOutcome, ReloadSink};
pub use watch_set::WatchSet;
