//! Hot-reload lifecycle for a patterns directory.
//!
//! [`HotReloader`] owns the watch backend, the dispatch task and the pending
//! reload work. Start it once, stop it once; everything in between runs in
//! the background and reports through the sink and the logs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecommendedWatcher};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Dispatch, field};

use crate::config::HotReloadConfig;
use crate::patterns::PatternStore;

use super::debouncer::Debouncer;
use super::error::WatchError;
use super::event::{ChangeEvent, ChangeKind};
use super::metrics::{MetricsSnapshot, ReloadMetrics};
use super::pipeline::ReloadPipeline;
use super::scope::LogScope;
use super::sink::{ReloadOutcome, ReloadSink};
use super::watch_set::WatchSet;

/// How long `stop` waits for in-flight reloads.
pub const STOP_GRACE: Duration = Duration::from_secs(5);

/// Raw events buffered between the watch backend and the dispatch task.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle of a [`HotReloader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Built, not started.
    Idle,
    /// Started with hot-reload turned off in the configuration.
    Disabled,
    Running,
    /// Terminal.
    Stopped,
}

/// Point-in-time view of the subsystem.
#[derive(Debug, Clone, Serialize)]
pub struct HotReloadStatus {
    pub enabled: bool,
    pub active: bool,
    pub state: LifecycleState,
    pub watched_directories: usize,
    pub directories: Vec<PathBuf>,
    pub debounce_ms: u64,
    pub pending_timers: usize,
    pub patterns: usize,
    pub metrics: MetricsSnapshot,
}

struct Active {
    watcher: RecommendedWatcher,
    watch_set: WatchSet,
    dispatch: JoinHandle<()>,
}

struct Lifecycle {
    state: LifecycleState,
    active: Option<Active>,
}

/// Watches a patterns directory and keeps a [`PatternStore`] in sync with it.
pub struct HotReloader {
    store: Arc<PatternStore>,
    config: HotReloadConfig,
    pipeline: Arc<ReloadPipeline>,
    debouncer: Debouncer,
    metrics: Arc<ReloadMetrics>,
    scope: LogScope,
    shutdown: CancellationToken,
    reloads: TaskTracker,
    lifecycle: Mutex<Lifecycle>,
}

impl HotReloader {
    /// Create a builder for configuring the reloader.
    pub fn builder() -> HotReloaderBuilder {
        HotReloaderBuilder::new()
    }

    /// Reloader with default settings and no sink.
    pub fn new(store: Arc<PatternStore>, config: HotReloadConfig) -> Result<Self, WatchError> {
        Self::builder().store(store).config(config).build()
    }

    pub fn store(&self) -> &Arc<PatternStore> {
        &self.store
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Start watching.
    ///
    /// Must be called from within a Tokio runtime. With hot-reload disabled
    /// this only records the fact and returns `Ok`. Failing to watch the
    /// root aborts the start; a subdirectory that cannot be watched is
    /// skipped with a warning.
    pub fn start(&self) -> Result<(), WatchError> {
        self.scope.in_scope(|| {
            let span = tracing::info_span!(
                "patterns.hotreload.start",
                pattern.dir = field::Empty,
                debounce_ms = self.debouncer.delay().as_millis() as u64,
                watched = field::Empty,
            );
            let _guard = span.enter();
            let result = self.start_watching(&span);
            if let Err(e) = &result {
                tracing::error!("[hot-reload] failed to start: {e}");
            }
            result
        })
    }

    fn start_watching(&self, span: &tracing::Span) -> Result<(), WatchError> {
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            LifecycleState::Running => return Err(WatchError::AlreadyStarted),
            LifecycleState::Stopped => {
                return Err(WatchError::InitFailed {
                    reason: "reloader was stopped; build a new one".to_string(),
                });
            }
            LifecycleState::Idle | LifecycleState::Disabled => {}
        }

        if !self.config.enabled {
            lifecycle.state = LifecycleState::Disabled;
            crate::log_event!("hot-reload", "disabled", "patterns load on demand only");
            return Ok(());
        }

        let root = self
            .store
            .root()
            .ok_or(WatchError::NoPatternsDirectory)?
            .to_path_buf();
        span.record("pattern.dir", field::display(root.display()));

        let runtime = Handle::try_current().map_err(|e| WatchError::InitFailed {
            reason: e.to_string(),
        })?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the reloader stopped
            let _ = event_tx.blocking_send(res);
        })?;

        let mut watch_set = WatchSet::compute(&root, self.store.search_paths());
        watch_set.register(&mut watcher)?;
        span.record("watched", watch_set.watched_count());

        let dispatcher = EventDispatcher {
            watch_set: watch_set.clone(),
            debouncer: self.debouncer.clone(),
            pipeline: Arc::clone(&self.pipeline),
            metrics: Arc::clone(&self.metrics),
            reloads: self.reloads.clone(),
            scope: self.scope.clone(),
            shutdown: self.shutdown.clone(),
        };
        let dispatch = self.scope.spawn(&runtime, dispatcher.run(event_rx));

        crate::log_event!(
            "hot-reload",
            "started",
            "watching {} directories under {} (debounce {}ms)",
            watch_set.watched_count(),
            root.display(),
            self.debouncer.delay().as_millis()
        );

        lifecycle.state = LifecycleState::Running;
        lifecycle.active = Some(Active {
            watcher,
            watch_set,
            dispatch,
        });
        Ok(())
    }

    /// Stop watching and wait for in-flight reloads.
    ///
    /// Pending debounce timers are cancelled without firing. Reloads already
    /// running get [`STOP_GRACE`] to finish. Calling `stop` again, or on a
    /// reloader that never started, does nothing.
    pub async fn stop(&self) {
        self.scope.run(self.shutdown_sequence()).await
    }

    async fn shutdown_sequence(&self) {
        let active = {
            let mut lifecycle = self.lifecycle.lock();
            let previous = std::mem::replace(&mut lifecycle.state, LifecycleState::Stopped);
            if previous != LifecycleState::Stopped {
                crate::debug_event!("hot-reload", "stopping", "from {previous:?}");
            }
            lifecycle.active.take()
        };
        let Some(Active {
            watcher,
            watch_set,
            dispatch,
        }) = active
        else {
            return;
        };

        // Stop routing new events
        self.shutdown.cancel();
        let abort = dispatch.abort_handle();
        if timeout(STOP_GRACE, dispatch).await.is_err() {
            abort.abort();
            tracing::warn!("[hot-reload] dispatch task did not stop in time");
        }

        let cancelled = self.debouncer.cancel_all();
        if cancelled > 0 {
            crate::debug_event!("hot-reload", "cancelled", "{cancelled} pending reloads");
        }

        self.reloads.close();
        if timeout(STOP_GRACE, self.reloads.wait()).await.is_err() {
            tracing::warn!(
                "[hot-reload] {} reloads still running after {}s, not waiting",
                self.reloads.len(),
                STOP_GRACE.as_secs()
            );
        }

        drop(watcher);
        crate::log_event!(
            "hot-reload",
            "stopped",
            "released {} watched directories",
            watch_set.watched_count()
        );
    }

    /// Reload one pattern right now, bypassing the debouncer.
    ///
    /// Works whether or not watching is active. The outcome is also handed
    /// to the sink. A file that fails validation leaves the stored version
    /// untouched and is reported as [`WatchError::Validation`].
    pub fn manual_reload(&self, name: &str) -> Result<ReloadOutcome, WatchError> {
        self.scope.in_scope(|| {
            let span = tracing::info_span!(
                "patterns.hotreload.manual_reload",
                pattern.name = %name,
                pattern.file = field::Empty,
                validation.result = field::Empty,
            );
            let _guard = span.enter();

            let Some(path) = self.store.find_file(name) else {
                tracing::warn!("[hot-reload] manual reload: no file for pattern '{name}'");
                return Err(WatchError::PatternFileNotFound {
                    name: name.to_string(),
                });
            };
            span.record("pattern.file", field::display(path.display()));
            self.metrics.record_manual_reload();

            let kind = if self.store.knows_path(&path) {
                ChangeKind::Modified
            } else {
                ChangeKind::Created
            };
            let outcome = self.pipeline.process(&ChangeEvent::new(path, kind));

            match &outcome.error {
                Some(source) => {
                    span.record("validation.result", source.label());
                    Err(WatchError::Validation {
                        name: name.to_string(),
                        source: source.clone(),
                    })
                }
                None => {
                    span.record("validation.result", "ok");
                    Ok(outcome)
                }
            }
        })
    }

    pub fn status(&self) -> HotReloadStatus {
        let lifecycle = self.lifecycle.lock();
        let directories = lifecycle
            .active
            .as_ref()
            .map(|active| active.watch_set.registered().to_vec())
            .unwrap_or_default();

        HotReloadStatus {
            enabled: self.config.enabled,
            active: lifecycle.state == LifecycleState::Running,
            state: lifecycle.state,
            watched_directories: directories.len(),
            directories,
            debounce_ms: self.debouncer.delay().as_millis() as u64,
            pending_timers: self.debouncer.pending_count(),
            patterns: self.store.len(),
            metrics: self.metrics.snapshot(),
        }
    }
}

impl Drop for HotReloader {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.debouncer.cancel_all();
    }
}

/// State moved into the dispatch task.
struct EventDispatcher {
    watch_set: WatchSet,
    debouncer: Debouncer,
    pipeline: Arc<ReloadPipeline>,
    metrics: Arc<ReloadMetrics>,
    reloads: TaskTracker,
    scope: LogScope,
    shutdown: CancellationToken,
}

impl EventDispatcher {
    async fn run(self, mut events: mpsc::Receiver<notify::Result<Event>>) {
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                received = events.recv() => match received {
                    Some(Ok(event)) => self.route(&event),
                    Some(Err(e)) => {
                        self.metrics.record_watch_error();
                        tracing::error!("[hot-reload] file watch error: {e}");
                    }
                    None => {
                        crate::debug_event!("hot-reload", "event channel closed");
                        break;
                    }
                },
            }
        }
        crate::debug_event!("hot-reload", "dispatch finished");
    }

    fn route(&self, event: &Event) {
        for change in ChangeEvent::from_notify(event) {
            // Subdirectories of watched directories are not watched themselves
            if !change.is_relevant() || !self.watch_set.covers(&change.path) {
                self.metrics.record_ignored();
                crate::debug_event!("hot-reload", "ignored", "{}", change.path.display());
                continue;
            }
            self.metrics.record_event();

            let pipeline = Arc::clone(&self.pipeline);
            let reloads = self.reloads.clone();
            let scope = self.scope.clone();
            let shutdown = self.shutdown.clone();
            self.debouncer.schedule(change, move |settled| {
                if shutdown.is_cancelled() {
                    return;
                }
                reloads.spawn_blocking(move || {
                    scope.in_scope(|| {
                        pipeline.process(&settled);
                    })
                });
            });
        }
    }
}

/// Builder for [`HotReloader`].
#[derive(Default)]
pub struct HotReloaderBuilder {
    store: Option<Arc<PatternStore>>,
    config: HotReloadConfig,
    sink: Option<Arc<dyn ReloadSink>>,
    dispatch: Option<Dispatch>,
}

impl HotReloaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store to keep in sync. Required.
    pub fn store(mut self, store: Arc<PatternStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: HotReloadConfig) -> Self {
        self.config = config;
        self
    }

    /// Receiver for reload outcomes.
    pub fn sink(mut self, sink: Arc<dyn ReloadSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Closure receiver for reload outcomes.
    pub fn on_reload<F>(self, callback: F) -> Self
    where
        F: Fn(&ReloadOutcome) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.sink(Arc::new(callback))
    }

    /// Subscriber for this reloader's diagnostics instead of the global one.
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Build the reloader.
    ///
    /// Fails with [`WatchError::NoPatternsDirectory`] when no store was given
    /// or the store has no backing directory.
    pub fn build(self) -> Result<HotReloader, WatchError> {
        let store = self.store.ok_or(WatchError::NoPatternsDirectory)?;
        if store.root().is_none() {
            return Err(WatchError::NoPatternsDirectory);
        }

        let scope = LogScope::new(self.dispatch);
        let metrics = Arc::new(ReloadMetrics::new());
        let pipeline = Arc::new(ReloadPipeline::new(
            Arc::clone(&store),
            self.sink,
            Arc::clone(&metrics),
        ));
        let debouncer = Debouncer::new(self.config.debounce()).with_scope(scope.clone());

        Ok(HotReloader {
            store,
            config: self.config,
            pipeline,
            debouncer,
            metrics,
            scope,
            shutdown: CancellationToken::new(),
            reloads: TaskTracker::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: LifecycleState::Idle,
                active: None,
            }),
        })
    }
}
