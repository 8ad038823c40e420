//! Reload counters.
//!
//! Lock-free counters bumped by the dispatch loop and reload tasks, read
//! through [`ReloadMetrics::snapshot`] by the status query.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::sink::OutcomeKind;

/// Thread-safe counters for the hot-reload subsystem.
#[derive(Debug, Default)]
pub struct ReloadMetrics {
    events_received: AtomicU64,
    events_ignored: AtomicU64,
    watch_errors: AtomicU64,
    created: AtomicU64,
    modified: AtomicU64,
    deleted: AtomicU64,
    validation_failed: AtomicU64,
    manual_reloads: AtomicU64,
    sink_errors: AtomicU64,
    apply_ns: AtomicU64,
}

/// Point-in-time copy of [`ReloadMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_ignored: u64,
    pub watch_errors: u64,
    pub created: u64,
    pub modified: u64,
    pub deleted: u64,
    pub validation_failed: u64,
    pub manual_reloads: u64,
    pub sink_errors: u64,
    /// Total time spent validating and applying reloads.
    pub apply_ms: u64,
}

impl MetricsSnapshot {
    /// Reload decisions of any kind.
    pub fn outcomes(&self) -> u64 {
        self.created + self.modified + self.deleted + self.validation_failed
    }
}

impl ReloadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pattern-file event accepted for debouncing.
    pub fn record_event(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event dropped by the file filter.
    pub fn record_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_watch_error(&self) {
        self.watch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_manual_reload(&self) {
        self.manual_reloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed reload decision and how long it took.
    pub fn record_outcome(&self, kind: OutcomeKind, elapsed: std::time::Duration) {
        let counter = match kind {
            OutcomeKind::Create => &self.created,
            OutcomeKind::Modify => &self.modified,
            OutcomeKind::Delete => &self.deleted,
            OutcomeKind::ValidationFailed => &self.validation_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.apply_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            watch_errors: self.watch_errors.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            modified: self.modified.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            validation_failed: self.validation_failed.load(Ordering::Relaxed),
            manual_reloads: self.manual_reloads.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
            apply_ms: self.apply_ns.load(Ordering::Relaxed) / 1_000_000,
        }
    }
}
