//! Per-path debouncing of file change events.
//!
//! Editors rarely write a file once: auto-save, formatters and atomic-save
//! renames produce bursts. Each path gets its own cancellable timer; a new
//! event for the path aborts the pending timer and starts another, so a
//! reload only runs once the path has been quiet for the whole window.
//!
//! The timer table has its own lock, held only to insert, replace or remove
//! an entry. Paths never wait on each other.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::event::ChangeEvent;
use super::scope::LogScope;

/// Pending timer for one path.
#[derive(Debug)]
struct PendingTimer {
    /// Identifies the timer that currently owns the entry.
    ticket: u64,
    handle: JoinHandle<()>,
}

/// Debounces change events by path.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<HashMap<PathBuf, PendingTimer>>>,
    next_ticket: Arc<AtomicU64>,
    scope: LogScope,
}

impl Debouncer {
    /// Create a debouncer with a fixed quiet window.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: Arc::new(AtomicU64::new(0)),
            scope: LogScope::default(),
        }
    }

    pub(crate) fn with_scope(mut self, scope: LogScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record an event, (re)starting the timer for its path.
    ///
    /// When the timer expires without another event for the path, `fire` is
    /// called exactly once with the most recent event. Returns `false` when
    /// no timer could be scheduled (no tokio runtime); the next event for the
    /// path schedules again.
    pub fn schedule<F>(&self, event: ChangeEvent, fire: F) -> bool
    where
        F: FnOnce(ChangeEvent) + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(
                    "[debounce] cannot schedule reload for {}: {e}",
                    event.path.display()
                );
                return false;
            }
        };

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let path = event.path.clone();
        let delay = self.delay;
        let pending = Arc::clone(&self.pending);

        let span = tracing::debug_span!(
            "patterns.hotreload.debounce",
            pattern.file = %path.display(),
            change = %event.kind,
            delay_ms = delay.as_millis() as u64,
        );

        // The table lock is held across spawn so the new timer cannot expire
        // and look for its entry before the entry exists.
        let mut table = self.pending.lock();
        let handle = self.scope.spawn(
            &runtime,
            async move {
                tokio::time::sleep(delay).await;

                let owned = {
                    let mut table = pending.lock();
                    match table.get(&event.path) {
                        Some(timer) if timer.ticket == ticket => {
                            table.remove(&event.path);
                            true
                        }
                        _ => false,
                    }
                };
                if owned {
                    crate::debug_event!("debounce", "settled", "{}", event.path.display());
                    fire(event);
                }
            }
            .instrument(span),
        );

        if let Some(previous) = table.insert(path.clone(), PendingTimer { ticket, handle }) {
            previous.handle.abort();
            crate::debug_event!("debounce", "rescheduled", "{}", path.display());
        }
        true
    }

    /// Abort every pending timer without firing it. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingTimer> = {
            let mut table = self.pending.lock();
            table.drain().map(|(_, timer)| timer).collect()
        };
        for timer in &drained {
            timer.handle.abort();
        }
        drained.len()
    }

    /// Check if there are any pending changes.
    pub fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Get the number of pending changes.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
