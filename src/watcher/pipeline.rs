//! Validate-then-apply processing of settled change events.
//!
//! Every settled event walks the same state machine:
//!
//! ```text
//! Detected -> Validating -> Applying -> Notified
//!                  \
//!                   +-----> Rejected -> Notified
//! Detected -> Applying -> Notified            (removals)
//! ```
//!
//! A rejected file never touches the store, so the last good version keeps
//! serving reads. The sink is called once per event after the store already
//! reflects the decision.
//!
//! Runs for the same path are serialized: a run reads the file only after
//! the previous run for that path has applied, so older content never lands
//! last.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::field;

use crate::patterns::loader::load_candidate;
use crate::patterns::{Candidate, PatternStore, ValidationError, pattern_name_from_path};

use super::event::{ChangeEvent, ChangeKind};
use super::metrics::ReloadMetrics;
use super::sink::{OutcomeKind, ReloadOutcome, ReloadSink, deliver};

/// Where a single reload currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadPhase {
    Detected,
    Validating,
    Applying,
    Rejected,
    Notified,
}

impl ReloadPhase {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_advance_to(self, next: ReloadPhase) -> bool {
        use ReloadPhase::*;
        matches!(
            (self, next),
            (Detected, Validating)
                | (Detected, Applying)
                | (Validating, Applying)
                | (Validating, Rejected)
                | (Applying, Notified)
                | (Rejected, Notified)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReloadPhase::Detected => "detected",
            ReloadPhase::Validating => "validating",
            ReloadPhase::Applying => "applying",
            ReloadPhase::Rejected => "rejected",
            ReloadPhase::Notified => "notified",
        }
    }
}

/// Phase tracker for one event.
struct ReloadRun<'a> {
    path: &'a Path,
    phase: ReloadPhase,
}

impl<'a> ReloadRun<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            phase: ReloadPhase::Detected,
        }
    }

    fn advance(&mut self, next: ReloadPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal reload transition {} -> {}",
            self.phase.as_str(),
            next.as_str()
        );
        tracing::trace!(
            "[reload] {} {} -> {}",
            self.path.display(),
            self.phase.as_str(),
            next.as_str()
        );
        self.phase = next;
    }
}

/// One lock per path with a run in flight.
#[derive(Debug, Default)]
struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    fn acquire(&self, path: &Path) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.lock().entry(path.to_path_buf()).or_default())
    }

    fn release(&self, path: &Path, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        drop(lock);
        if locks.get(path).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(path);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Turns settled change events into store updates and sink notifications.
pub struct ReloadPipeline {
    store: Arc<PatternStore>,
    sink: Option<Arc<dyn ReloadSink>>,
    metrics: Arc<ReloadMetrics>,
    in_flight: PathLocks,
}

impl ReloadPipeline {
    pub fn new(
        store: Arc<PatternStore>,
        sink: Option<Arc<dyn ReloadSink>>,
        metrics: Arc<ReloadMetrics>,
    ) -> Self {
        Self {
            store,
            sink,
            metrics,
            in_flight: PathLocks::default(),
        }
    }

    pub fn metrics(&self) -> &Arc<ReloadMetrics> {
        &self.metrics
    }

    /// Process one settled event end to end and return its outcome.
    ///
    /// Blocks while another run for the same path is in flight.
    pub fn process(&self, event: &ChangeEvent) -> ReloadOutcome {
        let lock = self.in_flight.acquire(&event.path);
        let outcome = {
            let _serial = lock.lock();
            self.run(event)
        };
        self.in_flight.release(&event.path, lock);
        outcome
    }

    fn run(&self, event: &ChangeEvent) -> ReloadOutcome {
        let started = Instant::now();
        let mut run = ReloadRun::new(&event.path);

        let outcome = match event.kind {
            ChangeKind::Removed => {
                run.advance(ReloadPhase::Applying);
                self.apply_delete(&event.path)
            }
            ChangeKind::Created | ChangeKind::Modified => {
                run.advance(ReloadPhase::Validating);
                match self.validate(&event.path) {
                    Ok(candidate) => {
                        run.advance(ReloadPhase::Applying);
                        self.apply_upsert(&event.path, candidate)
                    }
                    Err(error) => {
                        run.advance(ReloadPhase::Rejected);
                        self.reject(&event.path, error)
                    }
                }
            }
        };

        self.metrics.record_outcome(outcome.event, started.elapsed());
        self.notify(&outcome);
        run.advance(ReloadPhase::Notified);
        outcome
    }

    fn validate(&self, path: &Path) -> Result<Candidate, ValidationError> {
        let span = tracing::info_span!(
            "patterns.hotreload.validate",
            pattern.file = %path.display(),
            pattern.name = field::Empty,
            validation.result = field::Empty,
            duration_ms = field::Empty,
        );
        let _guard = span.enter();
        let started = Instant::now();

        let result = load_candidate(path);
        match &result {
            Ok(candidate) => {
                span.record("pattern.name", candidate.pattern.name.as_str());
                span.record("validation.result", "ok");
                for warning in &candidate.warnings {
                    tracing::warn!(
                        pattern = %candidate.pattern.name,
                        file = %path.display(),
                        "[reload] validation warning: {warning}"
                    );
                }
            }
            Err(e) => {
                span.record("validation.result", e.label());
            }
        }
        span.record("duration_ms", started.elapsed().as_millis() as u64);
        result
    }

    fn apply_upsert(&self, path: &Path, candidate: Candidate) -> ReloadOutcome {
        let name = candidate.pattern.name.clone();
        let span = tracing::info_span!(
            "patterns.hotreload.apply",
            pattern.name = %name,
            pattern.file = %path.display(),
            duration_ms = field::Empty,
        );
        let _guard = span.enter();
        let started = Instant::now();

        let kind = if self.store.knows_path(path) {
            OutcomeKind::Modify
        } else {
            OutcomeKind::Create
        };
        let upsert = self.store.upsert(path, Arc::new(candidate.pattern));

        if let Some(previous) = &upsert.renamed_from {
            crate::log_event!("reload", "renamed", "{previous} -> {name} ({})", path.display());
        }
        if let Some(other) = &upsert.shadowed {
            tracing::warn!(
                "[reload] pattern '{name}' now provided by {} instead of {}",
                path.display(),
                other.display()
            );
        }
        if let (Some(previous), Some(successor)) = (&upsert.renamed_from, &upsert.promoted) {
            crate::log_event!("reload", "restored", "{previous} from {}", successor.display());
        }
        span.record("duration_ms", started.elapsed().as_millis() as u64);

        tracing::info!(
            pattern = %name,
            file = %path.display(),
            event = kind.as_str(),
            "[reload] pattern {}",
            if kind == OutcomeKind::Create { "created" } else { "reloaded" }
        );
        ReloadOutcome::applied(kind, name, path.to_path_buf())
    }

    fn apply_delete(&self, path: &Path) -> ReloadOutcome {
        let span = tracing::info_span!(
            "patterns.hotreload.delete",
            pattern.file = %path.display(),
            pattern.name = field::Empty,
            duration_ms = field::Empty,
        );
        let _guard = span.enter();
        let started = Instant::now();

        let removal = self.store.remove_path(path);
        if let Some(successor) = &removal.promoted {
            crate::log_event!(
                "reload",
                "restored",
                "{} from {}",
                removal.name.as_deref().unwrap_or_default(),
                successor.display()
            );
        }
        let name = removal
            .name
            .unwrap_or_else(|| pattern_name_from_path(path));
        span.record("pattern.name", name.as_str());
        span.record("duration_ms", started.elapsed().as_millis() as u64);

        tracing::info!(
            pattern = %name,
            file = %path.display(),
            event = OutcomeKind::Delete.as_str(),
            "[reload] pattern removed"
        );
        ReloadOutcome::applied(OutcomeKind::Delete, name, path.to_path_buf())
    }

    fn reject(&self, path: &Path, error: ValidationError) -> ReloadOutcome {
        let name = self
            .store
            .name_for_path(path)
            .unwrap_or_else(|| pattern_name_from_path(path));
        let kept = self.store.knows_path(path);

        tracing::error!(
            pattern = %name,
            file = %path.display(),
            event = OutcomeKind::ValidationFailed.as_str(),
            error = %error,
            "[reload] validation failed, {}",
            if kept { "keeping previous version" } else { "file not loaded" }
        );
        ReloadOutcome::rejected(name, path.to_path_buf(), error)
    }

    fn notify(&self, outcome: &ReloadOutcome) {
        let Some(sink) = &self.sink else {
            return;
        };
        let span = tracing::debug_span!(
            "patterns.hotreload.notify",
            pattern.name = %outcome.pattern_name,
            pattern.file = %outcome.path.display(),
            event = outcome.event.as_str(),
        );
        let _guard = span.enter();

        if let Err(e) = deliver(sink.as_ref(), outcome) {
            self.metrics.record_sink_error();
            tracing::error!(
                pattern = %outcome.pattern_name,
                event = outcome.event.as_str(),
                "[reload] {e}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        root: PathBuf,
        store: Arc<PatternStore>,
        seen: Arc<Mutex<Vec<ReloadOutcome>>>,
        pipeline: ReloadPipeline,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let store = Arc::new(PatternStore::new(&root, Vec::new()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let sink = move |outcome: &ReloadOutcome| -> anyhow::Result<()> {
            recorder.lock().push(outcome.clone());
            Ok(())
        };
        let pipeline = ReloadPipeline::new(
            Arc::clone(&store),
            Some(Arc::new(sink)),
            Arc::new(ReloadMetrics::new()),
        );
        Fixture {
            _temp: temp,
            root,
            store,
            seen,
            pipeline,
        }
    }

    fn write(path: &Path, name: &str, description: &str) {
        fs::write(
            path,
            format!("name: {name}\ncategory: demo\ndescription: {description}\n"),
        )
        .unwrap();
    }

    #[test]
    fn test_transitions() {
        use ReloadPhase::*;
        assert!(Detected.can_advance_to(Validating));
        assert!(Detected.can_advance_to(Applying));
        assert!(Validating.can_advance_to(Rejected));
        assert!(Rejected.can_advance_to(Notified));
        assert!(!Rejected.can_advance_to(Applying));
        assert!(!Notified.can_advance_to(Detected));
        assert!(!Detected.can_advance_to(Notified));
    }

    #[test]
    fn test_create_modify_reject_delete() {
        let fx = fixture();
        let file = fx.root.join("a.yaml");

        write(&file, "demo", "first");
        let created = fx.pipeline.process(&ChangeEvent::new(&file, ChangeKind::Created));
        assert_eq!(created.event, OutcomeKind::Create);
        assert_eq!(created.pattern_name, "demo");
        assert_eq!(fx.store.lookup("demo").unwrap().description, "first");

        // The file now declares a different name: the old one goes away
        write(&file, "demo2", "second");
        let modified = fx.pipeline.process(&ChangeEvent::new(&file, ChangeKind::Modified));
        assert_eq!(modified.event, OutcomeKind::Modify);
        assert_eq!(modified.pattern_name, "demo2");
        assert!(fx.store.lookup("demo").is_none());
        assert_eq!(fx.store.lookup("demo2").unwrap().description, "second");

        fs::write(&file, "category: demo\ndescription: broken\n").unwrap();
        let rejected = fx.pipeline.process(&ChangeEvent::new(&file, ChangeKind::Modified));
        assert_eq!(rejected.event, OutcomeKind::ValidationFailed);
        assert_eq!(rejected.error, Some(ValidationError::MissingName));
        assert_eq!(rejected.pattern_name, "demo2");
        assert_eq!(fx.store.lookup("demo2").unwrap().description, "second");

        fs::remove_file(&file).unwrap();
        let deleted = fx.pipeline.process(&ChangeEvent::new(&file, ChangeKind::Removed));
        assert_eq!(deleted.event, OutcomeKind::Delete);
        assert_eq!(deleted.pattern_name, "demo2");
        assert!(fx.store.is_empty());

        let seen = fx.seen.lock();
        let kinds: Vec<_> = seen.iter().map(|o| o.event).collect();
        assert_eq!(
            kinds,
            vec![
                OutcomeKind::Create,
                OutcomeKind::Modify,
                OutcomeKind::ValidationFailed,
                OutcomeKind::Delete
            ]
        );

        let snapshot = fx.pipeline.metrics().snapshot();
        assert_eq!(snapshot.outcomes(), 4);
        assert_eq!(snapshot.validation_failed, 1);
    }

    #[test]
    fn test_malformed_new_file_is_not_loaded() {
        let fx = fixture();
        let file = fx.root.join("new.yaml");
        fs::write(&file, "name: [unclosed\n").unwrap();

        let outcome = fx.pipeline.process(&ChangeEvent::new(&file, ChangeKind::Created));

        assert_eq!(outcome.event, OutcomeKind::ValidationFailed);
        assert_eq!(outcome.pattern_name, "new");
        assert!(matches!(outcome.error, Some(ValidationError::Malformed { .. })));
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_modify_of_vanished_file_keeps_previous() {
        let fx = fixture();
        let file = fx.root.join("a.yaml");
        write(&file, "demo", "kept");
        fx.pipeline.process(&ChangeEvent::new(&file, ChangeKind::Created));

        fs::remove_file(&file).unwrap();
        let outcome = fx.pipeline.process(&ChangeEvent::new(&file, ChangeKind::Modified));

        assert!(matches!(outcome.error, Some(ValidationError::Unreadable { .. })));
        assert_eq!(fx.store.lookup("demo").unwrap().description, "kept");
    }

    #[test]
    fn test_sink_failures_do_not_undo_changes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let store = Arc::new(PatternStore::new(&root, Vec::new()));
        let metrics = Arc::new(ReloadMetrics::new());
        let sink = |_: &ReloadOutcome| -> anyhow::Result<()> { panic!("sink exploded") };
        let pipeline = ReloadPipeline::new(Arc::clone(&store), Some(Arc::new(sink)), Arc::clone(&metrics));

        let file = root.join("a.yaml");
        write(&file, "demo", "applied");
        let outcome = pipeline.process(&ChangeEvent::new(&file, ChangeKind::Created));

        assert_eq!(outcome.event, OutcomeKind::Create);
        assert!(store.lookup("demo").is_some());
        assert_eq!(metrics.snapshot().sink_errors, 1);

        // Still healthy after the panic
        write(&file, "demo", "again");
        let outcome = pipeline.process(&ChangeEvent::new(&file, ChangeKind::Modified));
        assert_eq!(outcome.event, OutcomeKind::Modify);
        assert_eq!(store.lookup("demo").unwrap().description, "again");
        assert_eq!(metrics.snapshot().sink_errors, 2);
    }

    #[test]
    fn test_delete_of_owner_restores_shadowed_file() {
        let fx = fixture();
        fs::create_dir(fx.root.join("ml")).unwrap();
        let nested = fx.root.join("ml").join("a.yaml");
        let top = fx.root.join("a.yaml");
        write(&nested, "demo", "nested");
        write(&top, "demo", "top");
        fx.pipeline.process(&ChangeEvent::new(&nested, ChangeKind::Created));
        fx.pipeline.process(&ChangeEvent::new(&top, ChangeKind::Created));
        assert_eq!(fx.store.lookup("demo").unwrap().description, "top");

        fs::remove_file(&top).unwrap();
        let deleted = fx.pipeline.process(&ChangeEvent::new(&top, ChangeKind::Removed));

        assert_eq!(deleted.event, OutcomeKind::Delete);
        assert_eq!(deleted.pattern_name, "demo");
        assert_eq!(fx.store.lookup("demo").unwrap().description, "nested");
        assert_eq!(fx.store.path_for_name("demo"), Some(nested));
    }

    #[test]
    fn test_runs_for_one_path_never_overlap() {
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
        use std::thread;
        use std::time::Duration;

        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let store = Arc::new(PatternStore::new(&root, Vec::new()));
        let active = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicBool::new(false));

        let sink = {
            let active = Arc::clone(&active);
            let overlapped = Arc::clone(&overlapped);
            move |_: &ReloadOutcome| -> anyhow::Result<()> {
                if active.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlapped.store(true, Ordering::SeqCst);
                }
                thread::sleep(Duration::from_millis(30));
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        };
        let pipeline = Arc::new(ReloadPipeline::new(
            Arc::clone(&store),
            Some(Arc::new(sink)),
            Arc::new(ReloadMetrics::new()),
        ));

        let file = root.join("a.yaml");
        write(&file, "demo", "v1");
        let runs: Vec<_> = (0..4)
            .map(|_| {
                let pipeline = Arc::clone(&pipeline);
                let file = file.clone();
                thread::spawn(move || {
                    pipeline.process(&ChangeEvent::new(&file, ChangeKind::Modified));
                })
            })
            .collect();
        for run in runs {
            run.join().unwrap();
        }

        assert!(!overlapped.load(Ordering::SeqCst));
        assert_eq!(pipeline.metrics().snapshot().outcomes(), 4);
        assert_eq!(pipeline.in_flight.len(), 0);
    }

    #[test]
    fn test_delete_of_unknown_file() {
        let fx = fixture();
        let file = fx.root.join("ghost.yaml");

        let outcome = fx.pipeline.process(&ChangeEvent::new(&file, ChangeKind::Removed));

        assert_eq!(outcome.event, OutcomeKind::Delete);
        assert_eq!(outcome.pattern_name, "ghost");
        assert!(fx.store.is_empty());
    }
}
