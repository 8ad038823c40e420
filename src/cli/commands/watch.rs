//! Watch command - run hot reload in the foreground.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::config::Settings;
use crate::watcher::{HotReloader, ReloadBroadcaster, ReloadOutcome};

use super::open_store;

const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// Watch until Ctrl-C, printing one line per reload.
pub async fn run_watch(
    settings: &Settings,
    dir: Option<PathBuf>,
    debounce_ms: Option<u64>,
) -> anyhow::Result<()> {
    let store = open_store(settings, dir)?;

    let mut config = settings.hot_reload.clone();
    config.enabled = true;
    if let Some(ms) = debounce_ms {
        config.debounce_ms = ms;
    }

    let broadcaster = ReloadBroadcaster::new(OUTCOME_CHANNEL_CAPACITY);
    let mut outcomes = broadcaster.subscribe();
    let reloader = HotReloader::builder()
        .store(Arc::clone(&store))
        .config(config)
        .sink(Arc::new(broadcaster))
        .build()?;
    reloader.start()?;

    let status = reloader.status();
    println!(
        "Watching {} directories ({} patterns, debounce {}ms). Press Ctrl-C to stop.",
        status.watched_directories, status.patterns, status.debounce_ms
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            received = outcomes.recv() => match received {
                Ok(outcome) => print_outcome(&outcome),
                Err(RecvError::Lagged(missed)) => eprintln!("({missed} reload notifications dropped)"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    reloader.stop().await;
    let metrics = reloader.status().metrics;
    println!(
        "Stopped: {} created, {} modified, {} deleted, {} rejected",
        metrics.created, metrics.modified, metrics.deleted, metrics.validation_failed
    );
    Ok(())
}

fn print_outcome(outcome: &ReloadOutcome) {
    match &outcome.error {
        None => println!(
            "{:<8} {:<32} {}",
            outcome.event.as_str(),
            outcome.pattern_name,
            outcome.path.display()
        ),
        Some(e) => eprintln!(
            "{:<8} {:<32} {} ({e})",
            "rejected",
            outcome.pattern_name,
            outcome.path.display()
        ),
    }
}
