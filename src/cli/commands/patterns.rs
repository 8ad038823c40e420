//! Library commands: reload, status, search, show, check.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use walkdir::WalkDir;

use crate::config::Settings;
use crate::patterns::loader::{is_pattern_file, load_candidate};
use crate::patterns::{PatternSummary, truncate_description};
use crate::watcher::HotReloader;

use super::{open_store, patterns_dir};

/// Reload one pattern from disk, bypassing the debouncer.
pub fn run_reload(settings: &Settings, dir: Option<PathBuf>, name: &str) -> anyhow::Result<()> {
    let store = open_store(settings, dir)?;
    let reloader = HotReloader::new(store, settings.hot_reload.clone())?;

    let outcome = reloader.manual_reload(name)?;
    println!(
        "Reloaded {} ({}) from {}",
        outcome.pattern_name,
        outcome.event.as_str(),
        outcome.path.display()
    );
    Ok(())
}

/// Static view of the library and its hot-reload settings.
///
/// Nothing is watched by this command, so live fields (watched directories,
/// pending timers, counters) belong to a running `watch` and are left out.
#[derive(Debug, Serialize)]
struct StatusView {
    patterns_dir: Option<PathBuf>,
    search_paths: Vec<String>,
    patterns: usize,
    hot_reload_enabled: bool,
    debounce_ms: u64,
}

/// Hot-reload configuration plus what the library currently holds.
pub fn run_status(settings: &Settings, dir: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let store = open_store(settings, dir)?;
    let reloader = HotReloader::new(Arc::clone(&store), settings.hot_reload.clone())?;
    let status = reloader.status();
    let view = StatusView {
        patterns_dir: store.root().map(PathBuf::from),
        search_paths: store.search_paths().to_vec(),
        patterns: status.patterns,
        hot_reload_enabled: status.enabled,
        debounce_ms: status.debounce_ms,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let root = view
        .patterns_dir
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    println!("Patterns directory: {root}");
    println!("Patterns loaded:    {}", view.patterns);
    println!(
        "Hot reload:         {}",
        if view.hot_reload_enabled { "enabled" } else { "disabled" }
    );
    println!("Debounce:           {}ms", view.debounce_ms);
    println!("Search paths:       {}", view.search_paths.join(", "));
    Ok(())
}

pub struct SearchArgs {
    pub query: String,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub backend: Option<String>,
    pub json: bool,
}

/// Keyword search with optional exact-field filters.
pub fn run_search(settings: &Settings, dir: Option<PathBuf>, args: SearchArgs) -> anyhow::Result<()> {
    let store = open_store(settings, dir)?;

    let mut results = store.search(&args.query);
    if let Some(category) = &args.category {
        results.retain(|s| s.category.eq_ignore_ascii_case(category));
    }
    if let Some(difficulty) = &args.difficulty {
        results.retain(|s| s.difficulty.eq_ignore_ascii_case(difficulty));
    }
    if let Some(backend) = &args.backend {
        results.retain(|s| s.backend_type.eq_ignore_ascii_case(backend));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No patterns match '{}'", args.query);
        return Ok(());
    }
    for summary in &results {
        print_summary(summary);
    }
    println!("\n{} patterns", results.len());
    Ok(())
}

fn print_summary(summary: &PatternSummary) {
    println!(
        "{:<32} {:<16} {}",
        summary.name,
        summary.category,
        truncate_description(&summary.description, 60)
    );
}

/// Print the full definition of one pattern.
pub fn run_show(settings: &Settings, dir: Option<PathBuf>, name: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(settings, dir)?;
    let pattern = store.load(name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(pattern.as_ref())?);
    } else {
        print!("{}", serde_yaml::to_string(pattern.as_ref())?);
    }
    Ok(())
}

/// Validate every pattern file under the patterns directory.
pub fn run_check(settings: &Settings, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let root = patterns_dir(settings, dir)?;
    let mut checked = 0usize;
    let mut failed = 0usize;

    let files = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_pattern_file(entry.path()));

    for entry in files {
        checked += 1;
        let path = entry.path();
        let relative = path.strip_prefix(&root).unwrap_or(path);
        match load_candidate(path) {
            Ok(candidate) => {
                println!("ok    {}", relative.display());
                for warning in &candidate.warnings {
                    println!("      warning: {warning}");
                }
            }
            Err(e) => {
                failed += 1;
                println!("FAIL  {} [{}] {e}", relative.display(), e.label());
            }
        }
    }

    println!("\n{checked} files checked, {failed} failed");
    if failed > 0 {
        anyhow::bail!("{failed} invalid pattern files");
    }
    Ok(())
}
