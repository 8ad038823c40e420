//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod init;
pub mod patterns;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::config::Settings;
use crate::patterns::PatternStore;

/// Patterns directory from the CLI flag, falling back to the settings.
pub fn patterns_dir(settings: &Settings, dir: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    dir.or_else(|| settings.patterns.dir.clone()).context(
        "no patterns directory configured (pass --dir, set patterns.dir or PK_PATTERNS__DIR)",
    )
}

/// Open and scan the store for `dir`.
pub fn open_store(settings: &Settings, dir: Option<PathBuf>) -> anyhow::Result<Arc<PatternStore>> {
    let dir = patterns_dir(settings, dir)?;
    let store = PatternStore::new(&dir, settings.patterns.search_paths.clone());
    let report = store
        .scan()
        .with_context(|| format!("failed to scan {}", dir.display()))?;
    if report.skipped > 0 {
        eprintln!(
            "Loaded {} patterns ({} invalid files skipped, run `patternkit check`)",
            report.loaded, report.skipped
        );
    }
    Ok(Arc::new(store))
}
