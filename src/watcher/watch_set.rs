//! Directories the hot-reloader registers with the watch backend.
//!
//! The patterns root plus one entry per configured search path, each watched
//! non-recursively. The root is mandatory; a subdirectory that is missing or
//! cannot be watched is skipped with a warning.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use notify::{RecursiveMode, Watcher};

use super::error::WatchError;

/// Ordered, de-duplicated set of watch directories.
#[derive(Debug, Clone, Default)]
pub struct WatchSet {
    root: PathBuf,
    subdirs: Vec<PathBuf>,
    registered: Vec<PathBuf>,
}

impl WatchSet {
    /// Compute the directories for `root` and its relative `search_paths`.
    ///
    /// Entries that resolve to the root itself, duplicates and paths that
    /// climb out of the root (`..`, absolute paths) are dropped.
    pub fn compute(root: &Path, search_paths: &[String]) -> Self {
        let mut seen = HashSet::new();
        seen.insert(root.to_path_buf());

        let mut subdirs = Vec::new();
        for entry in search_paths {
            let relative = Path::new(entry.as_str());
            if !stays_inside(relative) {
                crate::debug_event!("watch-set", "skipped", "{entry} escapes the patterns root");
                continue;
            }
            let dir = normalize(&root.join(relative));
            if seen.insert(dir.clone()) {
                subdirs.push(dir);
            }
        }

        Self {
            root: root.to_path_buf(),
            subdirs,
            registered: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories the backend accepted, root first.
    pub fn registered(&self) -> &[PathBuf] {
        &self.registered
    }

    pub fn watched_count(&self) -> usize {
        self.registered.len()
    }

    /// Whether events for `path` can arrive through a registered directory.
    pub fn covers(&self, path: &Path) -> bool {
        path.parent()
            .is_some_and(|parent| self.registered.iter().any(|dir| dir == parent))
    }

    /// Register every directory with `watcher`.
    ///
    /// Fails only when the root cannot be watched.
    pub fn register<W: Watcher>(&mut self, watcher: &mut W) -> Result<(), WatchError> {
        self.registered.clear();

        watcher
            .watch(&self.root, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: self.root.clone(),
                reason: e.to_string(),
            })?;
        crate::debug_event!("watcher", "watching", "{}", self.root.display());
        self.registered.push(self.root.clone());

        for dir in &self.subdirs {
            if !dir.is_dir() {
                crate::debug_event!("watcher", "absent", "{}", dir.display());
                continue;
            }
            match watcher.watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    crate::debug_event!("watcher", "watching", "{}", dir.display());
                    self.registered.push(dir.clone());
                }
                Err(e) => {
                    tracing::warn!("[watcher] failed to watch {}: {e}", dir.display());
                }
            }
        }

        Ok(())
    }
}

fn stays_inside(relative: &Path) -> bool {
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Drop `.` components so `root/./x` and `root/x` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn paths(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compute_dedups_and_drops_escapes() {
        let set = WatchSet::compute(
            Path::new("/lib/patterns"),
            &paths(&[".", "analytics", "./analytics", "../outside", "/etc", "sql/reports"]),
        );

        assert_eq!(
            set.subdirs,
            vec![
                PathBuf::from("/lib/patterns/analytics"),
                PathBuf::from("/lib/patterns/sql/reports"),
            ]
        );
        assert!(set.registered().is_empty());
    }

    #[test]
    fn test_register_skips_missing_subdirectories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir(root.join("analytics")).unwrap();

        let mut set = WatchSet::compute(&root, &paths(&["analytics", "missing"]));
        let mut watcher = notify::recommended_watcher(|_res: notify::Result<notify::Event>| {}).unwrap();
        set.register(&mut watcher).unwrap();

        assert_eq!(set.watched_count(), 2);
        assert_eq!(set.registered()[0], root);
        assert!(set.covers(&root.join("analytics").join("a.yaml")));
        assert!(!set.covers(&root.join("missing").join("a.yaml")));
    }

    #[test]
    fn test_register_fails_without_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("gone");

        let mut set = WatchSet::compute(&root, &[]);
        let mut watcher = notify::recommended_watcher(|_res: notify::Result<notify::Event>| {}).unwrap();
        let err = set.register(&mut watcher).unwrap_err();

        assert!(matches!(err, WatchError::PathWatchFailed { .. }));
        assert_eq!(set.watched_count(), 0);
    }
}
