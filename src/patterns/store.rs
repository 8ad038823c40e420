//! In-memory pattern store shared by readers and the reload pipeline.
//!
//! # Concurrency
//!
//! One `parking_lot::RwLock` guards the name→pattern mapping, the path
//! bookkeeping and the search index slot. Patterns are `Arc`s, so readers
//! clone a pointer and release the lock immediately; a replacement swaps the
//! pointer and never touches a pattern a reader already holds.
//!
//! The index is valid only for the generation it was built from. Every write
//! bumps the generation and empties the slot under the same exclusive lock. A
//! reader that finds the slot empty snapshots the mapping under the shared
//! lock, builds the index with no lock held, and installs it only if no write
//! happened in between. Either way it answers from an index that matches one
//! complete snapshot.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::error::{PatternError, PatternResult};
use super::loader::{self, PATTERN_EXTENSIONS};
use super::search::SearchIndex;
use super::types::{Pattern, PatternSummary};

#[derive(Debug, Default)]
struct StoreInner {
    patterns: HashMap<String, Arc<Pattern>>,
    /// name -> file that currently provides it
    sources: HashMap<String, PathBuf>,
    /// name -> every file declaring it, oldest first
    providers: HashMap<String, Vec<PathBuf>>,
    /// file -> name it declares, whether or not it owns that name
    files: HashMap<PathBuf, String>,
    /// Bumped on every mutation.
    generation: u64,
    /// `Some` only while it matches `generation`.
    index: Option<Arc<SearchIndex>>,
}

impl StoreInner {
    fn invalidate(&mut self) {
        self.generation += 1;
        self.index = None;
    }

    fn owns(&self, name: &str, path: &Path) -> bool {
        self.sources.get(name).map(PathBuf::as_path) == Some(path)
    }

    /// Forget `path` as a provider of `name`.
    fn unlink(&mut self, name: &str, path: &Path) {
        if let Some(paths) = self.providers.get_mut(name) {
            paths.retain(|p| p != path);
            if paths.is_empty() {
                self.providers.remove(name);
            }
        }
    }

    /// Drop `name` from the mapping if `path` owns it.
    fn release(&mut self, name: &str, path: &Path) -> Option<Arc<Pattern>> {
        if !self.owns(name, path) {
            return None;
        }
        self.sources.remove(name);
        self.patterns.remove(name)
    }
}

/// Result of inserting or replacing the pattern provided by one file.
#[derive(Debug, Clone, Default)]
pub struct Upsert {
    /// Previous pattern stored under the same name.
    pub replaced: Option<Arc<Pattern>>,
    /// Name this file provided before, if the edit renamed the pattern.
    pub renamed_from: Option<String>,
    /// Another file that provided the same name until now.
    pub shadowed: Option<PathBuf>,
    /// File that took over `renamed_from` after this one gave it up.
    pub promoted: Option<PathBuf>,
}

/// Result of removing the pattern provided by one file.
#[derive(Debug, Clone, Default)]
pub struct Removal {
    /// Name the file declared, if the store knew the file.
    pub name: Option<String>,
    /// Pattern dropped from the mapping.
    pub removed: Option<Arc<Pattern>>,
    /// File that now provides `name` in place of the removed one.
    pub promoted: Option<PathBuf>,
}

/// Outcome of the initial directory scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Authoritative cache of loaded patterns plus the derived search index.
#[derive(Debug)]
pub struct PatternStore {
    root: Option<PathBuf>,
    search_paths: Vec<String>,
    inner: RwLock<StoreInner>,
}

impl PatternStore {
    /// Store backed by a patterns directory.
    ///
    /// The root is canonicalized when it exists so paths reported by the
    /// filesystem watcher compare equal to paths found by [`scan`](Self::scan).
    pub fn new(root: impl Into<PathBuf>, search_paths: Vec<String>) -> Self {
        let root = root.into();
        let root = std::fs::canonicalize(&root).unwrap_or(root);
        Self {
            root: Some(root),
            search_paths,
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Store with no backing directory.
    pub fn in_memory() -> Self {
        Self {
            root: None,
            search_paths: Vec::new(),
            inner: RwLock::new(StoreInner::default()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn search_paths(&self) -> &[String] {
        &self.search_paths
    }

    /// Load every valid pattern file under the root.
    ///
    /// Invalid files are logged and skipped; only an unreadable root fails.
    pub fn scan(&self) -> PatternResult<ScanReport> {
        let mut report = ScanReport::default();
        let Some(root) = &self.root else {
            return Ok(report);
        };
        if !root.is_dir() {
            return Err(PatternError::Io {
                path: root.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "patterns directory does not exist",
                ),
            });
        }

        let files = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("[store] skipping unreadable entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && loader::is_pattern_file(entry.path()));

        for entry in files {
            let path = entry.path();
            match loader::load_candidate(path) {
                Ok(candidate) => {
                    for warning in &candidate.warnings {
                        tracing::warn!(
                            "[store] {}: {warning}",
                            candidate.pattern.name
                        );
                    }
                    let upsert = self.upsert(path, Arc::new(candidate.pattern));
                    if let Some(other) = upsert.shadowed {
                        tracing::warn!(
                            "[store] {} overrides pattern defined in {}",
                            path.display(),
                            other.display()
                        );
                    }
                    report.loaded += 1;
                }
                Err(e) => {
                    tracing::warn!("[store] skipping {}: {e}", path.display());
                    report.skipped += 1;
                }
            }
        }

        crate::log_event!(
            "store",
            "scanned",
            "{} loaded, {} skipped in {}",
            report.loaded,
            report.skipped,
            root.display()
        );
        Ok(report)
    }

    /// Cached pattern by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<Pattern>> {
        self.inner.read().patterns.get(name).cloned()
    }

    /// Cached pattern by name, falling back to the filesystem.
    ///
    /// A pattern found on disk passes the validation gate and is cached.
    pub fn load(&self, name: &str) -> PatternResult<Arc<Pattern>> {
        if let Some(pattern) = self.lookup(name) {
            return Ok(pattern);
        }
        if !is_plain_name(name) {
            return Err(PatternError::OutsideRoot(name.to_string()));
        }

        let path = self
            .find_file(name)
            .ok_or_else(|| PatternError::NotFound(name.to_string()))?;
        let candidate = loader::load_candidate(&path).map_err(|source| PatternError::Invalid {
            path: path.clone(),
            source,
        })?;

        let pattern = Arc::new(candidate.pattern);
        self.upsert(&path, Arc::clone(&pattern));
        crate::debug_event!("store", "loaded from disk", "{}", path.display());
        Ok(pattern)
    }

    /// Every location a pattern called `name` may live at, in lookup order:
    /// the root first, then each search path.
    pub fn candidate_paths(&self, name: &str) -> Vec<PathBuf> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        std::iter::once(root.clone())
            .chain(self.search_paths.iter().map(|sub| root.join(sub)))
            .flat_map(|dir| {
                PATTERN_EXTENSIONS
                    .iter()
                    .map(move |ext| dir.join(format!("{name}.{ext}")))
            })
            .collect()
    }

    /// First existing file for `name`.
    pub fn find_file(&self, name: &str) -> Option<PathBuf> {
        if !is_plain_name(name) {
            return None;
        }
        self.candidate_paths(name).into_iter().find(|p| p.is_file())
    }

    /// Summaries of every pattern, sorted by name.
    pub fn list_all(&self) -> Vec<PatternSummary> {
        self.index().all()
    }

    /// Free-text search over names, titles, descriptions and use cases.
    pub fn search(&self, query: &str) -> Vec<PatternSummary> {
        self.index().search(query)
    }

    pub fn filter_by_category(&self, category: &str) -> Vec<PatternSummary> {
        self.index().filter_by(category, |s| &s.category)
    }

    pub fn filter_by_backend_type(&self, backend_type: &str) -> Vec<PatternSummary> {
        self.index().filter_by(backend_type, |s| &s.backend_type)
    }

    pub fn filter_by_difficulty(&self, difficulty: &str) -> Vec<PatternSummary> {
        self.index().filter_by(difficulty, |s| &s.difficulty)
    }

    /// Sorted pattern names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().patterns.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.read().patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().patterns.is_empty()
    }

    /// Whether the search index currently matches the mapping.
    pub fn index_valid(&self) -> bool {
        self.inner.read().index.is_some()
    }

    /// Whether `path` has been loaded and still declares a stored or shadowed
    /// pattern.
    pub fn knows_path(&self, path: &Path) -> bool {
        self.inner.read().files.contains_key(path)
    }

    /// Name provided by the file at `path`.
    pub fn name_for_path(&self, path: &Path) -> Option<String> {
        self.inner.read().files.get(path).cloned()
    }

    /// File that provides `name`.
    pub fn path_for_name(&self, name: &str) -> Option<PathBuf> {
        self.inner.read().sources.get(name).cloned()
    }

    /// Insert or replace the pattern provided by `path`.
    ///
    /// The mapping and the index validity change together under one
    /// exclusive lock. When the file gave up a name it owned, the next file
    /// still declaring that name takes over.
    pub fn upsert(&self, path: &Path, pattern: Arc<Pattern>) -> Upsert {
        let name = pattern.name.clone();
        let mut result = Upsert::default();
        let mut released = None;

        {
            let mut inner = self.inner.write();

            // The file used to provide a different name
            if let Some(previous) = inner.files.get(path).cloned() {
                if previous != name {
                    inner.unlink(&previous, path);
                    if inner.release(&previous, path).is_some() {
                        released = Some(previous.clone());
                    }
                    result.renamed_from = Some(previous);
                }
            }

            // Another file provided this name: it stays known but loses ownership
            if let Some(other) = inner.sources.get(&name).cloned() {
                if other != path {
                    result.shadowed = Some(other);
                }
            }

            let providers = inner.providers.entry(name.clone()).or_default();
            providers.retain(|p| p != path);
            providers.push(path.to_path_buf());

            result.replaced = inner.patterns.insert(name.clone(), pattern);
            inner.sources.insert(name.clone(), path.to_path_buf());
            inner.files.insert(path.to_path_buf(), name);
            inner.invalidate();
        }

        if let Some(previous) = released {
            result.promoted = self.promote(&previous);
        }
        result
    }

    /// Remove whatever pattern the file at `path` provides.
    ///
    /// The index is invalidated even when the file was unknown. When the file
    /// owned its name and another file still declares it, that file takes
    /// over.
    pub fn remove_path(&self, path: &Path) -> Removal {
        let mut result = Removal::default();

        {
            let mut inner = self.inner.write();
            if let Some(name) = inner.files.remove(path) {
                inner.unlink(&name, path);
                result.removed = inner.release(&name, path);
                result.name = Some(name);
            }
            inner.invalidate();
        }

        if let (Some(name), Some(_)) = (&result.name, &result.removed) {
            result.promoted = self.promote(name);
        }
        result
    }

    /// Hand an unowned `name` to the newest file still declaring it.
    ///
    /// Candidates are re-read from disk. One that no longer parses or no
    /// longer declares `name` is forgotten and the next one is tried.
    fn promote(&self, name: &str) -> Option<PathBuf> {
        loop {
            let path = {
                let inner = self.inner.read();
                if inner.patterns.contains_key(name) {
                    return None;
                }
                inner.providers.get(name)?.last()?.clone()
            };

            let loaded = loader::load_candidate(&path)
                .ok()
                .filter(|candidate| candidate.pattern.name == name);

            let mut inner = self.inner.write();
            if inner.patterns.contains_key(name) {
                return None;
            }
            if inner.files.get(&path).map(String::as_str) != Some(name) {
                // Re-declared or removed while we were reading
                inner.unlink(name, &path);
                continue;
            }
            match loaded {
                Some(candidate) => {
                    inner.patterns.insert(name.to_string(), Arc::new(candidate.pattern));
                    inner.sources.insert(name.to_string(), path.clone());
                    inner.invalidate();
                    drop(inner);
                    crate::log_event!("store", "promoted", "{name} now provided by {}", path.display());
                    return Some(path);
                }
                None => {
                    inner.files.remove(&path);
                    inner.unlink(name, &path);
                    drop(inner);
                    tracing::warn!(
                        "[store] {} no longer provides '{name}', skipping",
                        path.display()
                    );
                }
            }
        }
    }

    /// Drop every cached pattern.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        let cleared = inner.patterns.len();
        inner.patterns.clear();
        inner.sources.clear();
        inner.providers.clear();
        inner.files.clear();
        inner.invalidate();
        drop(inner);
        crate::debug_event!("store", "cleared", "{cleared} patterns");
    }

    /// Current index, rebuilding it from a snapshot when it was invalidated.
    fn index(&self) -> Arc<SearchIndex> {
        let (generation, snapshot) = {
            let inner = self.inner.read();
            if let Some(index) = &inner.index {
                return Arc::clone(index);
            }
            let snapshot: Vec<Arc<Pattern>> = inner.patterns.values().cloned().collect();
            (inner.generation, snapshot)
        };

        let index = Arc::new(SearchIndex::build(snapshot.iter()));

        let mut inner = self.inner.write();
        if inner.generation == generation && inner.index.is_none() {
            inner.index = Some(Arc::clone(&index));
            crate::debug_event!("store", "index rebuilt", "{} patterns", index.len());
        }
        index
    }
}

/// A bare file stem: no separators, no parent references.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    !name.is_empty()
        && matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    fn pattern(name: &str, category: &str) -> Arc<Pattern> {
        Arc::new(Pattern {
            name: name.to_string(),
            category: category.to_string(),
            title: format!("{name} title"),
            ..Default::default()
        })
    }

    fn write(dir: &Path, rel: &str, body: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_scan_loads_valid_and_skips_invalid() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "a.yaml", "name: a\ncategory: demo\n");
        write(temp_dir.path(), "ml/b.yml", "name: b\ncategory: ml\n");
        write(temp_dir.path(), "broken.yaml", "category: demo\n");
        write(temp_dir.path(), "notes.txt", "name: c\ncategory: demo\n");
        write(temp_dir.path(), ".hidden.yaml", "name: d\ncategory: demo\n");

        let store = PatternStore::new(temp_dir.path(), vec!["ml".to_string()]);
        let report = store.scan().unwrap();

        assert_eq!(report, ScanReport { loaded: 2, skipped: 1 });
        assert_eq!(store.names(), vec!["a", "b"]);
        assert_eq!(store.lookup("b").unwrap().category, "ml");
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = PatternStore::new(temp_dir.path().join("nope"), Vec::new());
        assert!(matches!(store.scan(), Err(PatternError::Io { .. })));
        assert!(PatternStore::in_memory().scan().unwrap().loaded == 0);
    }

    #[test]
    fn test_load_falls_back_to_filesystem() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "analytics/funnel.yaml", "name: funnel\ncategory: analytics\n");
        write(temp_dir.path(), "bad.yaml", "name: bad\n");

        let store = PatternStore::new(temp_dir.path(), vec!["analytics".to_string()]);
        assert!(store.lookup("funnel").is_none());

        let funnel = store.load("funnel").unwrap();
        assert_eq!(funnel.category, "analytics");
        assert!(store.lookup("funnel").is_some());

        assert!(matches!(store.load("missing"), Err(PatternError::NotFound(_))));
        assert!(matches!(store.load("bad"), Err(PatternError::Invalid { .. })));
        assert!(matches!(
            store.load("../etc/passwd"),
            Err(PatternError::OutsideRoot(_))
        ));
    }

    #[test]
    fn test_candidate_paths_order() {
        let store = PatternStore::new("/srv/patterns-that-do-not-exist", vec!["ml".to_string()]);
        let paths = store.candidate_paths("churn");
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/srv/patterns-that-do-not-exist/churn.yaml"),
                PathBuf::from("/srv/patterns-that-do-not-exist/churn.yml"),
                PathBuf::from("/srv/patterns-that-do-not-exist/ml/churn.yaml"),
                PathBuf::from("/srv/patterns-that-do-not-exist/ml/churn.yml"),
            ]
        );
        assert!(PatternStore::in_memory().candidate_paths("churn").is_empty());
    }

    #[test]
    fn test_upsert_invalidates_index() {
        let store = PatternStore::in_memory();
        store.upsert(Path::new("/p/a.yaml"), pattern("a", "demo"));

        assert_eq!(store.list_all().len(), 1);
        assert!(store.index_valid());

        store.upsert(Path::new("/p/b.yaml"), pattern("b", "demo"));
        assert!(!store.index_valid());
        assert_eq!(store.list_all().len(), 2);
        assert!(store.index_valid());
    }

    #[test]
    fn test_upsert_replace_and_rename() {
        let store = PatternStore::in_memory();
        let path = Path::new("/p/a.yaml");

        store.upsert(path, pattern("a", "demo"));
        let result = store.upsert(path, pattern("a", "demo2"));
        assert_eq!(result.replaced.unwrap().category, "demo");
        assert_eq!(store.lookup("a").unwrap().category, "demo2");

        // The file now declares a different name
        let result = store.upsert(path, pattern("renamed", "demo2"));
        assert_eq!(result.renamed_from.as_deref(), Some("a"));
        assert!(store.lookup("a").is_none());
        assert_eq!(store.name_for_path(path).as_deref(), Some("renamed"));
    }

    #[test]
    fn test_remove_only_drops_owned_name() {
        let store = PatternStore::in_memory();
        let first = Path::new("/p/a.yaml");
        let second = Path::new("/p/ml/a.yaml");

        store.upsert(first, pattern("a", "demo"));
        let result = store.upsert(second, pattern("a", "ml"));
        assert_eq!(result.shadowed.as_deref(), Some(first));
        assert!(store.knows_path(first));

        // The shadowed file no longer owns the name
        let removal = store.remove_path(first);
        assert_eq!(removal.name.as_deref(), Some("a"));
        assert!(removal.removed.is_none());
        assert_eq!(store.lookup("a").unwrap().category, "ml");

        let removal = store.remove_path(second);
        assert_eq!(removal.name.as_deref(), Some("a"));
        assert!(removal.removed.is_some());
        assert!(removal.promoted.is_none());
        assert!(store.lookup("a").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_removing_owner_promotes_shadowed_file() {
        let temp_dir = TempDir::new().unwrap();
        let nested = write(temp_dir.path(), "analytics/x.yaml", "name: x
category: nested
");
        let top = write(temp_dir.path(), "x.yaml", "name: x
category: top
");

        let store = PatternStore::new(temp_dir.path(), vec!["analytics".to_string()]);
        store.scan().unwrap();
        let root = store.root().unwrap().to_path_buf();
        let nested = root.join(nested.strip_prefix(temp_dir.path()).unwrap());
        let top = root.join(top.strip_prefix(temp_dir.path()).unwrap());
        assert_eq!(store.lookup("x").unwrap().category, "top");

        fs::remove_file(&top).unwrap();
        let removal = store.remove_path(&top);

        assert!(removal.removed.is_some());
        assert_eq!(removal.promoted.as_deref(), Some(nested.as_path()));
        assert_eq!(store.lookup("x").unwrap().category, "nested");
        assert_eq!(store.path_for_name("x"), Some(nested.clone()));
        assert_eq!(store.search("x").len(), 1);

        // Deleting the last provider drops the name
        fs::remove_file(&nested).unwrap();
        let removal = store.remove_path(&nested);
        assert!(removal.promoted.is_none());
        assert!(store.lookup("x").is_none());
    }

    #[test]
    fn test_promotion_skips_files_that_changed_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let stale = write(temp_dir.path(), "ml/a.yaml", "name: a
category: ml
");
        let store = PatternStore::new(temp_dir.path(), vec!["ml".to_string()]);
        let root = store.root().unwrap().to_path_buf();
        let stale = root.join(stale.strip_prefix(temp_dir.path()).unwrap());
        let owner = root.join("a.yaml");

        store.upsert(&stale, pattern("a", "ml"));
        store.upsert(&owner, pattern("a", "demo"));

        // The shadowed file was edited into an invalid one with no event yet
        fs::write(&stale, "category: ml
").unwrap();
        let removal = store.remove_path(&owner);

        assert!(removal.promoted.is_none());
        assert!(store.lookup("a").is_none());
        assert!(!store.knows_path(&stale));
    }

    #[test]
    fn test_rename_promotes_shadowed_file() {
        let temp_dir = TempDir::new().unwrap();
        let other = write(temp_dir.path(), "b.yaml", "name: a
category: other
");
        let store = PatternStore::new(temp_dir.path(), Vec::new());
        let root = store.root().unwrap().to_path_buf();
        let other = root.join(other.strip_prefix(temp_dir.path()).unwrap());
        let owner = root.join("a.yaml");

        store.upsert(&other, pattern("a", "other"));
        store.upsert(&owner, pattern("a", "demo"));

        let result = store.upsert(&owner, pattern("renamed", "demo"));
        assert_eq!(result.renamed_from.as_deref(), Some("a"));
        assert_eq!(result.promoted.as_deref(), Some(other.as_path()));
        assert_eq!(store.lookup("a").unwrap().category, "other");
        assert_eq!(store.names(), vec!["a", "renamed"]);
    }

    #[test]
    fn test_filters() {
        let store = PatternStore::in_memory();
        let mut sql = (*pattern("sql_funnel", "analytics")).clone();
        sql.backend_type = "SQL".to_string();
        sql.difficulty = "beginner".to_string();
        store.upsert(Path::new("/p/sql_funnel.yaml"), Arc::new(sql));
        store.upsert(Path::new("/p/churn.yaml"), pattern("churn", "ml"));

        assert_eq!(store.filter_by_category("Analytics").len(), 1);
        assert_eq!(store.filter_by_backend_type("sql").len(), 1);
        assert_eq!(store.filter_by_difficulty("beginner")[0].name, "sql_funnel");
        assert_eq!(store.filter_by_category("").len(), 2);

        store.clear();
        assert!(store.list_all().is_empty());
    }

    #[test]
    fn test_concurrent_readers_never_see_mixed_versions() {
        let store = Arc::new(PatternStore::in_memory());
        let path = PathBuf::from("/p/a.yaml");

        let versioned = |v: usize| {
            Arc::new(Pattern {
                name: "a".to_string(),
                category: format!("cat-{v}"),
                title: format!("title-{v}"),
                description: format!("description-{v}"),
                ..Default::default()
            })
        };
        store.upsert(&path, versioned(0));

        let writer = {
            let store = Arc::clone(&store);
            let path = path.clone();
            thread::spawn(move || {
                for v in 1..=500 {
                    store.upsert(&path, versioned(v));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let pattern = store.lookup("a").unwrap();
                        let version = pattern.category.trim_start_matches("cat-");
                        assert_eq!(pattern.title, format!("title-{version}"));
                        assert_eq!(pattern.description, format!("description-{version}"));

                        let summaries = store.search("title");
                        assert_eq!(summaries.len(), 1);
                        let version = summaries[0].category.trim_start_matches("cat-");
                        assert_eq!(summaries[0].title, format!("title-{version}"));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.lookup("a").unwrap().category, "cat-500");
    }
}
