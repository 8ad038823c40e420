//! Derived search index over pattern metadata.
//!
//! The index is immutable once built. The store rebuilds a fresh one from a
//! snapshot after every mutation instead of patching it in place.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use super::types::{Pattern, PatternSummary};

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with",
];

const NAME_BOOST: f64 = 0.5;
const TITLE_BOOST: f64 = 0.3;

#[derive(Debug)]
struct IndexEntry {
    summary: PatternSummary,
    /// Lowercased name, title, description, backend function and use cases.
    haystack: String,
    name_lower: String,
    title_lower: String,
}

/// Search index built from one consistent snapshot of the store.
#[derive(Debug, Default)]
pub struct SearchIndex {
    /// Sorted by pattern name.
    entries: Vec<IndexEntry>,
}

impl SearchIndex {
    /// Build an index from a snapshot of patterns.
    pub fn build<'a>(patterns: impl IntoIterator<Item = &'a Arc<Pattern>>) -> Self {
        let mut entries: Vec<IndexEntry> = patterns
            .into_iter()
            .map(|pattern| {
                let mut haystack = format!(
                    "{} {} {} {}",
                    pattern.name, pattern.title, pattern.description, pattern.backend_function
                );
                for use_case in &pattern.use_cases {
                    haystack.push(' ');
                    haystack.push_str(use_case);
                }
                IndexEntry {
                    summary: pattern.summary(),
                    haystack: haystack.to_lowercase(),
                    name_lower: pattern.name.to_lowercase(),
                    title_lower: pattern.title.to_lowercase(),
                }
            })
            .collect();
        entries.sort_by(|a, b| a.summary.name.cmp(&b.summary.name));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All summaries, sorted by name.
    pub fn all(&self) -> Vec<PatternSummary> {
        self.entries.iter().map(|e| e.summary.clone()).collect()
    }

    /// Summaries whose field selected by `field` equals `value`, ignoring case.
    /// An empty `value` matches everything.
    pub fn filter_by<F>(&self, value: &str, field: F) -> Vec<PatternSummary>
    where
        F: Fn(&PatternSummary) -> &str,
    {
        if value.is_empty() {
            return self.all();
        }
        let value = value.to_lowercase();
        self.entries
            .iter()
            .filter(|e| field(&e.summary).to_lowercase() == value)
            .map(|e| e.summary.clone())
            .collect()
    }

    /// Free-text search, best matches first.
    ///
    /// An empty query returns every pattern.
    pub fn search(&self, query: &str) -> Vec<PatternSummary> {
        if query.trim().is_empty() {
            return self.all();
        }

        let keywords = keywords(query);
        let mut scored: Vec<(f64, usize, &IndexEntry)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let match_count = keywords
                    .iter()
                    .filter(|kw| entry.haystack.contains(kw.as_str()))
                    .count();
                if match_count == 0 {
                    return None;
                }

                let mut score = match_count as f64 / keywords.len() as f64;
                for keyword in &keywords {
                    if entry.name_lower.contains(keyword.as_str()) {
                        score += NAME_BOOST;
                    }
                    if entry.title_lower.contains(keyword.as_str()) {
                        score += TITLE_BOOST;
                    }
                }
                Some((score, match_count, entry))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.2.summary.name.cmp(&b.2.summary.name))
        });

        scored.into_iter().map(|(_, _, e)| e.summary.clone()).collect()
    }
}

/// Split a query into lowercase keywords, dropping stop words and very short terms.
/// Falls back to the whole lowercased query when nothing useful remains.
fn keywords(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();

    let mut seen = HashSet::new();
    let filtered: Vec<String> = lower
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '-' | '_'))
        .filter(|kw| kw.len() > 2 && !stop.contains(kw))
        .filter(|kw| seen.insert(*kw))
        .map(str::to_string)
        .collect();

    if filtered.is_empty() {
        vec![lower.trim().to_string()]
    } else {
        filtered
    }
}
