//! Pattern data model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest description kept in a [`PatternSummary`].
pub const SUMMARY_DESCRIPTION_LEN: usize = 200;

/// A named, categorized behavior definition loaded from a YAML file.
///
/// Every field defaults so that partially written files still parse and the
/// validation gate, not the deserializer, decides whether they are usable.
/// Instances are shared as `Arc<Pattern>` and never mutated after loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pattern {
    pub name: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub backend_type: String,
    /// Backend function this pattern wraps, if any.
    pub backend_function: String,
    pub use_cases: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub templates: BTreeMap<String, Template>,
    pub examples: Vec<Example>,
    pub related_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    pub description: String,
    pub content: String,
    /// Older files put the body under `sql`.
    pub sql: String,
    pub required_parameters: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_yaml::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Example {
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, serde_yaml::Value>,
    pub expected_result: String,
}

/// Lightweight view of a pattern used by listings and search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub name: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub backend_type: String,
    pub use_cases: Vec<String>,
    pub backend_function: String,
}

impl Template {
    /// Template body: `content`, falling back to `sql`.
    pub fn body(&self) -> &str {
        if self.content.trim().is_empty() {
            &self.sql
        } else {
            &self.content
        }
    }
}

impl Pattern {
    pub fn has_backend_function(&self) -> bool {
        !self.backend_function.trim().is_empty()
    }

    pub fn summary(&self) -> PatternSummary {
        PatternSummary {
            name: self.name.clone(),
            title: self.title.clone(),
            description: truncate_description(&self.description, SUMMARY_DESCRIPTION_LEN),
            category: self.category.clone(),
            difficulty: self.difficulty.clone(),
            backend_type: self.backend_type.clone(),
            use_cases: self.use_cases.clone(),
            backend_function: self.backend_function.clone(),
        }
    }
}

/// Truncate to at most `max_len` characters, marking the cut with `...`.
pub fn truncate_description(desc: &str, max_len: usize) -> String {
    if desc.chars().count() <= max_len {
        return desc.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut truncated: String = desc.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}
