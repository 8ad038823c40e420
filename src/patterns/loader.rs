//! Reading pattern files and the validation gate.
//!
//! A file only becomes a [`Pattern`] in the store after it parses and passes
//! [`validate`]. Warnings never block a load; they are returned to the caller
//! so they can be logged next to the reload that produced them.

use std::fmt;
use std::path::Path;

use super::error::ValidationError;
use super::types::Pattern;

/// Extensions recognized as pattern files.
pub const PATTERN_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Non-blocking findings from the validation gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// A backend function with nothing showing how to call it.
    BackendFunctionWithoutUsage { backend_function: String },
    /// A template whose body is blank.
    EmptyTemplate { template: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::BackendFunctionWithoutUsage { backend_function } => write!(
                f,
                "backend_function '{backend_function}' has no templates or examples"
            ),
            ValidationWarning::EmptyTemplate { template } => {
                write!(f, "template '{template}' is empty")
            }
        }
    }
}

/// A parsed pattern that passed validation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub pattern: Pattern,
    pub warnings: Vec<ValidationWarning>,
}

/// Whether `path` looks like a pattern file rather than an editor artifact.
///
/// Swap files, backups (`~`), in-flight temp files (`.tmp`) and dotfiles are
/// rejected even when they carry a YAML extension.
pub fn is_pattern_file(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PATTERN_EXTENSIONS.contains(&ext));
    if !has_extension {
        return false;
    }

    let Some(base) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    !(base.contains(".tmp") || base.contains('~') || base.starts_with('.'))
}

/// Pattern name implied by a file path: the file stem.
pub fn pattern_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse YAML bytes into a pattern without validating it.
pub fn parse_pattern(data: &[u8]) -> Result<Pattern, ValidationError> {
    serde_yaml::from_slice(data).map_err(|e| ValidationError::Malformed {
        reason: e.to_string(),
    })
}

/// Enforce required fields and collect warnings.
pub fn validate(pattern: &Pattern) -> Result<Vec<ValidationWarning>, ValidationError> {
    if pattern.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if pattern.category.trim().is_empty() {
        return Err(ValidationError::MissingCategory);
    }

    let mut warnings = Vec::new();
    if pattern.has_backend_function() && pattern.templates.is_empty() && pattern.examples.is_empty()
    {
        warnings.push(ValidationWarning::BackendFunctionWithoutUsage {
            backend_function: pattern.backend_function.clone(),
        });
    }
    for (name, template) in &pattern.templates {
        if template.body().trim().is_empty() {
            warnings.push(ValidationWarning::EmptyTemplate {
                template: name.clone(),
            });
        }
    }

    Ok(warnings)
}

/// Read, parse and validate the file at `path`.
pub fn load_candidate(path: &Path) -> Result<Candidate, ValidationError> {
    let data = std::fs::read(path).map_err(|e| ValidationError::Unreadable {
        reason: e.to_string(),
    })?;
    let pattern = parse_pattern(&data)?;
    let warnings = validate(&pattern)?;
    Ok(Candidate { pattern, warnings })
}
