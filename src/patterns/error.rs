//! Error types for pattern loading and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Why a candidate file was refused by the validation gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Failed to read pattern file: {reason}")]
    Unreadable { reason: String },

    #[error("Failed to parse pattern: {reason}")]
    Malformed { reason: String },

    #[error("pattern.name is required")]
    MissingName,

    #[error("pattern.category is required")]
    MissingCategory,
}

impl ValidationError {
    /// Short machine-readable label, used as the `validation.result` span field.
    pub fn label(&self) -> &'static str {
        match self {
            ValidationError::Unreadable { .. } => "load_failed",
            ValidationError::Malformed { .. } => "parse_failed",
            ValidationError::MissingName => "missing_name",
            ValidationError::MissingCategory => "missing_category",
        }
    }
}

/// Errors from the pattern store.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Pattern not found: {0}")]
    NotFound(String),

    #[error("Pattern path outside patterns directory: {0}")]
    OutsideRoot(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pattern {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

pub type PatternResult<T> = Result<T, PatternError>;
