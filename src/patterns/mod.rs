//! Pattern library: data model, loading, validation, search and the shared store.
//!
//! # Architecture
//!
//! ```text
//! YAML file --load_candidate--> Candidate --upsert--> PatternStore
//!                 (validate)                          |  name -> Arc<Pattern>
//!                                                     |  path bookkeeping
//!                                                     +- SearchIndex (rebuilt lazily)
//! ```

mod error;
pub mod loader;
mod search;
mod store;
mod types;

pub use error::{PatternError, PatternResult, ValidationError};
pub use loader::{Candidate, ValidationWarning, is_pattern_file, pattern_name_from_path};
pub use search::SearchIndex;
pub use store::{PatternStore, Removal, ScanReport, Upsert};
pub use types::{Example, Parameter, Pattern, PatternSummary, Template, truncate_description};
