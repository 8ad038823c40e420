//! Reload outcomes and the sink trait that receives them.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;

use serde::Serialize;

use crate::patterns::ValidationError;

/// Kind of completed reload decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Create,
    Modify,
    Delete,
    ValidationFailed,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Create => "create",
            OutcomeKind::Modify => "modify",
            OutcomeKind::Delete => "delete",
            OutcomeKind::ValidationFailed => "validation_failed",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one reload decision, handed to the sink and then dropped.
///
/// `error` is `Some` exactly when `event` is [`OutcomeKind::ValidationFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadOutcome {
    pub event: OutcomeKind,
    pub pattern_name: String,
    pub path: PathBuf,
    pub error: Option<ValidationError>,
}

impl ReloadOutcome {
    pub fn applied(event: OutcomeKind, pattern_name: String, path: PathBuf) -> Self {
        Self {
            event,
            pattern_name,
            path,
            error: None,
        }
    }

    pub fn rejected(pattern_name: String, path: PathBuf, error: ValidationError) -> Self {
        Self {
            event: OutcomeKind::ValidationFailed,
            pattern_name,
            path,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Receiver of reload outcomes.
///
/// Called synchronously on the reload task after the store already reflects
/// the decision. Errors and panics are caught and logged by the caller; they
/// never undo a committed change.
pub trait ReloadSink: Send + Sync {
    fn notify(&self, outcome: &ReloadOutcome) -> anyhow::Result<()>;
}

impl<F> ReloadSink for F
where
    F: Fn(&ReloadOutcome) -> anyhow::Result<()> + Send + Sync,
{
    fn notify(&self, outcome: &ReloadOutcome) -> anyhow::Result<()> {
        self(outcome)
    }
}

/// Why a sink did not accept an outcome.
#[derive(Debug)]
pub(crate) enum DeliveryError {
    Failed(anyhow::Error),
    Panicked(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Failed(e) => write!(f, "sink returned error: {e:#}"),
            DeliveryError::Panicked(msg) => write!(f, "sink panicked: {msg}"),
        }
    }
}

/// Hand an outcome to a sink inside its own panic boundary.
pub(crate) fn deliver(sink: &dyn ReloadSink, outcome: &ReloadOutcome) -> Result<(), DeliveryError> {
    match catch_unwind(AssertUnwindSafe(|| sink.notify(outcome))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DeliveryError::Failed(e)),
        Err(payload) => Err(DeliveryError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
