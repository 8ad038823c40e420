//! Change events fed from the filesystem watcher into the debouncer.

use std::fmt;
use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

use crate::patterns::is_pattern_file;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mutation of one path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Translate a raw `notify` event into change events.
    ///
    /// A rename is a removal of the old path. The new path is only picked up
    /// when the backend reports it separately (`RenameMode::To`) or as the
    /// second path of a `RenameMode::Both` pair; backends that report an
    /// ambiguous rename leave the new file unnoticed until its next write.
    pub fn from_notify(event: &Event) -> Vec<ChangeEvent> {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                let mut events = Vec::with_capacity(2);
                if let Some(from) = event.paths.first() {
                    events.push(ChangeEvent::new(from.clone(), ChangeKind::Removed));
                }
                if let Some(to) = event.paths.get(1) {
                    events.push(ChangeEvent::new(to.clone(), ChangeKind::Created));
                }
                return events;
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Created,
            EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Removed,
            EventKind::Modify(_) => ChangeKind::Modified,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
        };

        event
            .paths
            .iter()
            .map(|path| ChangeEvent::new(path.clone(), kind))
            .collect()
    }

    /// Whether the event concerns a pattern file.
    pub fn is_relevant(&self) -> bool {
        is_pattern_file(&self.path)
    }
}
