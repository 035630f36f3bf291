//! Watch event types.

use std::path::PathBuf;

/// Kind of file change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Modified,
    Removed,
}

impl WatchEventKind {
    /// Map a notify event kind; access and metadata-less events yield `None`.
    pub(crate) fn from_notify(kind: &notify::EventKind) -> Option<Self> {
        match kind {
            notify::EventKind::Create(_) => Some(Self::Created),
            notify::EventKind::Modify(_) => Some(Self::Modified),
            notify::EventKind::Remove(_) => Some(Self::Removed),
            _ => None,
        }
    }
}

/// A change to a tracked file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    /// Absolute path of the changed file.
    pub path: PathBuf,
    pub kind: WatchEventKind,
}
