//! Live regeneration for figura.
//!
//! [`FileWatcher`] reports changes to documents and referenced sources;
//! [`WatchCoordinator`] debounces them, waits for files to settle, and runs
//! one generation pass at a time through a [`Generator`].
//!
//! # Example
//!
//! ```ignore
//! let watcher = FileWatcher::new(&content_dir, &["md".into(), "drawio".into()])?;
//! let (rx, _handle) = watcher.start()?;
//!
//! let mut coordinator = WatchCoordinator::new(generator, CoordinatorConfig::default());
//! coordinator.initial_pass();
//! coordinator.run(&rx);
//! ```

mod coordinator;
mod event;
mod ignore;
mod quiescence;
mod state;
mod watcher;

pub use coordinator::{CoordinatorConfig, Generator, PassOutcome, WatchCoordinator};
pub use event::{WatchEvent, WatchEventKind};
pub use ignore::IgnoreWindows;
pub use quiescence::{Quiescence, Thresholds, await_quiescence, fs_fingerprint};
pub use state::{Phase, WatchState};
pub use watcher::{FileWatcher, WatchHandle, WatchMode};

/// Watcher setup error.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("invalid watch pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },

    #[error("file watcher failed: {0}")]
    Notify(#[from] notify::Error),
}
