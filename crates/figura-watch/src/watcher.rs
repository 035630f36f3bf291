//! File system watcher.
//!
//! Forwards changes to tracked files over a channel. All scheduling happens
//! on the receiving side; the watcher thread only filters and sends.

use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use glob::Pattern;
use notify::{PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};

use crate::WatchError;
use crate::event::{WatchEvent, WatchEventKind};

/// Directory never reported.
const SKIPPED_DIR: &str = "node_modules";

/// Which watcher implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Native OS notifications.
    Native,
    /// Periodic scanning, for file systems without native events.
    Poll { interval: Duration },
}

/// Keeps the underlying watcher alive. Dropping it stops watching and
/// closes the event channel.
pub struct WatchHandle {
    _watcher: Box<dyn Watcher + Send>,
}

/// Watches a directory tree for changes to files with tracked extensions.
#[derive(Debug, Clone)]
pub struct FileWatcher {
    root: PathBuf,
    patterns: Vec<Pattern>,
    mode: WatchMode,
}

impl FileWatcher {
    /// Watch `root` for files whose extension is in `extensions` (without dots).
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Result<Self, WatchError> {
        let patterns = extensions
            .iter()
            .map(|ext| {
                let glob = format!("**/*.{ext}");
                Pattern::new(&glob).map_err(|e| WatchError::Pattern {
                    pattern: glob,
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root: root.into(),
            patterns,
            mode: WatchMode::Native,
        })
    }

    #[must_use]
    pub fn mode(mut self, mode: WatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether a change to `path` should be reported.
    #[must_use]
    pub fn is_tracked(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        if relative
            .components()
            .any(|c| matches!(c, Component::Normal(name) if name == SKIPPED_DIR))
        {
            return false;
        }
        self.patterns.iter().any(|p| p.matches_path(relative))
    }

    /// Start watching. Events arrive on the returned receiver until the
    /// handle is dropped.
    pub fn start(&self) -> Result<(mpsc::Receiver<WatchEvent>, WatchHandle), WatchError> {
        let (tx, rx) = mpsc::channel();
        let filter = self.clone();

        let handler = move |res: Result<notify::Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "watch error");
                    return;
                }
            };
            let Some(kind) = WatchEventKind::from_notify(&event.kind) else {
                return;
            };
            for path in event.paths {
                if filter.is_tracked(&path) {
                    // Receiver gone means the coordinator stopped
                    let _ = tx.send(WatchEvent { path, kind });
                }
            }
        };

        let mut watcher: Box<dyn Watcher + Send> = match self.mode {
            WatchMode::Native => Box::new(RecommendedWatcher::new(handler, notify::Config::default())?),
            WatchMode::Poll { interval } => Box::new(PollWatcher::new(
                handler,
                notify::Config::default().with_poll_interval(interval),
            )?),
        };
        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        tracing::info!(root = %self.root.display(), mode = ?self.mode, "watching for changes");
        Ok((rx, WatchHandle { _watcher: watcher }))
    }
}
