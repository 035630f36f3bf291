//! File stability detection.
//!
//! Editors and export tools often write a file in several steps. Before a
//! pass reads changed files, [`await_quiescence`] polls their fingerprints
//! until nothing has changed for a quiet period.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, UNIX_EPOCH};

/// Lower bound for the quiescence timeout.
const MIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait, and how often to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Files must stay unchanged this long.
    pub quiet: Duration,
    /// Give up waiting after this long.
    pub timeout: Duration,
    /// Interval between fingerprint checks.
    pub poll: Duration,
}

impl Thresholds {
    /// Thresholds with the default timeout of `max(quiet * 10, 2s)`.
    #[must_use]
    pub fn new(quiet: Duration, poll: Duration) -> Self {
        Self {
            quiet,
            timeout: (quiet * 10).max(MIN_TIMEOUT),
            poll,
        }
    }
}

/// How waiting ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quiescence {
    Settled,
    /// Files kept changing; the caller proceeds anyway.
    TimedOut,
}

/// Block until every path's fingerprint is unchanged for `thresholds.quiet`.
///
/// `fingerprint` returns `None` for missing files; a file disappearing or
/// appearing counts as a change.
pub fn await_quiescence<F>(paths: &[PathBuf], mut fingerprint: F, thresholds: Thresholds) -> Quiescence
where
    F: FnMut(&Path) -> Option<String>,
{
    let mut snapshot = |paths: &[PathBuf]| -> Vec<Option<String>> {
        paths.iter().map(|p| fingerprint(p)).collect()
    };

    let start = Instant::now();
    let mut last = snapshot(paths);
    let mut last_change = start;

    loop {
        let now = Instant::now();
        if now.duration_since(last_change) >= thresholds.quiet {
            return Quiescence::Settled;
        }
        if now.duration_since(start) >= thresholds.timeout {
            tracing::warn!(
                files = paths.len(),
                timeout_ms = thresholds.timeout.as_millis(),
                "files still changing, proceeding anyway"
            );
            return Quiescence::TimedOut;
        }

        thread::sleep(thresholds.poll);

        let current = snapshot(paths);
        if current != last {
            last = current;
            last_change = Instant::now();
        }
    }
}

/// `size:mtime` fingerprint of a file, `None` if it cannot be read.
#[must_use]
pub fn fs_fingerprint(path: &Path) -> Option<String> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos());
    Some(format!("{}:{modified}", metadata.len()))
}
