//! Coordinator state.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use crate::ignore::IgnoreWindows;

/// Where the coordinator is in its cycle.
///
/// `Idle -> Debouncing -> Stabilizing -> Generating -> Idle`, re-entering
/// `Debouncing` straight from `Generating` when a rerun was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Collecting events until `deadline` passes without a new one.
    Debouncing { deadline: Instant },
    /// Waiting for changed files to stop changing.
    Stabilizing,
    /// A pass is running.
    Generating,
}

/// Mutable state owned by the coordinator.
#[derive(Debug)]
pub struct WatchState {
    pub phase: Phase,
    /// Paths changed since the last pass started.
    pub pending: BTreeSet<PathBuf>,
    /// An event arrived while a pass was running.
    pub rerun_requested: bool,
    pub ignore: IgnoreWindows,
}

impl WatchState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            pending: BTreeSet::new(),
            rerun_requested: false,
            ignore: IgnoreWindows::new(),
        }
    }

    /// In-flight flag: true while a pass is stabilizing or generating.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        matches!(self.phase, Phase::Stabilizing | Phase::Generating)
    }
}

impl Default for WatchState {
    fn default() -> Self {
        Self::new()
    }
}
