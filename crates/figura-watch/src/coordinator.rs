//! Watch coordinator.
//!
//! Turns a stream of file events into generation passes:
//!
//! 1. An event for a non-ignored path enters `Debouncing` and (re)arms the
//!    debounce deadline.
//! 2. When the deadline passes, `Stabilizing` waits for the changed files to
//!    stop changing.
//! 3. `Generating` runs exactly one pass. Events arriving meanwhile are
//!    queued and request a rerun.
//! 4. Documents depending on a changed source file are touched so the site
//!    picks up the new render, and their own change events are ignored for a
//!    short window.
//!
//! Pass failures are logged and the coordinator keeps watching.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant, SystemTime};

use crate::event::WatchEvent;
use crate::quiescence::{Thresholds, await_quiescence, fs_fingerprint};
use crate::state::{Phase, WatchState};

/// Idle wait between deadline checks when nothing is scheduled.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

/// Result of a successful pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// Referenced source file to the documents referencing it.
    pub references: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

/// Runs one generation pass.
pub trait Generator {
    type Error: fmt::Display;

    fn generate(&mut self) -> Result<PassOutcome, Self::Error>;
}

/// Coordinator timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub debounce: Duration,
    /// Quiet period before changed files count as stable.
    pub stable: Duration,
    pub stable_poll: Duration,
    /// How long events for touched documents are ignored.
    pub ignore: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            stable: Duration::from_millis(600),
            stable_poll: Duration::from_millis(150),
            ignore: Duration::from_millis(1500),
        }
    }
}

/// Single-flight scheduler of generation passes.
pub struct WatchCoordinator<G: Generator> {
    generator: G,
    config: CoordinatorConfig,
    state: WatchState,
    references: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    passes: usize,
}

impl<G: Generator> WatchCoordinator<G> {
    #[must_use]
    pub fn new(generator: G, config: CoordinatorConfig) -> Self {
        Self {
            generator,
            config,
            state: WatchState::new(),
            references: BTreeMap::new(),
            passes: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Passes attempted so far, failed ones included.
    #[must_use]
    pub fn passes(&self) -> usize {
        self.passes
    }

    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Run the start-up pass.
    pub fn initial_pass(&mut self) {
        self.state.phase = Phase::Generating;
        self.generate();
        self.finish(Instant::now());
    }

    /// Feed one changed path. Returns whether the event was queued.
    pub fn handle_event(&mut self, path: PathBuf, now: Instant) -> bool {
        if self.state.ignore.is_ignored(&path, now) {
            tracing::debug!(path = %path.display(), "ignoring self-inflicted change");
            return false;
        }

        self.state.pending.insert(path);
        match self.state.phase {
            Phase::Idle | Phase::Debouncing { .. } => {
                self.state.phase = Phase::Debouncing {
                    deadline: now + self.config.debounce,
                };
            }
            Phase::Stabilizing | Phase::Generating => {
                self.state.rerun_requested = true;
            }
        }
        true
    }

    /// When the coordinator next needs to act, if ever.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state.phase {
            Phase::Debouncing { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Start a pass if the debounce deadline has passed.
    ///
    /// `rx` is drained for events that arrive while the pass runs.
    /// Returns whether a pass ran.
    pub fn tick(&mut self, now: Instant, rx: Option<&Receiver<WatchEvent>>) -> bool {
        match self.state.phase {
            Phase::Debouncing { deadline } if now >= deadline => {}
            _ => return false,
        }

        let changed = std::mem::take(&mut self.state.pending);
        self.state.rerun_requested = false;

        self.state.phase = Phase::Stabilizing;
        let paths: Vec<PathBuf> = changed.iter().cloned().collect();
        await_quiescence(
            &paths,
            fs_fingerprint,
            Thresholds::new(self.config.stable, self.config.stable_poll),
        );

        self.state.phase = Phase::Generating;
        tracing::info!(changed = changed.len(), "change detected, regenerating diagrams");
        let succeeded = self.generate();

        if let Some(rx) = rx {
            while let Ok(event) = rx.try_recv() {
                self.handle_event(event.path, Instant::now());
            }
        }

        let now = Instant::now();
        if succeeded {
            self.touch_dependents(&changed, now);
        }
        self.finish(now);
        true
    }

    /// Process events until the channel closes.
    pub fn run(&mut self, rx: &Receiver<WatchEvent>) {
        loop {
            let wait = self
                .next_deadline()
                .map_or(IDLE_WAIT, |d| d.saturating_duration_since(Instant::now()));

            match rx.recv_timeout(wait) {
                Ok(event) => {
                    tracing::debug!(path = %event.path.display(), kind = ?event.kind, "file changed");
                    self.handle_event(event.path, Instant::now());
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("watch channel closed");
                    return;
                }
            }

            self.tick(Instant::now(), Some(rx));
        }
    }

    /// Run one pass, keeping its references on success.
    fn generate(&mut self) -> bool {
        self.passes += 1;
        let started = Instant::now();
        match self.generator.generate() {
            Ok(outcome) => {
                tracing::info!(
                    elapsed_ms = started.elapsed().as_millis(),
                    "diagram pass complete"
                );
                self.references = outcome.references;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "diagram pass failed");
                false
            }
        }
    }

    /// Touch documents that reference a changed source.
    fn touch_dependents(&mut self, changed: &BTreeSet<PathBuf>, now: Instant) {
        for source in changed {
            let Some(documents) = self.references.get(source) else {
                continue;
            };
            for document in documents {
                if !document.exists() {
                    continue;
                }
                match touch(document) {
                    Ok(()) => {
                        tracing::debug!(document = %document.display(), "touched dependent document");
                        self.state
                            .ignore
                            .register(document.clone(), now, self.config.ignore);
                    }
                    Err(e) => {
                        tracing::warn!(document = %document.display(), error = %e, "failed to touch document");
                    }
                }
            }
        }
    }

    /// Leave `Generating`.
    fn finish(&mut self, now: Instant) {
        self.state.phase = if self.state.rerun_requested {
            self.state.rerun_requested = false;
            Phase::Debouncing {
                deadline: now + self.config.debounce,
            }
        } else {
            Phase::Idle
        };
    }
}

/// Set a file's modification time to now.
fn touch(path: &Path) -> std::io::Result<()> {
    let file = File::options().write(true).open(path)?;
    file.set_modified(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::mpsc;
    use std::thread;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::event::WatchEventKind;

    /// Counts passes and returns fixed references.
    struct CountingGenerator {
        references: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
        /// Passes that succeed before every later one fails.
        fail_after: usize,
        calls: usize,
    }

    impl CountingGenerator {
        fn new() -> Self {
            Self {
                references: BTreeMap::new(),
                fail_after: usize::MAX,
                calls: 0,
            }
        }
    }

    impl Generator for CountingGenerator {
        type Error = String;

        fn generate(&mut self) -> Result<PassOutcome, String> {
            self.calls += 1;
            if self.calls > self.fail_after {
                return Err("puml exited with status 1".to_owned());
            }
            Ok(PassOutcome {
                references: self.references.clone(),
            })
        }
    }

    fn fast_config() -> CoordinatorConfig {
        CoordinatorConfig {
            debounce: Duration::from_millis(20),
            stable: Duration::from_millis(5),
            stable_poll: Duration::from_millis(1),
            ignore: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_burst_coalesces_into_one_pass() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("guide.md");
        fs::write(&doc, "x").unwrap();
        let mut coordinator = WatchCoordinator::new(CountingGenerator::new(), fast_config());
        let start = Instant::now();

        for offset in [0, 5, 10] {
            assert!(coordinator.handle_event(doc.clone(), start + Duration::from_millis(offset)));
        }

        assert_eq!(
            coordinator.next_deadline(),
            Some(start + Duration::from_millis(30))
        );
        assert!(!coordinator.tick(start + Duration::from_millis(25), None));
        assert!(coordinator.tick(start + Duration::from_millis(30), None));
        assert!(!coordinator.tick(start + Duration::from_millis(60), None));

        assert_eq!(coordinator.generator().calls, 1);
        assert_eq!(coordinator.state().phase, Phase::Idle);
        assert!(coordinator.state().pending.is_empty());
    }

    #[test]
    fn test_dependents_touched_and_ignored() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("flow.drawio");
        let doc = tmp.path().join("guide.md");
        let other = tmp.path().join("other.md");
        fs::write(&source, "<mxfile/>").unwrap();
        fs::write(&doc, "x").unwrap();
        fs::write(&other, "y").unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        File::options()
            .write(true)
            .open(&doc)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let mut generator = CountingGenerator::new();
        generator
            .references
            .insert(source.clone(), BTreeSet::from([doc.clone()]));
        let mut coordinator = WatchCoordinator::new(generator, fast_config());
        coordinator.initial_pass();

        let start = Instant::now();
        coordinator.handle_event(source.clone(), start);
        assert!(coordinator.tick(start + Duration::from_millis(20), None));

        let touched = fs::metadata(&doc).unwrap().modified().unwrap();
        assert!(touched > old);

        let now = Instant::now();
        assert!(!coordinator.handle_event(doc.clone(), now));
        assert_eq!(coordinator.next_deadline(), None);
        assert!(coordinator.handle_event(other, now));
        assert_eq!(coordinator.generator().calls, 2);
    }

    #[test]
    fn test_event_during_pass_requests_rerun() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("guide.md");
        fs::write(&doc, "x").unwrap();
        let (tx, rx) = mpsc::channel();
        let mut coordinator = WatchCoordinator::new(CountingGenerator::new(), fast_config());

        let start = Instant::now();
        coordinator.handle_event(doc.clone(), start);
        tx.send(WatchEvent {
            path: doc.clone(),
            kind: WatchEventKind::Modified,
        })
        .unwrap();

        assert!(coordinator.tick(start + Duration::from_millis(20), Some(&rx)));

        assert!(matches!(coordinator.state().phase, Phase::Debouncing { .. }));
        assert!(!coordinator.state().rerun_requested);
        assert_eq!(coordinator.state().pending, BTreeSet::from([doc]));

        let deadline = coordinator.next_deadline().unwrap();
        assert!(coordinator.tick(deadline, Some(&rx)));
        assert_eq!(coordinator.generator().calls, 2);
        assert_eq!(coordinator.state().phase, Phase::Idle);
    }

    #[test]
    fn test_failed_pass_keeps_watching() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("guide.md");
        fs::write(&doc, "x").unwrap();
        let mut generator = CountingGenerator::new();
        generator.fail_after = 0;
        let mut coordinator = WatchCoordinator::new(generator, fast_config());

        coordinator.initial_pass();
        let start = Instant::now();
        coordinator.handle_event(doc, start);
        assert!(coordinator.tick(start + Duration::from_millis(20), None));

        assert_eq!(coordinator.passes(), 2);
        assert_eq!(coordinator.state().phase, Phase::Idle);
    }

    #[test]
    fn test_failed_pass_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("flow.drawio");
        let doc = tmp.path().join("guide.md");
        fs::write(&source, "<mxfile/>").unwrap();
        fs::write(&doc, "x").unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        File::options()
            .write(true)
            .open(&doc)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let mut generator = CountingGenerator::new();
        generator
            .references
            .insert(source.clone(), BTreeSet::from([doc.clone()]));
        generator.fail_after = 1;
        let mut coordinator = WatchCoordinator::new(generator, fast_config());
        coordinator.initial_pass();

        let start = Instant::now();
        coordinator.handle_event(source, start);
        assert!(coordinator.tick(start + Duration::from_millis(20), None));

        assert_eq!(coordinator.passes(), 2);
        assert_eq!(fs::metadata(&doc).unwrap().modified().unwrap(), old);
        assert!(coordinator.handle_event(doc, Instant::now()));
    }

    #[test]
    fn test_run_exits_when_channel_closes() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("guide.md");
        fs::write(&doc, "x").unwrap();
        let (tx, rx) = mpsc::channel();

        let sender = thread::spawn(move || {
            for _ in 0..3 {
                tx.send(WatchEvent {
                    path: doc.clone(),
                    kind: WatchEventKind::Modified,
                })
                .unwrap();
            }
            thread::sleep(Duration::from_millis(200));
        });

        let mut coordinator = WatchCoordinator::new(CountingGenerator::new(), fast_config());
        coordinator.run(&rx);
        sender.join().unwrap();

        assert_eq!(coordinator.generator().calls, 1);
    }
}
