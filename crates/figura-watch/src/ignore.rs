//! Ignore windows for self-inflicted changes.
//!
//! After the coordinator touches a document it registers a window during
//! which events for that document are dropped, so the touch does not
//! trigger another pass.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct IgnoreWindows {
    until: HashMap<PathBuf, Instant>,
}

impl IgnoreWindows {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore events for `path` until `now + window`.
    pub fn register(&mut self, path: PathBuf, now: Instant, window: Duration) {
        self.until.insert(path, now + window);
    }

    /// Whether events for `path` are currently ignored.
    ///
    /// Expired windows are dropped as they are looked up.
    pub fn is_ignored(&mut self, path: &Path, now: Instant) -> bool {
        match self.until.get(path) {
            Some(&until) if now < until => true,
            Some(_) => {
                self.until.remove(path);
                false
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.until.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.until.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_expires() {
        let mut windows = IgnoreWindows::new();
        let path = PathBuf::from("/docs/guide.md");
        let start = Instant::now();

        windows.register(path.clone(), start, Duration::from_millis(100));

        assert!(windows.is_ignored(&path, start + Duration::from_millis(50)));
        assert!(!windows.is_ignored(Path::new("/docs/other.md"), start));
        assert!(!windows.is_ignored(&path, start + Duration::from_millis(100)));
        assert!(windows.is_empty());
    }

    #[test]
    fn test_register_extends_window() {
        let mut windows = IgnoreWindows::new();
        let path = PathBuf::from("/docs/guide.md");
        let start = Instant::now();

        windows.register(path.clone(), start, Duration::from_millis(100));
        windows.register(path.clone(), start + Duration::from_millis(80), Duration::from_millis(100));

        assert!(windows.is_ignored(&path, start + Duration::from_millis(150)));
        assert_eq!(windows.len(), 1);
    }
}
