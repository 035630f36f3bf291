//! Filesystem-backed asset store.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::Theme;

/// Subdirectory holding path-keyed aliases.
const DEV_DIR: &str = "dev";

/// Asset file extension.
const ASSET_EXT: &str = "svg";

/// Error raised by [`AssetStore`] operations.
#[derive(Debug, thiserror::Error)]
#[error("failed to {action} {}: {source}", path.display())]
pub struct StoreError {
    action: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl StoreError {
    fn new(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Path the failed operation targeted.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Theme-partitioned asset store rooted at a directory on disk.
///
/// Writes are atomic: content goes to a temporary file in the target
/// directory and is renamed into place, so readers never observe a partially
/// written asset.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory containing hashed assets for `theme`.
    #[must_use]
    pub fn theme_dir(&self, theme: Theme) -> PathBuf {
        self.root.join(theme.as_str())
    }

    /// Directory containing dev aliases for `theme`.
    #[must_use]
    pub fn dev_dir(&self, theme: Theme) -> PathBuf {
        self.theme_dir(theme).join(DEV_DIR)
    }

    /// Location of the hashed asset `{theme}/{hash}.svg`.
    #[must_use]
    pub fn asset_path(&self, theme: Theme, hash: &str) -> PathBuf {
        self.theme_dir(theme).join(format!("{hash}.{ASSET_EXT}"))
    }

    /// Location of the alias `{theme}/dev/{key}.svg`.
    #[must_use]
    pub fn alias_path(&self, theme: Theme, key: &str) -> PathBuf {
        self.dev_dir(theme).join(format!("{key}.{ASSET_EXT}"))
    }

    /// Create the theme directories, and the `dev/` ones when `dev` is set.
    pub fn ensure_layout(&self, dev: bool) -> Result<(), StoreError> {
        for theme in Theme::ALL {
            let dir = if dev {
                self.dev_dir(theme)
            } else {
                self.theme_dir(theme)
            };
            fs::create_dir_all(&dir).map_err(|e| StoreError::new("create", &dir, e))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, theme: Theme, hash: &str) -> bool {
        self.asset_path(theme, hash).is_file()
    }

    /// Read a hashed asset as text. Returns `None` if it does not exist.
    pub fn read(&self, theme: Theme, hash: &str) -> Result<Option<String>, StoreError> {
        let path = self.asset_path(theme, hash);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::new("read", &path, e)),
        }
    }

    /// Atomically write a hashed asset, replacing any previous content.
    pub fn write(&self, theme: Theme, hash: &str, contents: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.asset_path(theme, hash);
        write_atomic(&path, contents)?;
        tracing::debug!(path = %path.display(), "wrote asset");
        Ok(path)
    }

    /// Copy the hashed asset to the alias for `key`.
    ///
    /// Returns `false` without touching the alias when the hashed asset does
    /// not exist.
    pub fn publish_alias(&self, theme: Theme, hash: &str, key: &str) -> Result<bool, StoreError> {
        let source = self.asset_path(theme, hash);
        let contents = match fs::read(&source) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(StoreError::new("read", &source, e)),
        };
        write_atomic(&self.alias_path(theme, key), &contents)?;
        Ok(true)
    }

    /// Delete hashed assets whose hash is not in `keep`.
    ///
    /// Only `*.svg` files directly inside the theme directories are
    /// candidates; `dev/` and anything else is left alone. Returns the number
    /// of files removed.
    pub fn prune(&self, keep: &HashSet<String>) -> Result<usize, StoreError> {
        let mut removed = 0;
        for theme in Theme::ALL {
            removed += remove_assets(&self.theme_dir(theme), |stem| !keep.contains(stem))?;
        }
        if removed > 0 {
            tracing::info!(removed, "pruned stale assets");
        }
        Ok(removed)
    }

    /// Delete `*.svg` files directly in the store root.
    ///
    /// These come from the single-set layout that predates theme
    /// partitioning and are never referenced by current URLs.
    pub fn prune_legacy(&self) -> Result<usize, StoreError> {
        let removed = remove_assets(&self.root, |_| true)?;
        if removed > 0 {
            tracing::info!(removed, "removed legacy assets from store root");
        }
        Ok(removed)
    }
}

/// Remove `*.svg` files directly in `dir` whose stem matches `predicate`.
fn remove_assets(dir: &Path, predicate: impl Fn(&str) -> bool) -> Result<usize, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(StoreError::new("list", dir, e)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::new("list", dir, e))?;
        let path = entry.path();
        let is_file = entry.file_type().is_ok_and(|t| t.is_file());
        if !is_file || path.extension().and_then(|e| e.to_str()) != Some(ASSET_EXT) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !predicate(stem) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::new("remove", &path, e)),
        }
    }
    Ok(removed)
}

/// Write `contents` to a temp file beside `path`, then rename it into place.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StoreError::new("create", dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::new("create", dir, e))?;
    tmp.write_all(contents)
        .map_err(|e| StoreError::new("write", tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::new("rename into", path, e.error))?;
    Ok(())
}
