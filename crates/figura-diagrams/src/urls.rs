//! Asset URLs.
//!
//! Hashed assets are served at `<prefix><theme>/<hash>.svg`; in live mode
//! referenced diagrams point at `<prefix><theme>/dev/<key>.svg` instead.
//! Documents only ever carry the light URL; the dark one is derived by
//! [`to_dark_url`].

use figura_store::Theme;

use crate::declaration::{Declaration, DeclarationSource};
use crate::hash::{ContentHash, dev_alias_key};

/// Image reference replacing a diagram declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Light asset URL, base path applied.
    pub url: String,
    pub alt: String,
    pub class_name: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

impl ImageRef {
    /// URL of the dark companion asset.
    #[must_use]
    pub fn dark_url(&self) -> String {
        to_dark_url(&self.url)
    }
}

/// Builds asset URLs for declarations.
#[derive(Debug, Clone)]
pub struct DiagramUrls {
    prefix: String,
    base_path: Option<String>,
    live: bool,
}

impl DiagramUrls {
    /// `prefix` must start and end with `/`, e.g. `/diagrams/`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            base_path: None,
            live: false,
        }
    }

    #[must_use]
    pub fn base_path(mut self, base_path: Option<String>) -> Self {
        self.base_path = base_path;
        self
    }

    /// Serve referenced diagrams from their dev alias.
    #[must_use]
    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    #[must_use]
    pub fn hashed_url(&self, theme: Theme, hash: &ContentHash) -> String {
        format!("{}{theme}/{hash}.svg", self.prefix)
    }

    #[must_use]
    pub fn alias_url(&self, theme: Theme, key: &str) -> String {
        format!("{}{theme}/dev/{key}.svg", self.prefix)
    }

    /// Image reference for `declaration`, whose content hashes to `hash`.
    #[must_use]
    pub fn image_for(&self, declaration: &Declaration, hash: &ContentHash) -> ImageRef {
        let url = match &declaration.source {
            DeclarationSource::Referenced { path, .. } if self.live => {
                self.alias_url(Theme::Light, &dev_alias_key(path))
            }
            _ => self.hashed_url(Theme::Light, hash),
        };
        let attrs = &declaration.attrs;
        ImageRef {
            url: with_base_path(&url, self.base_path.as_deref()),
            alt: attrs.alt.clone(),
            class_name: attrs.class_name.clone(),
            width: attrs.width.clone(),
            height: attrs.height.clone(),
        }
    }
}

/// Prefix a root-relative URL with the deployment base path.
///
/// Protocol-relative (`//host`) and relative URLs pass through, as do URLs
/// already under the base path. A base of `/` or empty is no base.
#[must_use]
pub fn with_base_path(url: &str, base_path: Option<&str>) -> String {
    let base = base_path.unwrap_or_default().trim_end_matches('/');
    if base.is_empty() || !url.starts_with('/') || url.starts_with("//") {
        return url.to_owned();
    }
    let already = url
        .strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
    if already {
        return url.to_owned();
    }
    format!("{base}{url}")
}

/// Swap the first `/light/` segment for `/dark/`.
#[must_use]
pub fn to_dark_url(url: &str) -> String {
    url.replacen("/light/", "/dark/", 1)
}
