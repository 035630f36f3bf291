//! Content hashing.
//!
//! Provides [`ContentHash`], the identity of a rendered diagram, and the
//! path-keyed [`dev_alias_key`] used for live editing.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::DiagramKind;

/// Number of hex characters kept from the digest.
const HASH_LEN: usize = 16;

/// Namespace for dev alias keys.
const DEV_ALIAS_NAMESPACE: &str = "figura-dev-alias:v1";

/// Truncated SHA-256 identity of a diagram's canonical content.
///
/// # Hash Format
///
/// SHA-256 of `"{namespace}:{version}\nformat=svg\n{canonical bytes}"`,
/// hex-encoded and truncated to 16 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    #[must_use]
    pub fn compute(kind: DiagramKind, canonical: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.hash_namespace().as_bytes());
        hasher.update(b"\nformat=svg\n");
        hasher.update(canonical);
        Self(truncated_hex(hasher.finalize().as_slice()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize inline diagram source: CRLF to LF, surrounding whitespace trimmed.
#[must_use]
pub fn canonical_inline(source: &str) -> String {
    source.replace("\r\n", "\n").trim().to_owned()
}

/// Stable key for the dev alias of a referenced source file.
///
/// Derived from the path alone, with backslashes normalized, so the alias URL
/// survives edits to the file.
#[must_use]
pub fn dev_alias_key(source_path: &Path) -> String {
    let normalized = source_path.to_string_lossy().replace('\\', "/");
    let mut hasher = Sha256::new();
    hasher.update(DEV_ALIAS_NAMESPACE.as_bytes());
    hasher.update(b"\n");
    hasher.update(normalized.as_bytes());
    truncated_hex(hasher.finalize().as_slice())
}

fn truncated_hex(digest: &[u8]) -> String {
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_LEN);
    hex
}
