//! Diagram declarations found in documents.

use std::path::{Path, PathBuf};

use crate::DiagramKind;

/// Where a declaration's diagram source lives.
///
/// Resolved once during extraction; everything downstream dispatches on this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationSource {
    /// Canonicalized `PlantUML` text embedded in the document.
    Inline { text: String },
    /// A `.drawio` file referenced by `src`.
    Referenced {
        /// `src` as written in the document.
        src: String,
        /// `src` resolved against the document's directory.
        path: PathBuf,
    },
}

impl DeclarationSource {
    #[must_use]
    pub fn kind(&self) -> DiagramKind {
        match self {
            Self::Inline { .. } => DiagramKind::PlantUml,
            Self::Referenced { .. } => DiagramKind::DrawIo,
        }
    }

    /// Resolved source file for referenced diagrams.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Inline { .. } => None,
            Self::Referenced { path, .. } => Some(path),
        }
    }

    /// Short human label: the `src` value, or `inline`.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Inline { .. } => "inline",
            Self::Referenced { src, .. } => src,
        }
    }
}

/// Presentation attributes carried through to the image reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageAttrs {
    pub alt: String,
    pub class_name: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

/// One diagram declaration in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Owning document.
    pub document: PathBuf,
    /// 1-based line of the opening fence.
    pub line: usize,
    pub source: DeclarationSource,
    pub attrs: ImageAttrs,
}

impl Declaration {
    #[must_use]
    pub fn kind(&self) -> DiagramKind {
        self.source.kind()
    }
}
