//! Error types.
//!
//! Three failure classes abort a pass:
//! - [`DeclarationError`]: a malformed declaration, raised before any rendering
//! - [`RenderFailure`]: an external tool ran but failed or produced bad output
//! - [`DiagramError::ToolUnavailable`]: the tool could not be started at all

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use figura_store::{StoreError, Theme};

use crate::meta::MetaError;
use crate::tool::{Invocation, ToolOutput};
use crate::{DiagramKind, RenderJob};

/// Declaration rule violated by a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rule {
    #[error(transparent)]
    Meta(#[from] MetaError),
    #[error("`{kind}` fence requires {attribute}=\"...\"")]
    MissingAttribute {
        kind: DiagramKind,
        attribute: &'static str,
    },
    #[error("`{kind}` fence attribute `{attribute}` is not supported: {reason}")]
    ForbiddenAttribute {
        kind: DiagramKind,
        attribute: String,
        reason: &'static str,
    },
    #[error("`{kind}` fence has unknown attribute `{attribute}`")]
    UnknownAttribute {
        kind: DiagramKind,
        attribute: String,
    },
    #[error("`{kind}` fence has no diagram source")]
    EmptySource { kind: DiagramKind },
    #[error("drawio src must reference a .drawio file (got \"{src}\")")]
    WrongExtension { src: String },
    #[error("source \"{src}\" resolves outside {} ({})", root.display(), resolved.display())]
    OutsideRoot {
        src: String,
        resolved: PathBuf,
        root: PathBuf,
    },
    #[error("source \"{src}\" not found ({})", resolved.display())]
    MissingSource { src: String, resolved: PathBuf },
}

/// A malformed declaration, located in its document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}:{line}: {rule}", document.display())]
pub struct DeclarationError {
    pub document: PathBuf,
    /// 1-based line of the opening fence.
    pub line: usize,
    pub rule: Rule,
}

/// Context of a failed render, formatted for humans.
#[derive(Debug)]
pub struct RenderFailure {
    pub kind: DiagramKind,
    pub theme: Theme,
    /// Representative document of the job.
    pub document: PathBuf,
    /// Source as written in the declaration (`src` value, or `inline`).
    pub source_ref: String,
    /// Resolved source file, for referenced diagrams.
    pub resolved: Option<PathBuf>,
    /// Container image, for containerized tools.
    pub image: Option<String>,
    pub invocation: Option<Invocation>,
    pub reason: String,
    /// Captured stderr and stdout.
    pub output: String,
    /// Remediation hint naming the required tooling.
    pub hint: String,
}

impl RenderFailure {
    pub(crate) fn new(job: &RenderJob, theme: Theme, reason: impl Into<String>) -> Self {
        let declaration = job.representative();
        Self {
            kind: job.kind(),
            theme,
            document: declaration.document.clone(),
            source_ref: declaration.source.label().to_owned(),
            resolved: declaration.source.path().map(Path::to_path_buf),
            image: None,
            invocation: None,
            reason: reason.into(),
            output: String::new(),
            hint: String::new(),
        }
    }

    #[must_use]
    pub(crate) fn invocation(mut self, invocation: &Invocation) -> Self {
        self.invocation = Some(invocation.clone());
        self
    }

    #[must_use]
    pub(crate) fn output(mut self, output: &ToolOutput) -> Self {
        self.output = output.details();
        self
    }

    #[must_use]
    pub(crate) fn image(mut self, image: &str) -> Self {
        self.image = Some(image.to_owned());
        self
    }

    #[must_use]
    pub(crate) fn hint(mut self, hint: String) -> Self {
        self.hint = hint;
        self
    }
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} render failed ({}): {}", self.kind, self.theme, self.reason)?;
        writeln!(f, "  document: {}", self.document.display())?;
        write!(f, "  source: {}", self.source_ref)?;
        if let Some(resolved) = &self.resolved {
            write!(f, "\n  resolved source: {}", resolved.display())?;
        }
        if let Some(image) = &self.image {
            write!(f, "\n  image: {image}")?;
        }
        if let Some(invocation) = &self.invocation {
            write!(f, "\n  command: {invocation}")?;
        }
        if !self.output.is_empty() {
            write!(f, "\n  output:\n{}", self.output)?;
        }
        Ok(())
    }
}

/// Diagram pipeline error.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    #[error("{0}")]
    Render(Box<RenderFailure>),

    #[error("{tool} could not be started ({source})\n  command: {invocation}")]
    ToolUnavailable {
        tool: String,
        invocation: Invocation,
        hint: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DiagramError {
    pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the failure stems from missing tooling rather than content.
    #[must_use]
    pub fn is_environment(&self) -> bool {
        matches!(self, Self::ToolUnavailable { .. })
    }

    /// Hint naming the tooling a failed render needs.
    #[must_use]
    pub fn remediation(&self) -> Option<&str> {
        match self {
            Self::ToolUnavailable { hint, .. } => Some(hint),
            Self::Render(failure) if !failure.hint.is_empty() => Some(&failure.hint),
            _ => None,
        }
    }
}

impl From<RenderFailure> for DiagramError {
    fn from(failure: RenderFailure) -> Self {
        Self::Render(Box::new(failure))
    }
}
