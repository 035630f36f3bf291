//! Render job planning.
//!
//! Declarations are hashed and deduplicated: every distinct [`ContentHash`]
//! becomes exactly one [`RenderJob`], no matter how many documents declare it.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use crate::declaration::{Declaration, DeclarationSource};
use crate::error::DiagramError;
use crate::hash::ContentHash;
use crate::DiagramKind;

/// One unit of rendering work.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub hash: ContentHash,
    representative: Declaration,
    /// Every document declaring this diagram.
    pub documents: BTreeSet<PathBuf>,
    /// Resolved source files of referenced declarations sharing this hash.
    pub sources: BTreeSet<PathBuf>,
}

impl RenderJob {
    fn new(hash: ContentHash, declaration: Declaration) -> Self {
        let mut job = Self {
            hash,
            documents: BTreeSet::new(),
            sources: BTreeSet::new(),
            representative: declaration.clone(),
        };
        job.absorb(&declaration);
        job
    }

    fn absorb(&mut self, declaration: &Declaration) {
        self.documents.insert(declaration.document.clone());
        if let Some(path) = declaration.source.path() {
            self.sources.insert(path.to_path_buf());
        }
    }

    /// First declaration seen for this hash; used for error context and
    /// as the render input.
    #[must_use]
    pub fn representative(&self) -> &Declaration {
        &self.representative
    }

    #[must_use]
    pub fn kind(&self) -> DiagramKind {
        self.representative.kind()
    }
}

/// Compute the content hash of a declaration.
///
/// Inline sources are already canonical; referenced sources hash the raw
/// file bytes.
pub fn hash_declaration(declaration: &Declaration) -> Result<ContentHash, DiagramError> {
    let kind = declaration.kind();
    match &declaration.source {
        DeclarationSource::Inline { text } => Ok(ContentHash::compute(kind, text.as_bytes())),
        DeclarationSource::Referenced { path, .. } => {
            let bytes = std::fs::read(path).map_err(|e| DiagramError::io("read", path, e))?;
            Ok(ContentHash::compute(kind, &bytes))
        }
    }
}

/// Group declarations into jobs, one per distinct hash, in first-seen order.
pub fn plan_jobs(declarations: &[Declaration]) -> Result<Vec<RenderJob>, DiagramError> {
    let mut jobs: Vec<RenderJob> = Vec::new();
    let mut index: HashMap<ContentHash, usize> = HashMap::new();

    for declaration in declarations {
        let hash = hash_declaration(declaration)?;
        if let Some(&at) = index.get(&hash) {
            jobs[at].absorb(declaration);
        } else {
            index.insert(hash.clone(), jobs.len());
            jobs.push(RenderJob::new(hash, declaration.clone()));
        }
    }

    tracing::debug!(
        declarations = declarations.len(),
        jobs = jobs.len(),
        "planned render jobs"
    );
    Ok(jobs)
}
