//! Generation pass: scan, plan, render, prune.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;

use figura_store::{AssetStore, Theme};
use rayon::prelude::*;
use serde::Serialize;

use crate::alias::publish_dev_aliases;
use crate::backend::RenderBackend;
use crate::declaration::Declaration;
use crate::error::DiagramError;
use crate::extract::{ScanOptions, scan_documents};
use crate::job::{RenderJob, plan_jobs};
use crate::DiagramKind;

/// Options for [`Pipeline::sync`].
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Remove assets whose hash no job references.
    pub prune: bool,
}

/// Per-job counters from [`Pipeline::sync`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Jobs where at least one variant needed a tool run.
    pub rendered: usize,
    /// Jobs whose light and dark assets were both current.
    pub reused: usize,
    /// Assets removed by pruning.
    pub removed: usize,
}

/// Options for [`Pipeline::run_pass`].
#[derive(Debug, Clone, Copy)]
pub struct PassOptions {
    pub prune: bool,
    /// Publish path-keyed aliases for referenced diagrams.
    pub dev_aliases: bool,
}

/// Outcome of a full generation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub declarations: usize,
    /// Distinct diagrams.
    pub unique: usize,
    #[serde(flatten)]
    pub sync: SyncReport,
    /// Dev aliases published.
    pub aliases: usize,
    /// Referenced source file to the documents that reference it.
    pub references: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "found {} reference(s), {} unique diagram(s), rendered {}, reused {}, removed {}",
            self.declarations, self.unique, self.sync.rendered, self.sync.reused, self.sync.removed
        )
    }
}

/// Drives extraction and rendering against one asset store.
pub struct Pipeline {
    scan: ScanOptions,
    store: AssetStore,
    plantuml: Box<dyn RenderBackend>,
    drawio: Box<dyn RenderBackend>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        scan: ScanOptions,
        store: AssetStore,
        plantuml: Box<dyn RenderBackend>,
        drawio: Box<dyn RenderBackend>,
    ) -> Self {
        Self {
            scan,
            store,
            plantuml,
            drawio,
        }
    }

    #[must_use]
    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    #[must_use]
    pub fn scan_options(&self) -> &ScanOptions {
        &self.scan
    }

    /// Extract every declaration under the content directory.
    pub fn scan(&self) -> Result<Vec<Declaration>, DiagramError> {
        scan_documents(&self.scan)
    }

    fn backend(&self, kind: DiagramKind) -> &dyn RenderBackend {
        match kind {
            DiagramKind::PlantUml => self.plantuml.as_ref(),
            DiagramKind::DrawIo => self.drawio.as_ref(),
        }
    }

    /// Bring the store in line with `jobs`.
    ///
    /// Jobs render in parallel, light before dark within a job. The first
    /// error aborts the sync before pruning, so a failed pass never removes
    /// assets.
    pub fn sync(&self, jobs: &[RenderJob], options: SyncOptions) -> Result<SyncReport, DiagramError> {
        self.store.ensure_layout(false)?;

        let rendered = jobs
            .par_iter()
            .map(|job| {
                let backend = self.backend(job.kind());
                let mut rendered = false;
                for theme in Theme::ALL {
                    rendered |= !backend.render(&self.store, job, theme)?.reused;
                }
                Ok(rendered)
            })
            .collect::<Result<Vec<bool>, DiagramError>>()?
            .into_iter()
            .filter(|rendered| *rendered)
            .count();

        let mut report = SyncReport {
            rendered,
            reused: jobs.len() - rendered,
            removed: 0,
        };

        if options.prune {
            let keep: HashSet<String> = jobs.iter().map(|j| j.hash.as_str().to_owned()).collect();
            report.removed = self.store.prune(&keep)? + self.store.prune_legacy()?;
        }

        tracing::debug!(
            jobs = jobs.len(),
            rendered = report.rendered,
            reused = report.reused,
            removed = report.removed,
            "diagram assets synced"
        );
        Ok(report)
    }

    /// Scan, plan, and sync in one go.
    pub fn run_pass(&self, options: PassOptions) -> Result<PassReport, DiagramError> {
        let declarations = self.scan()?;
        let jobs = plan_jobs(&declarations)?;
        let sync = self.sync(
            &jobs,
            SyncOptions {
                prune: options.prune,
            },
        )?;

        let aliases = if options.dev_aliases {
            self.store.ensure_layout(true)?;
            publish_dev_aliases(&self.store, &jobs)?
        } else {
            0
        };

        let mut references: BTreeMap<PathBuf, BTreeSet<PathBuf>> = BTreeMap::new();
        for declaration in &declarations {
            if let Some(path) = declaration.source.path() {
                references
                    .entry(path.to_path_buf())
                    .or_default()
                    .insert(declaration.document.clone());
            }
        }

        let report = PassReport {
            declarations: declarations.len(),
            unique: jobs.len(),
            sync,
            aliases,
            references,
        };
        tracing::info!("{report}");
        Ok(report)
    }
}
