//! Static diagram generation for figura.
//!
//! Turns diagram declarations in markdown documents into content-addressed,
//! theme-aware SVG assets:
//! - inline `PlantUML` fences rendered with the `puml` CLI
//! - referenced `.drawio` files exported through a Draw.io container
//!
//! Every distinct diagram is rendered once per theme, identified by a hash of
//! its canonical content. Re-running with unchanged content runs no tools.
//!
//! # Architecture
//!
//! - [`extract`]: fence scanning and declaration validation
//! - [`job`]: hashing and deduplication into [`RenderJob`]s
//! - [`backend`]: tool-driving [`RenderBackend`]s with store idempotency
//! - [`dark`]: dark variant source rewriting, SVG patching, markers
//! - [`pipeline`]: a full pass over a content directory
//! - [`urls`] and [`rewrite`]: the image reference contract for documents
//!
//! # Example
//!
//! ```ignore
//! use figura_diagrams::{DrawioBackend, Pipeline, PlantUmlBackend, PassOptions, ScanOptions};
//! use figura_store::AssetStore;
//!
//! let pipeline = Pipeline::new(
//!     ScanOptions { content_dir, allowed_root: project.clone(), extensions: vec!["md".into()] },
//!     AssetStore::new("public/diagrams"),
//!     Box::new(PlantUmlBackend::new("puml", ".cache/figura/plantuml", &project)),
//!     Box::new(DrawioBackend::new("docker", image, &project, ".cache/figura/drawio/export-staging")),
//! );
//! let report = pipeline.run_pass(PassOptions { prune: true, dev_aliases: false })?;
//! ```

mod alias;
pub mod backend;
pub mod dark;
mod declaration;
mod error;
pub mod extract;
mod hash;
pub mod job;
mod kind;
mod meta;
pub mod pipeline;
pub mod rewrite;
mod svg;
mod tool;
pub mod urls;

pub use alias::publish_dev_aliases;
pub use backend::{DrawioBackend, PlantUmlBackend, RenderBackend, RenderOutcome};
pub use declaration::{Declaration, DeclarationSource, ImageAttrs};
pub use error::{DeclarationError, DiagramError, RenderFailure, Rule};
pub use extract::{CodeFence, ScanOptions, extract_declarations, scan_documents};
pub use hash::{ContentHash, canonical_inline, dev_alias_key};
pub use job::{RenderJob, hash_declaration, plan_jobs};
pub use kind::DiagramKind;
pub use meta::{FenceMeta, MetaError, MetaValue};
pub use pipeline::{PassOptions, PassReport, Pipeline, SyncOptions, SyncReport};
pub use rewrite::{DocumentNode, replace_diagrams};
pub use svg::has_svg_root;
pub use tool::{Invocation, ProcessRunner, ToolOutput, ToolRunner};
pub use urls::{DiagramUrls, ImageRef, to_dark_url, with_base_path};

pub use figura_store::{AssetStore, Theme};
