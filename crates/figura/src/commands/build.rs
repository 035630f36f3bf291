//! `figura build` command implementation.

use std::path::PathBuf;

use clap::Args;
use figura_config::{CliSettings, Config};
use figura_diagrams::{DiagramUrls, PassOptions, Pipeline, SyncReport, hash_declaration};
use serde::Serialize;

use crate::error::CliError;
use crate::output::Output;
use crate::pipeline::{pipeline_from_config, urls_from_config};

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover figura.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory scanned for documents (overrides config).
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Asset output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Deployment base path for image URLs (overrides config).
    #[arg(long, env = "FIGURA_BASE_PATH")]
    base_path: Option<String>,

    /// Keep assets no declaration references.
    #[arg(long)]
    no_prune: bool,

    /// Print the result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Machine-readable build result.
#[derive(Serialize)]
struct BuildSummary {
    #[serde(flatten)]
    sync: SyncReport,
    images: Vec<ImageEntry>,
}

/// Where one declaration's image lives.
#[derive(Serialize)]
struct ImageEntry {
    document: PathBuf,
    line: usize,
    url: String,
    dark_url: String,
    alt: String,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, a declaration is invalid, or
    /// a render fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            content_dir: self.content_dir,
            output_dir: self.output_dir,
            base_path: self.base_path,
            poll: None,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        if !self.json {
            output.info(&format!(
                "Content directory: {}",
                config.docs_resolved.content_dir.display()
            ));
            output.info(&format!(
                "Output directory: {}",
                config.output_resolved.dir.display()
            ));
        }

        let pipeline = pipeline_from_config(&config);
        let report = pipeline.run_pass(PassOptions {
            prune: !self.no_prune,
            dev_aliases: false,
        })?;

        if self.json {
            let summary = BuildSummary {
                sync: report.sync,
                images: image_entries(&pipeline, &urls_from_config(&config, false))?,
            };
            output.data(&serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }

        output.info(&format!(
            "Found {} reference(s), {} unique diagram(s)",
            report.declarations, report.unique
        ));
        output.success(&format!(
            "Rendered {}, reused {}, removed {}",
            report.sync.rendered, report.sync.reused, report.sync.removed
        ));
        Ok(())
    }
}

fn image_entries(pipeline: &Pipeline, urls: &DiagramUrls) -> Result<Vec<ImageEntry>, CliError> {
    let mut entries = Vec::new();
    for declaration in pipeline.scan()? {
        let hash = hash_declaration(&declaration)?;
        let image = urls.image_for(&declaration, &hash);
        entries.push(ImageEntry {
            dark_url: image.dark_url(),
            url: image.url,
            alt: image.alt,
            document: declaration.document,
            line: declaration.line,
        });
    }
    Ok(entries)
}
