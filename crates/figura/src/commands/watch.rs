//! `figura watch` command implementation.

use std::path::PathBuf;

use clap::Args;
use figura_config::{CliSettings, Config};
use figura_diagrams::{DiagramError, PassOptions, Pipeline};
use figura_watch::{FileWatcher, Generator, PassOutcome, WatchCoordinator};

use crate::error::CliError;
use crate::output::Output;
use crate::pipeline::{coordinator_config, pipeline_from_config, watch_mode};

/// Extension of referenced Draw.io sources, watched alongside documents.
const DRAWIO_EXTENSION: &str = "drawio";

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    /// Path to configuration file (default: auto-discover figura.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory scanned for documents (overrides config).
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Asset output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Poll for changes instead of using native file events.
    #[arg(long)]
    poll: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Live passes: no pruning, dev aliases published.
struct LiveGenerator {
    pipeline: Pipeline,
}

impl Generator for LiveGenerator {
    type Error = DiagramError;

    fn generate(&mut self) -> Result<PassOutcome, DiagramError> {
        let report = self
            .pipeline
            .run_pass(PassOptions {
                prune: false,
                dev_aliases: true,
            })
            .inspect_err(|e| {
                if let Some(hint) = e.remediation() {
                    tracing::warn!("{hint}");
                }
            })?;
        Ok(PassOutcome {
            references: report.references,
        })
    }
}

impl WatchArgs {
    /// Execute the watch command. Runs until interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the watcher cannot start.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            content_dir: self.content_dir,
            output_dir: self.output_dir,
            base_path: None,
            poll: self.poll.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let content_dir = &config.docs_resolved.content_dir;

        let mut extensions = config.docs_resolved.extensions.clone();
        extensions.push(DRAWIO_EXTENSION.to_owned());
        let watcher = FileWatcher::new(content_dir, &extensions)?.mode(watch_mode(&config));
        let (rx, _handle) = watcher.start()?;

        output.highlight(&format!("Watching {}", content_dir.display()));
        output.info(&format!(
            "Output directory: {}",
            config.output_resolved.dir.display()
        ));

        let generator = LiveGenerator {
            pipeline: pipeline_from_config(&config),
        };
        let mut coordinator = WatchCoordinator::new(generator, coordinator_config(&config));
        coordinator.initial_pass();
        coordinator.run(&rx);

        Ok(())
    }
}
