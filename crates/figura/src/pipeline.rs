//! Wiring from configuration to the diagram pipeline.

use figura_config::Config;
use figura_diagrams::{
    AssetStore, DiagramUrls, DrawioBackend, Pipeline, PlantUmlBackend, ScanOptions,
};
use figura_watch::{CoordinatorConfig, WatchMode};

/// Build the generation pipeline described by `config`.
pub(crate) fn pipeline_from_config(config: &Config) -> Pipeline {
    let docs = &config.docs_resolved;
    let output = &config.output_resolved;
    let drawio_config = &config.drawio;

    let plantuml = PlantUmlBackend::new(
        &config.plantuml_resolved.bin,
        output.cache_dir.join("plantuml"),
        &docs.project_dir,
    );
    let drawio = DrawioBackend::new(
        &drawio_config.docker_bin,
        &drawio_config.image,
        &docs.project_dir,
        output.cache_dir.join("drawio").join("export-staging"),
    )
    .with_command_timeout(drawio_config.command_timeout)
    .with_run_as_user(drawio_config.run_as_user);

    Pipeline::new(
        ScanOptions {
            content_dir: docs.content_dir.clone(),
            allowed_root: docs.project_dir.clone(),
            extensions: docs.extensions.clone(),
        },
        AssetStore::new(&output.dir),
        Box::new(plantuml),
        Box::new(drawio),
    )
}

/// Asset URLs for documents, in live mode when `live` is set.
pub(crate) fn urls_from_config(config: &Config, live: bool) -> DiagramUrls {
    DiagramUrls::new(&config.output_resolved.url_prefix)
        .base_path(config.output_resolved.base_path.clone())
        .live(live)
}

pub(crate) fn coordinator_config(config: &Config) -> CoordinatorConfig {
    CoordinatorConfig {
        debounce: config.watch.debounce(),
        stable: config.watch.stable(),
        stable_poll: config.watch.stable_poll(),
        ignore: config.watch.ignore(),
    }
}

pub(crate) fn watch_mode(config: &Config) -> WatchMode {
    if config.watch.poll {
        WatchMode::Poll {
            interval: config.watch.scan_interval(),
        }
    } else {
        WatchMode::Native
    }
}
