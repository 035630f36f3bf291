//! `PlantUML` backend driving the `puml` CLI.

use std::path::PathBuf;
use std::sync::Arc;

use figura_store::Theme;

use super::{RenderBackend, read_svg_output, run_tool};
use crate::dark::{dark_plantuml_source, postprocess_dark_svg};
use crate::declaration::DeclarationSource;
use crate::error::{DiagramError, RenderFailure};
use crate::tool::{Invocation, ProcessRunner, ToolRunner};
use crate::{DiagramKind, RenderJob};

const REMEDIATION: &str = "PlantUML rendering requires the puml CLI (node-plantuml) plus Java \
                           and Graphviz (dot) to be installed in the build environment.";

/// Renders inline `PlantUML` sources.
///
/// Sources are staged as `<staging>/<hash>.<theme>.puml` and rendered with
/// `puml generate <file> --format svg --output <file>` from the project
/// directory.
pub struct PlantUmlBackend {
    bin: PathBuf,
    staging_dir: PathBuf,
    project_dir: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl PlantUmlBackend {
    #[must_use]
    pub fn new(
        bin: impl Into<PathBuf>,
        staging_dir: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bin: bin.into(),
            staging_dir: staging_dir.into(),
            project_dir: project_dir.into(),
            runner: Arc::new(ProcessRunner),
        }
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }
}

impl RenderBackend for PlantUmlBackend {
    fn kind(&self) -> DiagramKind {
        DiagramKind::PlantUml
    }

    fn remediation(&self) -> String {
        REMEDIATION.to_owned()
    }

    fn produce(&self, job: &RenderJob, theme: Theme) -> Result<String, DiagramError> {
        let failure = |reason: &str| RenderFailure::new(job, theme, reason).hint(self.remediation());

        let DeclarationSource::Inline { text } = &job.representative().source else {
            return Err(failure("declaration has no inline PlantUML source").into());
        };
        let source = match theme {
            Theme::Light => text.clone(),
            Theme::Dark => dark_plantuml_source(text),
        };

        std::fs::create_dir_all(&self.staging_dir)
            .map_err(|e| DiagramError::io("create", &self.staging_dir, e))?;
        let stem = format!("{}.{theme}", job.hash);
        let input = self.staging_dir.join(format!("{stem}.puml"));
        let output_path = self.staging_dir.join(format!("{stem}.svg"));

        std::fs::write(&input, format!("{source}\n"))
            .map_err(|e| DiagramError::io("write", &input, e))?;
        if output_path.exists() {
            std::fs::remove_file(&output_path)
                .map_err(|e| DiagramError::io("remove", &output_path, e))?;
        }

        let invocation = Invocation::new(&self.bin)
            .arg("generate")
            .arg(input.to_string_lossy())
            .args(["--format", "svg", "--output"])
            .arg(output_path.to_string_lossy())
            .current_dir(&self.project_dir);

        let output = run_tool(self.runner.as_ref(), &invocation, failure, self.remediation())?;
        let svg = read_svg_output(&output_path, &invocation, &output, failure)?;

        for staged in [&input, &output_path] {
            if let Err(e) = std::fs::remove_file(staged) {
                tracing::warn!(path = %staged.display(), error = %e, "failed to remove staged file");
            }
        }

        Ok(match theme {
            Theme::Light => svg,
            Theme::Dark => postprocess_dark_svg(&svg),
        })
    }
}
