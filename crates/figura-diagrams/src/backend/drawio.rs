//! Draw.io backend driving a containerized exporter.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use figura_store::Theme;
use ignore::WalkBuilder;

use super::{RenderBackend, read_svg_output, relative_posix, run_tool};
use crate::error::{DiagramError, RenderFailure};
use crate::tool::{Invocation, ProcessRunner, ToolRunner};
use crate::{DiagramKind, RenderJob};

/// Mount point of the project directory inside the container.
const CONTAINER_ROOT: &str = "/data";

/// Renders `.drawio` files through `docker run <image>`.
///
/// The project directory is mounted at `/data`. Each export writes into its
/// own staging directory `<staging>/<hash>/<theme>`, which must end up
/// holding exactly one SVG.
pub struct DrawioBackend {
    docker_bin: PathBuf,
    image: String,
    command_timeout: u32,
    run_as_user: bool,
    project_dir: PathBuf,
    staging_root: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl DrawioBackend {
    #[must_use]
    pub fn new(
        docker_bin: impl Into<PathBuf>,
        image: impl Into<String>,
        project_dir: impl Into<PathBuf>,
        staging_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            docker_bin: docker_bin.into(),
            image: image.into(),
            command_timeout: 180,
            run_as_user: false,
            project_dir: project_dir.into(),
            staging_root: staging_root.into(),
            runner: Arc::new(ProcessRunner),
        }
    }

    /// Seconds passed to the exporter as its command timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, seconds: u32) -> Self {
        self.command_timeout = seconds;
        self
    }

    /// Run the container as the owner of the staging directory.
    #[must_use]
    pub fn with_run_as_user(mut self, enabled: bool) -> Self {
        self.run_as_user = enabled;
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    fn container_path(&self, path: &Path) -> Option<String> {
        relative_posix(path, &self.project_dir).map(|rel| format!("{CONTAINER_ROOT}/{rel}"))
    }
}

impl RenderBackend for DrawioBackend {
    fn kind(&self) -> DiagramKind {
        DiagramKind::DrawIo
    }

    fn remediation(&self) -> String {
        format!(
            "Draw.io export requires Docker plus access to the Docker daemon, using image \"{}\".",
            self.image
        )
    }

    fn produce(&self, job: &RenderJob, theme: Theme) -> Result<String, DiagramError> {
        let failure = |reason: &str| {
            RenderFailure::new(job, theme, reason)
                .image(&self.image)
                .hint(self.remediation())
        };

        let Some(source) = job.representative().source.path() else {
            return Err(failure("declaration has no Draw.io source file").into());
        };
        let Some(container_source) = self.container_path(source) else {
            let reason = format!(
                "source must live under {}",
                self.project_dir.display()
            );
            return Err(failure(&reason).into());
        };

        let stage = self
            .staging_root
            .join(job.hash.as_str())
            .join(theme.as_str());
        if stage.exists() {
            std::fs::remove_dir_all(&stage).map_err(|e| DiagramError::io("clear", &stage, e))?;
        }
        std::fs::create_dir_all(&stage).map_err(|e| DiagramError::io("create", &stage, e))?;
        let Some(container_output) = self.container_path(&stage) else {
            let reason = format!(
                "staging directory must live under {}",
                self.project_dir.display()
            );
            return Err(failure(&reason).into());
        };

        let mut invocation = Invocation::new(&self.docker_bin)
            .args(["run", "--rm", "-v"])
            .arg(format!("{}:{CONTAINER_ROOT}", self.project_dir.display()))
            .arg("-e")
            .arg(format!(
                "DRAWIO_DESKTOP_COMMAND_TIMEOUT={}",
                self.command_timeout
            ));
        if self.run_as_user
            && let Some(user) = owner_of(&stage)
        {
            invocation = invocation.arg("-u").arg(user);
        }
        let invocation = invocation
            .arg(&self.image)
            .args(["--format", "svg", "--output"])
            .arg(container_output)
            .args(["--svg-theme", theme.as_str()])
            .args(["--remove-page-suffix", "--embed-svg-fonts", "true"])
            .arg(container_source)
            .current_dir(&self.project_dir);

        let output = run_tool(self.runner.as_ref(), &invocation, failure, self.remediation())?;

        let exported = exported_svgs(&stage);
        let [svg_path] = exported.as_slice() else {
            let details = if exported.is_empty() {
                "No SVG files were found in the export output.".to_owned()
            } else {
                let listing: Vec<String> = exported
                    .iter()
                    .map(|p| format!("- {}", p.display()))
                    .collect();
                format!("Exported SVGs:\n{}", listing.join("\n"))
            };
            let reason = format!(
                "Expected exactly one SVG export for \"{}\" ({theme}). \
                 Only single-page .drawio files are supported.\n{details}",
                source.display()
            );
            return Err(failure(&reason)
                .invocation(&invocation)
                .output(&output)
                .into());
        };

        let svg = read_svg_output(svg_path, &invocation, &output, failure)?;

        if let Err(e) = std::fs::remove_dir_all(&stage) {
            tracing::warn!(path = %stage.display(), error = %e, "failed to remove export staging");
        }

        Ok(svg)
    }
}

/// All `.svg` files below `dir`, sorted.
fn exported_svgs(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkBuilder::new(dir)
        .standard_filters(false)
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "svg"))
        .collect();
    found.sort();
    found
}

/// `uid:gid` owning `path`.
#[cfg(unix)]
fn owner_of(path: &Path) -> Option<String> {
    use std::os::unix::fs::MetadataExt;

    let metadata = std::fs::metadata(path).ok()?;
    Some(format!("{}:{}", metadata.uid(), metadata.gid()))
}

#[cfg(not(unix))]
fn owner_of(_path: &Path) -> Option<String> {
    None
}
