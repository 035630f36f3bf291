//! Render backends.
//!
//! A [`RenderBackend`] turns a [`RenderJob`] into SVG for one theme by
//! running an external tool. The provided [`RenderBackend::render`] method
//! wraps that with the store's idempotency rules:
//!
//! - light: skipped when `light/<hash>.svg` exists
//! - dark: skipped when `dark/<hash>.svg` carries the current dark marker

mod drawio;
mod plantuml;

use std::io;
use std::path::{Path, PathBuf};

use figura_store::{AssetStore, Theme};

pub use drawio::DrawioBackend;
pub use plantuml::PlantUmlBackend;

use crate::dark::{has_current_marker, stamp_marker};
use crate::error::{DiagramError, RenderFailure};
use crate::svg::has_svg_root;
use crate::tool::{Invocation, ToolOutput, ToolRunner};
use crate::{DiagramKind, RenderJob};

/// Result of rendering one theme of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub path: PathBuf,
    /// The stored asset was already current; no tool ran.
    pub reused: bool,
}

/// Produces SVG assets for one diagram kind.
pub trait RenderBackend: Send + Sync {
    fn kind(&self) -> DiagramKind;

    /// Hint naming the tooling this backend needs.
    fn remediation(&self) -> String;

    /// Run the tool for `theme` and return validated SVG text.
    ///
    /// Dark output is returned unstamped; [`render`](Self::render) adds the
    /// marker.
    fn produce(&self, job: &RenderJob, theme: Theme) -> Result<String, DiagramError>;

    /// Ensure the `theme` asset of `job` is present and current in `store`.
    fn render(
        &self,
        store: &AssetStore,
        job: &RenderJob,
        theme: Theme,
    ) -> Result<RenderOutcome, DiagramError> {
        let hash = job.hash.as_str();
        let kind = self.kind();

        match theme {
            Theme::Light => {
                if store.contains(theme, hash) {
                    return Ok(RenderOutcome {
                        path: store.asset_path(theme, hash),
                        reused: true,
                    });
                }
                let svg = self.produce(job, theme)?;
                let path = store.write(theme, hash, svg.as_bytes())?;
                tracing::debug!(%kind, %hash, %theme, "rendered diagram");
                Ok(RenderOutcome {
                    path,
                    reused: false,
                })
            }
            Theme::Dark => {
                if let Some(existing) = store.read(theme, hash)? {
                    if has_current_marker(&existing, kind, &job.hash) {
                        return Ok(RenderOutcome {
                            path: store.asset_path(theme, hash),
                            reused: true,
                        });
                    }
                    tracing::debug!(%kind, %hash, "dark asset is stale");
                }
                let svg = self.produce(job, theme)?;
                let stamped = stamp_marker(&svg, kind, &job.hash).ok_or_else(|| {
                    RenderFailure::new(job, theme, "rendered SVG has no <svg> tag")
                        .hint(self.remediation())
                })?;
                let path = store.write(theme, hash, stamped.as_bytes())?;
                tracing::debug!(%kind, %hash, %theme, "rendered diagram");
                Ok(RenderOutcome {
                    path,
                    reused: false,
                })
            }
        }
    }
}

/// Run `invocation`, mapping spawn failures and nonzero exits to errors.
pub(crate) fn run_tool(
    runner: &dyn ToolRunner,
    invocation: &Invocation,
    failure: impl Fn(&str) -> RenderFailure,
    hint: String,
) -> Result<ToolOutput, DiagramError> {
    let output = runner
        .run(invocation)
        .map_err(|source| DiagramError::ToolUnavailable {
            tool: invocation.program_name(),
            invocation: invocation.clone(),
            hint,
            source,
        })?;

    if !output.success {
        let reason = match output.code {
            Some(code) => format!("{} exited with status {code}", invocation.program_name()),
            None => format!("{} was terminated by a signal", invocation.program_name()),
        };
        return Err(failure(&reason)
            .invocation(invocation)
            .output(&output)
            .into());
    }

    Ok(output)
}

/// Read a tool's SVG output and check that it is an SVG document.
pub(crate) fn read_svg_output(
    path: &Path,
    invocation: &Invocation,
    output: &ToolOutput,
    failure: impl Fn(&str) -> RenderFailure,
) -> Result<String, DiagramError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let reason = format!("no output was written to {}", path.display());
            return Err(failure(&reason)
                .invocation(invocation)
                .output(output)
                .into());
        }
        Err(e) => return Err(DiagramError::io("read", path, e)),
    };

    if !has_svg_root(&content) {
        let reason = format!("{} is not an SVG document", path.display());
        return Err(failure(&reason)
            .invocation(invocation)
            .output(output)
            .into());
    }

    Ok(content)
}

/// Render `path` relative to `base` with forward slashes.
pub(crate) fn relative_posix(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}
