//! External tool invocation.
//!
//! Backends describe a command as an [`Invocation`] and hand it to a
//! [`ToolRunner`]. [`ProcessRunner`] spawns real processes; tests substitute
//! their own runner.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A fully specified command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Value following `flag` in the argument list.
    #[must_use]
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Program name without directories, for messages.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Trimmed stderr followed by trimmed stdout, skipping empty streams.
    #[must_use]
    pub fn details(&self) -> String {
        [self.stderr.trim(), self.stdout.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs external tools. Blocks until the tool exits.
pub trait ToolRunner: Send + Sync {
    /// Run `invocation` to completion.
    ///
    /// An `Err` means the tool could not be started; a nonzero exit is
    /// reported through [`ToolOutput::success`].
    fn run(&self, invocation: &Invocation) -> io::Result<ToolOutput>;
}

/// [`ToolRunner`] that spawns operating system processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
        let program = resolve_program(&invocation.program, invocation.cwd.as_deref())?;

        let mut command = Command::new(program);
        command.args(&invocation.args);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        tracing::debug!(command = %invocation, "running tool");
        let output = command.output()?;

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Locate `program` on `PATH`, or relative to `cwd` when it names a path.
fn resolve_program(program: &Path, cwd: Option<&Path>) -> io::Result<PathBuf> {
    let lookup: OsString = program.as_os_str().to_owned();
    let result = match cwd {
        Some(cwd) => which::which_in(&lookup, std::env::var_os("PATH"), cwd),
        None => which::which(&lookup),
    };
    result.map_err(|e| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found: {e}", program.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_invocation_display() {
        let invocation = Invocation::new("/usr/bin/puml")
            .arg("generate")
            .args(["in.puml", "--output", "out.svg"]);

        assert_eq!(
            invocation.to_string(),
            "/usr/bin/puml generate in.puml --output out.svg"
        );
        assert_eq!(invocation.program_name(), "puml");
    }

    #[test]
    fn test_flag_value() {
        let invocation = Invocation::new("docker").args(["--output", "/data/out", "--svg-theme"]);

        assert_eq!(invocation.flag_value("--output"), Some("/data/out"));
        assert_eq!(invocation.flag_value("--svg-theme"), None);
        assert_eq!(invocation.flag_value("--format"), None);
    }

    #[test]
    fn test_output_details() {
        let output = ToolOutput {
            success: false,
            code: Some(1),
            stdout: "  partial\n".to_owned(),
            stderr: "boom\n".to_owned(),
        };
        assert_eq!(output.details(), "boom\npartial");

        let quiet = ToolOutput::default();
        assert_eq!(quiet.details(), "");
    }

    #[test]
    fn test_missing_program_is_not_found() {
        let err = ProcessRunner
            .run(&Invocation::new("figura-definitely-missing-tool"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
