//! Terminal output for figura commands.
//!
//! Human-facing lines go to stderr so `--json` results on stdout stay clean.

use console::{Style, Term};

pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    /// Machine-readable result on stdout, never colored.
    pub(crate) fn data(&self, msg: &str) {
        let _ = Term::stdout().write_line(msg);
    }

    /// Plain progress line.
    pub(crate) fn info(&self, msg: &str) {
        self.line(&Style::new(), msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(&Style::new().green(), msg);
    }

    /// Remediation hints.
    pub(crate) fn warning(&self, msg: &str) {
        self.line(&Style::new().yellow(), msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&Style::new().red().bold(), msg);
    }

    pub(crate) fn highlight(&self, msg: &str) {
        self.line(&Style::new().cyan().bold(), msg);
    }

    fn line(&self, style: &Style, msg: &str) {
        let _ = self.term.write_line(&styled(style, msg));
    }
}

fn styled(style: &Style, msg: &str) -> String {
    style.apply_to(msg).to_string()
}
