//! Colored terminal output on stderr.

use std::path::Path;

use console::{Style, Term};
use sfm_migrate::FileAction;

/// Terminal reporter for migration progress and results.
pub(crate) struct Output {
    term: Term,
    ok: Style,
    warn: Style,
    fail: Style,
    heading: Style,
    quoted: Style,
}

impl Output {
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            fail: Style::new().red().bold(),
            heading: Style::new().cyan().bold(),
            quoted: Style::new().dim(),
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(&self.ok.apply_to(msg).to_string());
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.warn.apply_to(msg).to_string());
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.fail.apply_to(msg).to_string());
    }

    pub(crate) fn heading(&self, msg: &str) {
        self.line(&self.heading.apply_to(msg).to_string());
    }

    /// `+ path` for a new file, `~ path` for an overwritten one.
    pub(crate) fn file(&self, action: FileAction, path: &Path) {
        let marker = match action {
            FileAction::Create => self.ok.apply_to("+"),
            FileAction::Replace => self.warn.apply_to("~"),
        };
        self.line(&format!("  {marker} {}", path.display()));
    }

    /// File content, indented and dimmed.
    pub(crate) fn quote(&self, content: &str) {
        for text in content.lines() {
            self.line(&self.quoted.apply_to(format!("    {text}")).to_string());
        }
    }
}
