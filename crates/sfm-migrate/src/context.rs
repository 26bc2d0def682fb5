//! Per-run state shared by the migration stages.

use std::fmt;

use tracing::warn;

/// Non-fatal issue found during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// Internal-looking link whose target is not part of the source tree.
    UnresolvedLink {
        /// Output path of the page containing the link.
        page: String,
        /// Link destination as written.
        target: String,
    },
    /// Resolved link whose destination text could not be found for rewriting.
    UnlocatedLink {
        /// Output path of the page containing the link.
        page: String,
        /// Parsed link destination.
        target: String,
    },
    /// Several table of contents entries point at the same document.
    DuplicateSource {
        /// Shared source identifier.
        source_id: String,
        /// Title of the later entry.
        title: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedLink { page, target } => {
                write!(f, "{page}: unresolved link '{target}' left unchanged")
            }
            Self::UnlocatedLink { page, target } => {
                write!(f, "{page}: could not locate link '{target}' in the source text")
            }
            Self::DuplicateSource { source_id, title } => write!(
                f,
                "'{title}' repeats source '{source_id}'; links resolve to the first occurrence"
            ),
        }
    }
}

/// Ordered warning collector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    /// Record a warning and log it.
    pub fn push(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.0.push(warning);
    }

    /// Warnings in the order they were raised.
    #[must_use]
    pub fn as_slice(&self) -> &[Warning] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Warnings {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// State of a single migration run.
///
/// Created by the caller and passed by reference through every stage.
#[derive(Debug, Default)]
pub struct RunContext {
    /// Where the source was read from.
    pub source_location: String,
    /// Warnings collected so far.
    pub warnings: Warnings,
}

impl RunContext {
    #[must_use]
    pub fn new(source_location: impl Into<String>) -> Self {
        Self {
            source_location: source_location.into(),
            warnings: Warnings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_warnings_keep_order() {
        let mut warnings = Warnings::default();
        warnings.push(Warning::UnresolvedLink {
            page: "pages/a.md".to_owned(),
            target: "missing".to_owned(),
        });
        warnings.push(Warning::DuplicateSource {
            source_id: "intro".to_owned(),
            title: "Intro".to_owned(),
        });

        assert_eq!(warnings.len(), 2);
        assert!(matches!(
            warnings.as_slice()[0],
            Warning::UnresolvedLink { .. }
        ));
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::UnresolvedLink {
            page: "pages/a.md".to_owned(),
            target: "../nowhere".to_owned(),
        };
        assert_eq!(
            warning.to_string(),
            "pages/a.md: unresolved link '../nowhere' left unchanged"
        );

        let warning = Warning::UnlocatedLink {
            page: "pages/a.md".to_owned(),
            target: "b.md".to_owned(),
        };
        assert_eq!(
            warning.to_string(),
            "pages/a.md: could not locate link 'b.md' in the source text"
        );
    }
}
