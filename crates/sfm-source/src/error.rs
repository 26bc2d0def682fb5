//! Error types for source loading.

use std::path::PathBuf;

/// Error while loading a Stoplight table of contents or page body.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Export directory does not exist.
    #[error("Stoplight export directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// No table of contents descriptor in the export directory.
    #[error(
        "Unable to locate a 'table_of_contents.json' file under {}. \
         Expected a Stoplight export directory containing Stoplight metadata.",
        .0.display()
    )]
    TocNotFound(PathBuf),

    /// A page referenced by the table of contents has no markdown body.
    #[error("Markdown for page '{page}' not found under {location}")]
    DocumentNotFound {
        /// Page title or source reference.
        page: String,
        /// Export directory or hosted site URL.
        location: String,
    },

    /// Remote fetch failed (transport error or non-success status).
    #[error("Failed to retrieve {url}: {reason}")]
    Retrieval {
        /// Requested URL.
        url: String,
        /// Status line or transport error.
        reason: String,
    },

    /// Table of contents or site data has an unsupported shape.
    #[error("Unsupported table of contents in {origin}: {message}")]
    Format {
        /// File path or URL the data came from.
        origin: String,
        /// What was wrong.
        message: String,
    },

    /// I/O error reading a local file.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error.
    #[error("JSON error in {origin}: {source}")]
    Json {
        /// File path or URL the JSON came from.
        origin: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// Whether this error means something referenced does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RootNotFound(_) | Self::TocNotFound(_) | Self::DocumentNotFound { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            origin: origin.into(),
            message: message.into(),
        }
    }
}
