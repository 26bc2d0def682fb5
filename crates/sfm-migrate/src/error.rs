//! Error types for migration.

use std::path::PathBuf;

use sfm_source::SourceError;

/// Error while planning or applying a migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Source could not be loaded.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Existing `docs.yml` has an unexpected structure.
    #[error("{}: {message}", path.display())]
    ConfigShape {
        /// Path of the offending `docs.yml`.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// YAML serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error while reading or writing a file.
    #[error("I/O error accessing {}: {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl MigrateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn shape(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigShape {
            path: path.into(),
            message: message.into(),
        }
    }
}
