//! CLI error types.

use sfm_config::ConfigError;
use sfm_migrate::MigrateError;
use sfm_source::SourceError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Migrate(#[from] MigrateError),
}
