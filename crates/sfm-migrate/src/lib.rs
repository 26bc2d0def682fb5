//! Stoplight to Fern migration for SFM.
//!
//! Runs the pipeline over a loaded [`SourceBundle`](sfm_source::SourceBundle):
//!
//! 1. [`PathRewriter`] assigns every page a slug and target path
//! 2. [`LinkRewriter`] points cross-page links at the new paths
//! 3. [`build_navigation`] mirrors the table of contents as Fern entries
//! 4. [`TargetConfig::merge`] splices them into `docs.yml`
//! 5. [`Migrator`] writes the pages and `docs.yml`, or previews them
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sfm_migrate::{MigrationOptions, Migrator, RunContext};
//! use sfm_source::{DirectorySource, SourceBundle};
//!
//! let bundle = SourceBundle::load(&DirectorySource::open("stoplight-export")?)?;
//! let mut ctx = RunContext::new(bundle.location.clone());
//!
//! let migrator = Migrator::new(MigrationOptions::default());
//! let report = migrator.dry_run(&bundle, &mut ctx)?;
//! assert_eq!(report.warnings.len(), ctx.warnings.len());
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod links;
mod merge;
mod migrator;
mod nav;
mod paths;
mod slug;

pub use context::{RunContext, Warning, Warnings};
pub use error::MigrateError;
pub use links::{LinkRewriter, rewrite_all};
pub use merge::{MergeOptions, MergeOutcome, TargetConfig};
pub use migrator::{
    DEFAULT_PAGE_EXTENSION, FileAction, MigrationOptions, MigrationPlan, MigrationReport,
    Migrator, PlannedPage,
};
pub use nav::{NavEntry, NavPage, NavSection, build_navigation};
pub use paths::{PageRecord, PathMap, PathRewriter, RewrittenNode};
pub use slug::slugify;
