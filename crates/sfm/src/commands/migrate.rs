//! `sfm migrate` command implementation.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use sfm_config::{CliSettings, Config};
use sfm_migrate::{
    MergeOptions, MergeOutcome, MigrationOptions, MigrationReport, Migrator,
    RunContext,
};
use sfm_source::{HostedOptions, SourceBundle, open_source};
use tracing::{debug, info};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the migrate command.
#[derive(Args)]
pub(crate) struct MigrateArgs {
    /// Stoplight export directory or hosted docs URL (overrides config).
    source: Option<String>,

    /// Path to the Fern docs.yml file (default: docs.yml).
    #[arg(long)]
    docs_yml: Option<PathBuf>,

    /// Fern docs root directory (default: docs).
    #[arg(long)]
    docs_root: Option<PathBuf>,

    /// Directory for generated pages (default: <docs-root>/pages).
    #[arg(long)]
    pages_dir: Option<PathBuf>,

    /// Title of the navigation section to merge into.
    #[arg(long)]
    section: Option<String>,

    /// Append generated entries instead of replacing existing navigation.
    #[arg(long)]
    append_navigation: bool,

    /// Preview changes without writing any files.
    #[arg(long)]
    dry_run: bool,

    /// Path to configuration file (default: auto-discover sfm.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl MigrateArgs {
    /// Execute the migrate command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, loading or writing fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref(), Some(&self.cli_settings()))?;
        let location = config.require_source()?;
        if let Some(path) = &config.config_path {
            debug!("Using configuration {}", path.display());
        }

        output.info(&format!("Loading Stoplight docs from {location}..."));
        let hosted = HostedOptions {
            user_agent: config.hosted.user_agent.clone(),
            timeout: Duration::from_secs(config.hosted.timeout_secs),
        };
        let source = open_source(location, &hosted)?;
        let bundle = SourceBundle::load(source.as_ref())?;

        let mut ctx = RunContext::new(bundle.location.clone());
        let options = migration_options(&config);
        debug!(
            docs_yml = %options.docs_yml.display(),
            pages_dir = %options.pages_dir.display(),
            section = ?options.merge.section,
            append = options.merge.append,
            dry_run = self.dry_run,
            "Migration options"
        );
        let migrator = Migrator::new(options);

        if self.dry_run {
            let report = migrator.dry_run(&bundle, &mut ctx)?;
            info!(
                "Dry run planned {} pages and {} navigation entries",
                report.pages.len(),
                report.nav_entries
            );
            print_dry_run_report(&output, &report);
        } else {
            let report = migrator.migrate(&bundle, &mut ctx)?;
            info!(
                "Migration finished: {} created, {} replaced, {} warnings",
                report.created,
                report.replaced,
                ctx.warnings.len()
            );
            print_report(&output, &report);
        }

        Ok(())
    }

    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            source: self.source.clone(),
            docs_yml: self.docs_yml.clone(),
            docs_root: self.docs_root.clone(),
            pages_dir: self.pages_dir.clone(),
            section: self.section.clone(),
            append_navigation: self.append_navigation.then_some(true),
        }
    }
}

fn migration_options(config: &Config) -> MigrationOptions {
    MigrationOptions {
        docs_yml: config.docs_resolved.docs_yml.clone(),
        pages_dir: config.docs_resolved.pages_dir(),
        page_extension: config.docs_resolved.page_extension.clone(),
        merge: MergeOptions {
            section: config.navigation.section.clone(),
            append: config.navigation.append,
        },
    }
}

fn describe_merge(merge: MergeOutcome) -> String {
    match merge {
        MergeOutcome::Created => "new navigation list".to_owned(),
        MergeOutcome::Replaced { previous } => format!("replaced {previous} existing entries"),
        MergeOutcome::Appended { existing } => format!("appended after {existing} existing entries"),
    }
}

fn print_summary(output: &Output, report: &MigrationReport) {
    output.info(&format!("Pages created: {}", report.created));
    output.info(&format!("Pages replaced: {}", report.replaced));
    output.info(&format!("Navigation entries: {}", report.nav_entries));
    output.info(&format!(
        "Navigation ({}): {}",
        report.docs_yml.display(),
        describe_merge(report.merge)
    ));
}

fn print_warnings(output: &Output, report: &MigrationReport) {
    if report.warnings.is_empty() {
        return;
    }
    output.warning(&format!("\nWarnings ({}):", report.warnings.len()));
    for warning in &report.warnings {
        output.info(&format!("  - {warning}"));
    }
}

fn print_dry_run_report(output: &Output, report: &MigrationReport) {
    output.heading("\n[DRY RUN] No files written.");
    print_summary(output, report);

    if !report.pages.is_empty() {
        output.info(&format!("\nPages ({}):", report.pages.len()));
        for (path, action) in &report.pages {
            output.file(*action, path);
        }
    }

    let verb = if report.docs_yml_exists { "update" } else { "create" };
    output.info(&format!("\nWould {verb} {}:", report.docs_yml.display()));
    output.quote(&report.docs_yml_content);

    print_warnings(output, report);
}

fn print_report(output: &Output, report: &MigrationReport) {
    output.success("\nMigration complete!");
    print_summary(output, report);
    print_warnings(output, report);
}
