//! Migration planning and file writing.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use sfm_source::SourceBundle;
use tracing::info;

use crate::context::{RunContext, Warning};
use crate::error::MigrateError;
use crate::links::rewrite_all;
use crate::merge::{MergeOptions, MergeOutcome, TargetConfig};
use crate::nav::{NavEntry, build_navigation};
use crate::paths::{PageRecord, PathRewriter};

/// Default extension of written page files.
pub const DEFAULT_PAGE_EXTENSION: &str = "md";

/// Where migrated files go.
#[derive(Clone, Debug)]
pub struct MigrationOptions {
    /// Fern `docs.yml` to merge navigation into.
    pub docs_yml: PathBuf,
    /// Directory receiving page files.
    pub pages_dir: PathBuf,
    /// Page file extension, without the dot.
    pub page_extension: String,
    /// Navigation merge target and mode.
    pub merge: MergeOptions,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            docs_yml: PathBuf::from("docs.yml"),
            pages_dir: PathBuf::from("docs/pages"),
            page_extension: DEFAULT_PAGE_EXTENSION.to_owned(),
            merge: MergeOptions::default(),
        }
    }
}

/// Whether a page write creates a new file or overwrites one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileAction {
    Create,
    Replace,
}

/// A page file to be written.
#[derive(Clone, Debug)]
pub struct PlannedPage {
    /// File path on disk.
    pub path: PathBuf,
    /// Path as referenced from `docs.yml`.
    pub nav_path: String,
    pub title: String,
    /// Front matter plus body.
    pub content: String,
    pub action: FileAction,
}

/// Everything a migration would write.
#[derive(Clone, Debug)]
pub struct MigrationPlan {
    pub pages: Vec<PlannedPage>,
    pub navigation: Vec<NavEntry>,
    pub docs_yml: PathBuf,
    /// Whether `docs.yml` already existed.
    pub docs_yml_exists: bool,
    /// Merged `docs.yml` text.
    pub docs_yml_content: String,
    pub merge: MergeOutcome,
}

/// Summary of a migration run.
#[derive(Clone, Debug)]
pub struct MigrationReport {
    /// Pages written to new files.
    pub created: usize,
    /// Pages that overwrote existing files.
    pub replaced: usize,
    /// Navigation entries generated, sections included.
    pub nav_entries: usize,
    pub pages: Vec<(PathBuf, FileAction)>,
    pub docs_yml: PathBuf,
    pub docs_yml_exists: bool,
    /// Merged `docs.yml` text.
    pub docs_yml_content: String,
    pub merge: MergeOutcome,
    pub warnings: Vec<Warning>,
    /// Nothing was written.
    pub dry_run: bool,
}

impl MigrationPlan {
    fn report(&self, ctx: &RunContext, dry_run: bool) -> MigrationReport {
        let count = |action: FileAction| self.pages.iter().filter(|p| p.action == action).count();
        MigrationReport {
            created: count(FileAction::Create),
            replaced: count(FileAction::Replace),
            nav_entries: self.navigation.iter().map(NavEntry::count).sum(),
            pages: self.pages.iter().map(|p| (p.path.clone(), p.action)).collect(),
            docs_yml: self.docs_yml.clone(),
            docs_yml_exists: self.docs_yml_exists,
            docs_yml_content: self.docs_yml_content.clone(),
            merge: self.merge,
            warnings: ctx.warnings.as_slice().to_vec(),
            dry_run,
        }
    }
}

/// Turns a loaded Stoplight bundle into Fern pages and navigation.
pub struct Migrator {
    options: MigrationOptions,
}

impl Migrator {
    #[must_use]
    pub fn new(options: MigrationOptions) -> Self {
        Self { options }
    }

    /// Compute every file the migration would write.
    ///
    /// Reads `docs.yml` and checks which page files exist; writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::ConfigShape`] if `docs.yml` cannot be merged
    /// into, or an I/O error if paths cannot be resolved.
    pub fn plan(
        &self,
        bundle: &SourceBundle,
        ctx: &mut RunContext,
    ) -> Result<MigrationPlan, MigrateError> {
        let docs_yml = absolute(&self.options.docs_yml)?;
        let docs_dir = docs_yml.parent().map(Path::to_path_buf).unwrap_or_default();
        let pages_root = relative_to(&absolute(&self.options.pages_dir)?, &docs_dir);

        let rewriter = PathRewriter::new(&pages_root, &self.options.page_extension);
        let (mut map, tree) = rewriter.rewrite(bundle, &mut ctx.warnings);
        rewrite_all(&mut map, &mut ctx.warnings);
        let navigation = build_navigation(&tree, &map);

        let mut config = TargetConfig::load(&docs_yml)?;
        let merge = config.merge(&navigation, &self.options.merge)?;
        let docs_yml_content = config.to_yaml()?;

        let pages = map
            .records()
            .iter()
            .map(|record| {
                let path = clean(&docs_dir.join(&record.path));
                let action = if path.exists() {
                    FileAction::Replace
                } else {
                    FileAction::Create
                };
                Ok(PlannedPage {
                    content: render_page(record)?,
                    nav_path: record.path.clone(),
                    title: record.title.clone(),
                    path,
                    action,
                })
            })
            .collect::<Result<Vec<_>, MigrateError>>()?;

        Ok(MigrationPlan {
            pages,
            navigation,
            docs_yml,
            docs_yml_exists: config.existed(),
            docs_yml_content,
            merge,
        })
    }

    /// Write the page files, then `docs.yml`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Io`] naming the first path that fails.
    pub fn apply(plan: &MigrationPlan) -> Result<(), MigrateError> {
        for page in &plan.pages {
            write_file(&page.path, &page.content)?;
            info!("Wrote {}", page.path.display());
        }
        write_file(&plan.docs_yml, &plan.docs_yml_content)?;
        info!("Updated {}", plan.docs_yml.display());
        Ok(())
    }

    /// Plan and write the migration.
    ///
    /// # Errors
    ///
    /// Returns the first planning or write error.
    pub fn migrate(
        &self,
        bundle: &SourceBundle,
        ctx: &mut RunContext,
    ) -> Result<MigrationReport, MigrateError> {
        let plan = self.plan(bundle, ctx)?;
        Self::apply(&plan)?;
        Ok(plan.report(ctx, false))
    }

    /// Plan the migration without writing anything.
    ///
    /// # Errors
    ///
    /// Returns the first planning error.
    pub fn dry_run(
        &self,
        bundle: &SourceBundle,
        ctx: &mut RunContext,
    ) -> Result<MigrationReport, MigrateError> {
        let plan = self.plan(bundle, ctx)?;
        Ok(plan.report(ctx, true))
    }
}

#[derive(Serialize)]
struct FrontMatter<'a> {
    slug: &'a str,
    title: &'a str,
}

/// Page file content: YAML front matter followed by the trimmed body.
fn render_page(record: &PageRecord) -> Result<String, MigrateError> {
    let front_matter = serde_yaml::to_string(&FrontMatter {
        slug: &record.slug,
        title: &record.title,
    })?;
    let mut page = format!("---\n{front_matter}---\n\n");
    let body = record.body.trim();
    if !body.is_empty() {
        page.push_str(body);
        page.push('\n');
    }
    Ok(page)
}

fn write_file(path: &Path, content: &str) -> Result<(), MigrateError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| MigrateError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| MigrateError::io(path, e))
}

fn absolute(path: &Path) -> Result<PathBuf, MigrateError> {
    std::path::absolute(path)
        .map(|p| clean(&p))
        .map_err(|e| MigrateError::io(path, e))
}

/// Lexically drop `.` and resolve `..` components.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

/// `/`-separated path of `path` relative to `base`.
fn relative_to(path: &Path, base: &Path) -> String {
    let path: Vec<Component> = path.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = path.iter().zip(&base).take_while(|(a, b)| a == b).count();

    let mut parts = vec!["..".to_owned(); base.len() - common];
    parts.extend(
        path[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sfm_source::{DirectorySource, PageRef, TocNode};

    fn page(title: &str, uri: &str) -> TocNode {
        TocNode::page(
            title,
            None,
            PageRef {
                uri: Some(uri.to_owned()),
                inline_markdown: None,
            },
        )
    }

    fn guides_bundle() -> SourceBundle {
        SourceBundle {
            nodes: vec![TocNode::group(
                "Guides",
                vec![page("Intro", "intro.md"), page("Intro", "intro2.md")],
            )],
            bodies: vec![
                "\n# Intro\n\nSee [the next intro](intro2.md#more).\n\n".to_owned(),
                "# Intro again".to_owned(),
            ],
            location: "memory".to_owned(),
        }
    }

    fn options(root: &Path) -> MigrationOptions {
        MigrationOptions {
            docs_yml: root.join("docs.yml"),
            pages_dir: root.join("pages"),
            ..MigrationOptions::default()
        }
    }

    #[test]
    fn test_migrate_writes_pages_and_navigation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("docs.yml"), "title: Example\n").unwrap();
        let mut ctx = RunContext::new("memory");

        let report = Migrator::new(options(dir.path()))
            .migrate(&guides_bundle(), &mut ctx)
            .unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.replaced, 0);
        assert_eq!(report.nav_entries, 3);
        assert!(!report.dry_run);
        assert!(ctx.warnings.is_empty());

        let intro = fs::read_to_string(dir.path().join("pages/guides/intro.md")).unwrap();
        assert_eq!(
            intro,
            "---\nslug: intro\ntitle: Intro\n---\n\n# Intro\n\nSee [the next intro](intro-2.md#more).\n"
        );
        let second = fs::read_to_string(dir.path().join("pages/guides/intro-2.md")).unwrap();
        assert!(second.starts_with("---\nslug: intro-2\ntitle: Intro\n---\n"));

        let docs_yml = fs::read_to_string(dir.path().join("docs.yml")).unwrap();
        assert!(docs_yml.starts_with("title: Example\n"));
        assert!(docs_yml.contains("section: Guides"));
        assert!(docs_yml.contains("path: pages/guides/intro.md"));
        assert!(docs_yml.contains("path: pages/guides/intro-2.md"));
        assert_eq!(docs_yml, report.docs_yml_content);
    }

    #[test]
    fn test_same_titled_inline_pages_keep_their_bodies() {
        let export = tempfile::tempdir().unwrap();
        fs::write(
            export.path().join("table_of_contents.json"),
            r#"[
                {"title": "Intro", "type": "page", "markdown": "BODY-A"},
                {"title": "Intro", "type": "page", "markdown": "BODY-B"}
            ]"#,
        )
        .unwrap();
        let source = DirectorySource::open(export.path()).unwrap();
        let bundle = SourceBundle::load(&source).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let plan = Migrator::new(options(dir.path()))
            .plan(&bundle, &mut RunContext::new("memory"))
            .unwrap();

        let contents: Vec<(&str, &str)> = plan
            .pages
            .iter()
            .map(|page| (page.nav_path.as_str(), page.content.as_str()))
            .collect();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].0, "pages/intro.md");
        assert!(contents[0].1.ends_with("BODY-A\n"));
        assert_eq!(contents[1].0, "pages/intro-2.md");
        assert!(contents[1].1.ends_with("BODY-B\n"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let migrator = Migrator::new(options(dir.path()));

        let preview = migrator
            .dry_run(&guides_bundle(), &mut RunContext::new("memory"))
            .unwrap();

        assert!(preview.dry_run);
        assert!(!dir.path().join("docs.yml").exists());
        assert!(!dir.path().join("pages").exists());

        let report = migrator
            .migrate(&guides_bundle(), &mut RunContext::new("memory"))
            .unwrap();
        assert_eq!(preview.created, report.created);
        assert_eq!(preview.nav_entries, report.nav_entries);
        assert_eq!(preview.pages, report.pages);
        assert_eq!(preview.docs_yml_content, report.docs_yml_content);
        assert!(!preview.docs_yml_exists);
    }

    #[test]
    fn test_second_run_replaces_pages() {
        let dir = tempfile::tempdir().unwrap();
        let migrator = Migrator::new(options(dir.path()));
        migrator
            .migrate(&guides_bundle(), &mut RunContext::new("memory"))
            .unwrap();

        let report = migrator
            .migrate(&guides_bundle(), &mut RunContext::new("memory"))
            .unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.replaced, 2);
        assert!(report.docs_yml_exists);
        assert_eq!(report.merge, MergeOutcome::Replaced { previous: 1 });
    }

    #[test]
    fn test_pages_outside_docs_directory() {
        let dir = tempfile::tempdir().unwrap();
        let options = MigrationOptions {
            docs_yml: dir.path().join("fern").join("docs.yml"),
            pages_dir: dir.path().join("content"),
            page_extension: "mdx".to_owned(),
            merge: MergeOptions::default(),
        };

        let report = Migrator::new(options)
            .migrate(&guides_bundle(), &mut RunContext::new("memory"))
            .unwrap();

        assert!(dir.path().join("content/guides/intro.mdx").is_file());
        assert!(report.docs_yml_content.contains("path: ../content/guides/intro.mdx"));
        assert_eq!(report.pages[0].0, dir.path().join("content/guides/intro.mdx"));
    }

    #[test]
    fn test_bad_docs_yml_aborts_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("docs.yml"), "navigation: 5\n").unwrap();

        let err = Migrator::new(options(dir.path()))
            .migrate(&guides_bundle(), &mut RunContext::new("memory"))
            .unwrap_err();

        assert!(matches!(err, MigrateError::ConfigShape { .. }));
        assert!(!dir.path().join("pages").exists());
    }

    #[test]
    fn test_unresolved_links_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = guides_bundle();
        bundle.bodies[1] = "[Missing](nowhere.md)".to_owned();
        let mut ctx = RunContext::new("memory");

        let report = Migrator::new(options(dir.path()))
            .dry_run(&bundle, &mut ctx)
            .unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(ctx.warnings.len(), 1);
    }

    #[test]
    fn test_render_page_with_empty_body() {
        let record = PageRecord {
            source_id: "a.md".to_owned(),
            title: "Q and A".to_owned(),
            path: "pages/q-and-a.md".to_owned(),
            slug: "q-and-a".to_owned(),
            body: "  \n".to_owned(),
        };
        assert_eq!(
            render_page(&record).unwrap(),
            "---\nslug: q-and-a\ntitle: Q and A\n---\n\n"
        );
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to(Path::new("/a/b/pages"), Path::new("/a/b")), "pages");
        assert_eq!(relative_to(Path::new("/a/content"), Path::new("/a/fern")), "../content");
        assert_eq!(relative_to(Path::new("/a/b"), Path::new("/a/b")), "");
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean(Path::new("/../a")), PathBuf::from("/a"));
    }
}
