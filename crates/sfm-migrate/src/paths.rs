//! Target paths and slugs for every page in the source tree.
//!
//! [`PathRewriter`] walks the table of contents depth-first, children in
//! their original order, and assigns each page a slug and a target file path
//! nested under its groups' slugs. Slugs collide per sibling set only, so
//! the same input always yields the same paths.

use std::collections::HashMap;
use std::path::Path;

use percent_encoding::percent_decode_str;
use sfm_source::{MARKDOWN_EXTENSIONS, SourceBundle, TocKind, TocNode};
use tracing::debug;

use crate::context::{Warning, Warnings};
use crate::slug::{SlugRegistry, slug_from};

/// A page with its generated target location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRecord {
    /// Identifier of the source document.
    pub source_id: String,
    /// Display title.
    pub title: String,
    /// Target file path, `/`-separated, relative to the `docs.yml` directory.
    pub path: String,
    /// Navigation slug.
    pub slug: String,
    /// Markdown body.
    pub body: String,
}

/// Rewritten tree mirroring the table of contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RewrittenNode {
    /// Index into [`PathMap::records`].
    Page(usize),
    /// Group with its slug and rewritten children.
    Group {
        title: String,
        slug: String,
        children: Vec<RewrittenNode>,
    },
}

/// Page records plus lookup tables for link resolution.
///
/// Every page node yields a record. Lookup keys are unique: when several
/// nodes share a key the first one in traversal order wins.
#[derive(Debug, Default)]
pub struct PathMap {
    records: Vec<PageRecord>,
    by_source: HashMap<String, usize>,
    aliases: HashMap<String, usize>,
}

impl PathMap {
    /// Record for a source identifier.
    #[must_use]
    pub fn get(&self, source_id: &str) -> Option<&PageRecord> {
        self.by_source
            .get(source_id)
            .and_then(|&index| self.records.get(index))
    }

    /// Record a link destination refers to.
    ///
    /// Tries the normalised destination first, then its last path segment.
    #[must_use]
    pub fn resolve(&self, reference: &str) -> Option<&PageRecord> {
        let key = normalize_reference(reference);
        if key.is_empty() {
            return None;
        }
        let index = self.aliases.get(&key).or_else(|| {
            key.rsplit_once('/')
                .and_then(|(_, last)| self.aliases.get(last))
        })?;
        self.records.get(*index)
    }

    /// All records in traversal order.
    #[must_use]
    pub fn records(&self) -> &[PageRecord] {
        &self.records
    }

    pub(crate) fn records_mut(&mut self) -> &mut [PageRecord] {
        &mut self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert(&mut self, node: &TocNode, record: PageRecord, warnings: &mut Warnings) -> usize {
        let index = self.records.len();

        if self.by_source.contains_key(&record.source_id) {
            warnings.push(Warning::DuplicateSource {
                source_id: record.source_id.clone(),
                title: record.title.clone(),
            });
        } else {
            self.by_source.insert(record.source_id.clone(), index);
        }

        let uri = node.as_page().and_then(|p| p.uri.as_deref());
        let stem = uri
            .and_then(|u| Path::new(u).file_stem())
            .map(|s| s.to_string_lossy().into_owned());
        let keys = [
            Some(record.source_id.as_str()),
            node.id.as_deref(),
            node.slug.as_deref(),
            uri,
            stem.as_deref(),
        ];
        for key in keys.into_iter().flatten() {
            let key = normalize_reference(key);
            if !key.is_empty() {
                self.aliases.entry(key).or_insert(index);
            }
        }

        self.records.push(record);
        index
    }
}

/// Assigns target paths and slugs.
#[derive(Clone, Debug)]
pub struct PathRewriter {
    pages_root: String,
    extension: String,
}

impl PathRewriter {
    /// Create a rewriter placing pages under `pages_root` (relative to the
    /// `docs.yml` directory, `/`-separated) with the given file extension.
    #[must_use]
    pub fn new(pages_root: &str, extension: &str) -> Self {
        let pages_root = pages_root.trim_end_matches('/');
        Self {
            pages_root: if pages_root == "." {
                String::new()
            } else {
                pages_root.to_owned()
            },
            extension: extension.trim_start_matches('.').to_owned(),
        }
    }

    /// Build the path map and rewritten tree for `bundle`.
    pub fn rewrite(
        &self,
        bundle: &SourceBundle,
        warnings: &mut Warnings,
    ) -> (PathMap, Vec<RewrittenNode>) {
        let mut map = PathMap::default();
        let tree = self.rewrite_level(&bundle.nodes, &self.pages_root, bundle, &mut map, warnings);
        debug!("Assigned paths to {} pages", map.len());
        (map, tree)
    }

    fn rewrite_level(
        &self,
        nodes: &[TocNode],
        dir: &str,
        bundle: &SourceBundle,
        map: &mut PathMap,
        warnings: &mut Warnings,
    ) -> Vec<RewrittenNode> {
        let mut registry = SlugRegistry::default();
        let mut rewritten = Vec::with_capacity(nodes.len());

        for node in nodes {
            match &node.kind {
                TocKind::Page(_) => {
                    let source_id = node.source_id();
                    let slug = registry.claim(&slug_from(&[&node.title, source_id], "page"));
                    let record = PageRecord {
                        source_id: source_id.to_owned(),
                        title: node.title.clone(),
                        path: join(dir, &format!("{slug}.{}", self.extension)),
                        slug,
                        body: bundle.body(map.len()).unwrap_or_default().to_owned(),
                    };
                    rewritten.push(RewrittenNode::Page(map.insert(node, record, warnings)));
                }
                TocKind::Group(children) => {
                    if !contains_page(children) {
                        debug!("Dropping empty group '{}'", node.title);
                        continue;
                    }
                    let own_slug = node.slug.as_deref().unwrap_or_default();
                    let slug = registry.claim(&slug_from(&[own_slug, &node.title], "section"));
                    let children =
                        self.rewrite_level(children, &join(dir, &slug), bundle, map, warnings);
                    rewritten.push(RewrittenNode::Group {
                        title: node.title.clone(),
                        slug,
                        children,
                    });
                }
            }
        }

        rewritten
    }
}

fn contains_page(nodes: &[TocNode]) -> bool {
    nodes.iter().any(|node| match &node.kind {
        TocKind::Page(_) => true,
        TocKind::Group(children) => contains_page(children),
    })
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_owned()
    } else {
        format!("{dir}/{name}")
    }
}

/// Normalise a reference for lookup.
///
/// Percent-decodes, drops query and fragment, `.`/`..` and empty segments,
/// and a trailing markdown extension.
pub(crate) fn normalize_reference(reference: &str) -> String {
    let decoded = percent_decode_str(reference).decode_utf8_lossy();
    let path = decoded.split(['?', '#']).next().unwrap_or_default();
    let joined = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect::<Vec<_>>()
        .join("/");
    strip_markdown_extension(&joined).to_owned()
}

fn strip_markdown_extension(path: &str) -> &str {
    match path.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !stem.ends_with('/')
                && MARKDOWN_EXTENSIONS.iter().any(|m| ext.eq_ignore_ascii_case(m)) =>
        {
            stem
        }
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sfm_source::PageRef;

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

    fn bundle(nodes: Vec<TocNode>) -> SourceBundle {
        let mut bodies = Vec::new();
        TocNode::for_each_page(&nodes, &mut |node| bodies.push(format!("# {}", node.title)));
        SourceBundle {
            nodes,
            bodies,
            location: "memory".to_owned(),
        }
    }

    fn paths(map: &PathMap) -> Vec<&str> {
        map.records().iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn test_duplicate_titles_in_group() {
        let bundle = bundle(vec![TocNode::group(
            "Guides",
            vec![page("Intro", "intro.md"), page("Intro", "intro2.md")],
        )]);
        let mut warnings = Warnings::default();

        let (map, tree) = PathRewriter::new("pages", "md").rewrite(&bundle, &mut warnings);

        assert_eq!(paths(&map), vec!["pages/guides/intro.md", "pages/guides/intro-2.md"]);
        assert_eq!(map.records()[1].slug, "intro-2");
        assert_eq!(
            tree,
            vec![RewrittenNode::Group {
                title: "Guides".to_owned(),
                slug: "guides".to_owned(),
                children: vec![RewrittenNode::Page(0), RewrittenNode::Page(1)],
            }]
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_rewrite_is_deterministic() {
        let bundle = bundle(vec![
            page("Overview", "overview.md"),
            TocNode::group(
                "API",
                vec![
                    page("Users", "api/users.md"),
                    page("Users", "api/users-v2.md"),
                    TocNode::group("Users", vec![page("Create", "api/create.md")]),
                ],
            ),
        ]);
        let rewriter = PathRewriter::new("pages", "md");

        let (first, first_tree) = rewriter.rewrite(&bundle, &mut Warnings::default());
        let (second, second_tree) = rewriter.rewrite(&bundle, &mut Warnings::default());

        assert_eq!(first.records(), second.records());
        assert_eq!(first_tree, second_tree);
        assert_eq!(
            paths(&first),
            vec![
                "pages/overview.md",
                "pages/api/users.md",
                "pages/api/users-2.md",
                "pages/api/users-3/create.md",
            ]
        );
    }

    #[test]
    fn test_same_slug_in_different_groups_is_not_a_collision() {
        let bundle = bundle(vec![
            TocNode::group("One", vec![page("Intro", "one/intro.md")]),
            TocNode::group("Two", vec![page("Intro", "two/intro.md")]),
        ]);

        let (map, _) = PathRewriter::new("pages", "mdx").rewrite(&bundle, &mut Warnings::default());

        assert_eq!(paths(&map), vec!["pages/one/intro.mdx", "pages/two/intro.mdx"]);
    }

    #[test]
    fn test_slug_falls_back_to_source_id() {
        let bundle = bundle(vec![page("???", "docs/Setup.md")]);

        let (map, _) = PathRewriter::new("", "md").rewrite(&bundle, &mut Warnings::default());

        assert_eq!(paths(&map), vec!["docs-setup-md.md"]);
    }

    #[test]
    fn test_group_slug_prefers_own_slug() {
        let mut group = TocNode::group("Reference Docs", vec![page("Intro", "intro.md")]);
        group.slug = Some("reference".to_owned());

        let (map, _) =
            PathRewriter::new("./", "md").rewrite(&bundle(vec![group]), &mut Warnings::default());

        assert_eq!(paths(&map), vec!["reference/intro.md"]);
    }

    #[test]
    fn test_empty_groups_are_dropped() {
        let bundle = bundle(vec![
            TocNode::group("Empty", vec![TocNode::group("Nested", vec![])]),
            page("Intro", "intro.md"),
        ]);

        let (_, tree) = PathRewriter::new("pages", "md").rewrite(&bundle, &mut Warnings::default());

        assert_eq!(tree, vec![RewrittenNode::Page(0)]);
    }

    #[test]
    fn test_duplicate_source_warns_and_first_wins() {
        let bundle = bundle(vec![page("First", "shared.md"), page("Second", "shared.md")]);
        let mut warnings = Warnings::default();

        let (map, _) = PathRewriter::new("pages", "md").rewrite(&bundle, &mut warnings);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("shared.md").unwrap().title, "First");
        assert_eq!(map.resolve("shared").unwrap().title, "First");
        assert_eq!(
            warnings.as_slice(),
            &[Warning::DuplicateSource {
                source_id: "shared.md".to_owned(),
                title: "Second".to_owned(),
            }]
        );
    }

    #[test]
    fn test_resolve_aliases() {
        let mut node = page("Setup Guide", "docs/setup.md");
        node.id = Some("abc123".to_owned());
        node.slug = Some("setup-guide".to_owned());
        let (map, _) =
            PathRewriter::new("pages", "md").rewrite(&bundle(vec![node]), &mut Warnings::default());

        for reference in [
            "docs/setup.md",
            "./docs/setup.md",
            "/docs/setup",
            "setup.md",
            "abc123",
            "/docs/project/setup-guide",
            "setup-guide?tab=1",
            "docs/set%75p.md",
        ] {
            assert_eq!(
                map.resolve(reference).map(|r| r.path.as_str()),
                Some("pages/setup-guide.md"),
                "{reference}"
            );
        }
        assert!(map.resolve("missing").is_none());
        assert!(map.resolve("").is_none());
    }

    #[test]
    fn test_normalize_reference() {
        assert_eq!(normalize_reference("./a/../b/c.md#top"), "a/b/c");
        assert_eq!(normalize_reference("/guides/"), "guides");
        assert_eq!(normalize_reference("page.MDX"), "page");
        assert_eq!(normalize_reference("image.png"), "image.png");
        assert_eq!(normalize_reference(".md"), ".md");
        assert_eq!(normalize_reference("My%20Page.md"), "My Page");
    }
}
