//! Stoplight source loading for SFM.
//!
//! Reads a Stoplight table of contents and the markdown of every page it
//! references, from either a local export directory ([`DirectorySource`]) or a
//! hosted Stoplight site ([`HostedSource`]). Both implement [`Source`];
//! [`SourceBundle::load`] drains a source into the typed tree plus page bodies
//! the migrator works from.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), sfm_source::SourceError> {
//! use sfm_source::{DirectorySource, SourceBundle};
//!
//! let source = DirectorySource::open("stoplight-export")?;
//! let bundle = SourceBundle::load(&source)?;
//! println!("{} top-level entries", bundle.nodes.len());
//! # Ok(())
//! # }
//! ```

mod error;
mod fetch;
mod fs;
mod hosted;
mod markdown;
mod toc;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use tracing::info;

pub use error::SourceError;
pub use fetch::{DEFAULT_TIMEOUT, Fetch, HttpFetcher};
pub use fs::{DirectorySource, TOC_FILENAME};
pub use hosted::HostedSource;
pub use toc::{
    MARKDOWN_EXTENSIONS, MAX_TOC_DEPTH, PageRef, TocKind, TocNode, has_markdown_extension,
    parse_items,
};

/// Backend that yields a Stoplight table of contents and page bodies.
pub trait Source {
    /// Human-readable location (directory path or base URL).
    fn location(&self) -> String;

    /// Load the table of contents as typed nodes.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the descriptor cannot be read or parsed.
    fn load_tree(&self) -> Result<Vec<TocNode>, SourceError>;

    /// Read the markdown body of a page node.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the document cannot be found or fetched.
    fn markdown(&self, node: &TocNode) -> Result<String, SourceError>;
}

/// Options for connecting to a hosted site.
#[derive(Clone, Debug)]
pub struct HostedOptions {
    /// User-Agent header.
    pub user_agent: String,
    /// Global request timeout.
    pub timeout: Duration,
}

impl Default for HostedOptions {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }
}

/// Open a source: an existing path is an export directory, anything else a
/// hosted site URL.
///
/// # Errors
///
/// Returns [`SourceError`] if the directory has no descriptor or the hosted
/// site cannot be fetched and parsed.
pub fn open_source(location: &str, hosted: &HostedOptions) -> Result<Box<dyn Source>, SourceError> {
    if Path::new(location).exists() {
        info!("Reading Stoplight export directory {}", location);
        Ok(Box::new(DirectorySource::open(location)?))
    } else {
        info!("Reading hosted Stoplight site {}", location);
        let fetcher = HttpFetcher::new(&hosted.user_agent, hosted.timeout);
        Ok(Box::new(HostedSource::connect(location, fetcher)?))
    }
}

/// Table of contents plus the markdown of every page occurrence.
#[derive(Debug, Default)]
pub struct SourceBundle {
    /// Top-level table of contents entries in display order.
    pub nodes: Vec<TocNode>,
    /// One markdown body per page, in [`TocNode::for_each_page`] order.
    pub bodies: Vec<String>,
    /// Where the bundle was read from.
    pub location: String,
}

impl SourceBundle {
    /// Load the tree and every page body from `source`.
    ///
    /// Pages pointing at the same external document read it once; inline
    /// and title-only pages always keep their own body.
    ///
    /// # Errors
    ///
    /// Returns the first [`SourceError`] encountered.
    pub fn load(source: &dyn Source) -> Result<Self, SourceError> {
        let nodes = source.load_tree()?;

        let mut pages = Vec::new();
        TocNode::for_each_page(&nodes, &mut |node| pages.push(node));

        let mut read: HashMap<&str, usize> = HashMap::new();
        let mut bodies = Vec::with_capacity(pages.len());
        for node in pages {
            let reference = node.document_reference();
            if let Some(&earlier) = reference.and_then(|r| read.get(r)) {
                let body = bodies.get(earlier).cloned().unwrap_or_default();
                bodies.push(body);
                continue;
            }
            bodies.push(source.markdown(node)?);
            if let Some(reference) = reference {
                read.insert(reference, bodies.len() - 1);
            }
        }

        info!(
            "Loaded {} pages ({} distinct documents) from {}",
            bodies.len(),
            read.len(),
            source.location()
        );

        Ok(Self {
            nodes,
            bodies,
            location: source.location(),
        })
    }

    /// Markdown body of the `index`-th page in traversal order.
    #[must_use]
    pub fn body(&self, index: usize) -> Option<&str> {
        self.bodies.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use pretty_assertions::assert_eq;

    struct StaticSource {
        nodes: Vec<TocNode>,
        reads: Cell<usize>,
    }

    impl StaticSource {
        fn new(nodes: Vec<TocNode>) -> Self {
            Self {
                nodes,
                reads: Cell::new(0),
            }
        }
    }

    impl Source for StaticSource {
        fn location(&self) -> String {
            "memory".to_owned()
        }

        fn load_tree(&self) -> Result<Vec<TocNode>, SourceError> {
            Ok(self.nodes.clone())
        }

        fn markdown(&self, node: &TocNode) -> Result<String, SourceError> {
            self.reads.set(self.reads.get() + 1);
            let inline = node.as_page().and_then(|page| page.inline_markdown.clone());
            Ok(inline.unwrap_or_else(|| format!("# {}", node.title)))
        }
    }

    #[test]
    fn test_bundle_reads_each_source_once() {
        let source = StaticSource::new(vec![
            TocNode::page("First", Some("shared"), PageRef::default()),
            TocNode::group(
                "Group",
                vec![TocNode::page("Second", Some("shared"), PageRef::default())],
            ),
            TocNode::page("Other", Some("other"), PageRef::default()),
        ]);

        let bundle = SourceBundle::load(&source).unwrap();

        assert_eq!(source.reads.get(), 2);
        assert_eq!(bundle.bodies, vec!["# First", "# First", "# Other"]);
        assert_eq!(bundle.body(2), Some("# Other"));
        assert_eq!(bundle.body(3), None);
        assert_eq!(bundle.location, "memory");
    }

    #[test]
    fn test_bundle_keeps_same_titled_inline_pages_apart() {
        let inline = |body: &str| PageRef {
            uri: None,
            inline_markdown: Some(body.to_owned()),
        };
        let source = StaticSource::new(vec![
            TocNode::page("Intro", None, inline("first body")),
            TocNode::page("Intro", None, inline("second body")),
            TocNode::page("Intro", None, PageRef::default()),
        ]);

        let bundle = SourceBundle::load(&source).unwrap();

        assert_eq!(source.reads.get(), 3);
        assert_eq!(bundle.bodies, vec!["first body", "second body", "# Intro"]);
    }

    #[test]
    fn test_open_source_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOC_FILENAME), "[]").unwrap();

        let source = open_source(&dir.path().to_string_lossy(), &HostedOptions::default()).unwrap();
        assert_eq!(source.location(), dir.path().display().to_string());
        assert!(source.load_tree().unwrap().is_empty());
    }
}
