//! Local Stoplight export directory source.
//!
//! An export contains a `table_of_contents.json` descriptor (at the root or
//! nested somewhere below it) and the page bodies, usually under a
//! `documents/` directory next to the descriptor.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SourceError;
use crate::toc::{MARKDOWN_EXTENSIONS, TocNode, parse_items, root_items};
use crate::Source;

/// Descriptor filename searched for in the export directory.
pub const TOC_FILENAME: &str = "table_of_contents.json";

/// Directory holding page bodies.
const DOCUMENTS_DIRNAME: &str = "documents";

/// Reads a Stoplight export from the local filesystem.
#[derive(Debug)]
pub struct DirectorySource {
    root: PathBuf,
    toc_path: PathBuf,
}

impl DirectorySource {
    /// Open an export directory and locate its table of contents.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::RootNotFound`] if `root` does not exist and
    /// [`SourceError::TocNotFound`] if no descriptor is found under it.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SourceError::RootNotFound(root));
        }
        let toc_path = find_table_of_contents(&root)?;
        debug!("Using table of contents {}", toc_path.display());
        Ok(Self { root, toc_path })
    }

    /// Path of the descriptor in use.
    #[must_use]
    pub fn toc_path(&self) -> &Path {
        &self.toc_path
    }

    /// Directory containing the descriptor.
    fn toc_dir(&self) -> &Path {
        self.toc_path.parent().unwrap_or(&self.root)
    }

    /// Candidate files for a page, in lookup order.
    fn candidate_paths(&self, node: &TocNode) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(uri) = node.as_page().and_then(|p| p.uri.as_deref()) {
            let relative = uri.trim_start_matches('/');
            candidates.push(self.toc_dir().join(relative));
            candidates.push(self.root.join(relative));
        }

        if let Some(base) = document_base(node) {
            for dir in [self.toc_dir(), self.root.as_path()] {
                for ext in MARKDOWN_EXTENSIONS {
                    candidates.push(dir.join(DOCUMENTS_DIRNAME).join(format!("{base}.{ext}")));
                }
            }
        }

        candidates
    }

    /// Search the whole export for `<base>.<ext>` inside a `documents` directory.
    fn find_document(&self, base: &str) -> Option<PathBuf> {
        MARKDOWN_EXTENSIONS.iter().find_map(|ext| {
            glob_sorted(&self.root, &format!("{base}.{ext}"))
                .into_iter()
                .find(|path| {
                    path.components()
                        .any(|c| c.as_os_str() == DOCUMENTS_DIRNAME)
                })
        })
    }
}

impl Source for DirectorySource {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn load_tree(&self) -> Result<Vec<TocNode>, SourceError> {
        let origin = self.toc_path.display().to_string();
        let content =
            fs::read_to_string(&self.toc_path).map_err(|e| SourceError::io(&self.toc_path, e))?;
        let data: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| SourceError::Json {
                origin: origin.clone(),
                source,
            })?;
        parse_items(root_items(&data, &origin)?, &origin)
    }

    fn markdown(&self, node: &TocNode) -> Result<String, SourceError> {
        let existing = self
            .candidate_paths(node)
            .into_iter()
            .find(|p| p.is_file())
            .or_else(|| document_base(node).and_then(|base| self.find_document(&base)));

        if let Some(path) = existing {
            debug!("Reading '{}' from {}", node.title, path.display());
            return fs::read_to_string(&path).map_err(|e| SourceError::io(&path, e));
        }

        // Some Stoplight exports embed markdown inline under the node.
        node.as_page()
            .and_then(|p| p.inline_markdown.clone())
            .ok_or_else(|| SourceError::DocumentNotFound {
                page: node.source_id().to_owned(),
                location: self.location(),
            })
    }
}

/// File stem used for `documents/<base>.md` lookups.
fn document_base(node: &TocNode) -> Option<String> {
    node.slug
        .as_deref()
        .or(node.id.as_deref())
        .map(|s| s.replace('/', "-"))
}

/// Locate the descriptor at the root, else anywhere below it.
fn find_table_of_contents(root: &Path) -> Result<PathBuf, SourceError> {
    let direct = root.join(TOC_FILENAME);
    if direct.is_file() {
        return Ok(direct);
    }
    glob_sorted(root, TOC_FILENAME)
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| SourceError::TocNotFound(root.to_path_buf()))
}

/// Recursive, sorted search for `file_name` under `root`.
fn glob_sorted(root: &Path, file_name: &str) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/**/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        glob::Pattern::escape(file_name)
    );
    let Ok(paths) = glob::glob(&pattern) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
    found.sort();
    found
}
