//! Stoplight table of contents model and parser.
//!
//! Stoplight exports and hosted sites describe navigation as loosely shaped
//! JSON. [`parse_items`] validates that JSON once and converts it into typed
//! [`TocNode`] trees; nothing downstream sees untyped values.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SourceError;
use crate::markdown::extract_markdown_from_node;

/// Deepest nesting accepted in a table of contents.
pub const MAX_TOC_DEPTH: usize = 64;

/// File extensions treated as markdown pages.
pub const MARKDOWN_EXTENSIONS: [&str; 3] = ["md", "mdx", "markdown"];

const GROUP_TYPES: [&str; 5] = ["group", "section", "chapter", "http_service", "http-service"];
const PAGE_TYPES: [&str; 5] = ["markdown", "page", "article", "md", "http_service.operation"];
const CHILDREN_KEYS: [&str; 4] = ["items", "children", "contents", "nodes"];

/// One entry of the source table of contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocNode {
    /// Display title.
    pub title: String,
    /// Stoplight slug, if the entry has one.
    pub slug: Option<String>,
    /// Stoplight node id, if the entry has one.
    pub id: Option<String>,
    /// Page or group payload.
    pub kind: TocKind,
}

/// Page vs group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TocKind {
    /// Leaf entry backed by a markdown document.
    Page(PageRef),
    /// Entry with ordered children and no document of its own.
    Group(Vec<TocNode>),
}

/// Where a page's markdown can be found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageRef {
    /// Markdown file path as written in the descriptor (`uri`, `path`, `file`).
    pub uri: Option<String>,
    /// Markdown embedded in the descriptor itself.
    pub inline_markdown: Option<String>,
}

impl TocNode {
    /// Create a page node.
    #[must_use]
    pub fn page(title: impl Into<String>, slug: Option<&str>, page: PageRef) -> Self {
        Self {
            title: title.into(),
            slug: slug.map(str::to_owned),
            id: None,
            kind: TocKind::Page(page),
        }
    }

    /// Create a group node.
    #[must_use]
    pub fn group(title: impl Into<String>, children: Vec<TocNode>) -> Self {
        Self {
            title: title.into(),
            slug: None,
            id: None,
            kind: TocKind::Group(children),
        }
    }

    /// Page payload, if this is a page.
    #[must_use]
    pub fn as_page(&self) -> Option<&PageRef> {
        match &self.kind {
            TocKind::Page(page) => Some(page),
            TocKind::Group(_) => None,
        }
    }

    /// Children, empty for pages.
    #[must_use]
    pub fn children(&self) -> &[TocNode] {
        match &self.kind {
            TocKind::Page(_) => &[],
            TocKind::Group(children) => children,
        }
    }

    /// Identifier of the source document behind a page.
    ///
    /// Prefers the file reference, then the slug, then the id, then the title.
    #[must_use]
    pub fn source_id(&self) -> &str {
        self.as_page()
            .and_then(|p| p.uri.as_deref())
            .or(self.slug.as_deref())
            .or(self.id.as_deref())
            .unwrap_or(&self.title)
    }

    /// Reference naming an external document, if the page has one.
    ///
    /// Pages carrying inline markdown, or known only by title, have none.
    #[must_use]
    pub fn document_reference(&self) -> Option<&str> {
        let page = self.as_page()?;
        if page.inline_markdown.is_some() {
            return None;
        }
        page.uri
            .as_deref()
            .or(self.slug.as_deref())
            .or(self.id.as_deref())
    }

    /// Visit every page node depth-first in display order.
    pub fn for_each_page<'a>(nodes: &'a [TocNode], f: &mut impl FnMut(&'a TocNode)) {
        for node in nodes {
            match &node.kind {
                TocKind::Page(_) => f(node),
                TocKind::Group(children) => Self::for_each_page(children, f),
            }
        }
    }
}

/// Extract the top-level item list from a table of contents document.
///
/// Accepts a bare list or an object holding the list under `items`,
/// `contents` or `children`.
pub(crate) fn root_items<'a>(data: &'a Value, origin: &str) -> Result<&'a [Value], SourceError> {
    match data {
        Value::Array(items) => Ok(items),
        Value::Object(map) => ["items", "contents", "children"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .ok_or_else(|| SourceError::format(origin, "object has no items list")),
        other => Err(SourceError::format(
            origin,
            format!("expected a list or object, got {}", value_kind(other)),
        )),
    }
}

/// Convert raw table of contents items into typed nodes.
///
/// Items that are neither recognisable pages nor groups are dropped.
///
/// # Errors
///
/// Returns [`SourceError::Format`] if nesting exceeds [`MAX_TOC_DEPTH`].
pub fn parse_items(items: &[Value], origin: &str) -> Result<Vec<TocNode>, SourceError> {
    parse_list(items, origin, 0)
}

fn parse_list(items: &[Value], origin: &str, depth: usize) -> Result<Vec<TocNode>, SourceError> {
    if depth > MAX_TOC_DEPTH {
        return Err(SourceError::format(
            origin,
            format!("nesting exceeds {MAX_TOC_DEPTH} levels"),
        ));
    }
    let mut nodes = Vec::with_capacity(items.len());
    for item in items {
        if let Some(node) = parse_item(item, origin, depth)? {
            nodes.push(node);
        }
    }
    Ok(nodes)
}

fn parse_item(item: &Value, origin: &str, depth: usize) -> Result<Option<TocNode>, SourceError> {
    let Value::Object(map) = item else {
        return Ok(None);
    };

    let node_type = str_field(map, &["type", "kind"])
        .unwrap_or_default()
        .to_lowercase();
    let title = str_field(map, &["title", "name", "label"])
        .or_else(|| str_field(map, &["slug", "id"]))
        .unwrap_or("Untitled")
        .to_owned();
    let slug = str_field(map, &["slug", "uriSlug", "permalink"]).map(str::to_owned);
    let id = str_field(map, &["id", "targetId"]).map(str::to_owned);
    let children = CHILDREN_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array));

    let kind = if GROUP_TYPES.contains(&node_type.as_str()) {
        let children = match children {
            Some(items) => parse_list(items, origin, depth + 1)?,
            None => Vec::new(),
        };
        TocKind::Group(children)
    } else if PAGE_TYPES.contains(&node_type.as_str()) {
        TocKind::Page(page_ref(map, item))
    } else if let Some(items) = children.filter(|c| !c.is_empty()) {
        TocKind::Group(parse_list(items, origin, depth + 1)?)
    } else if extract_markdown_from_node(item).is_some() {
        TocKind::Page(page_ref(map, item))
    } else {
        debug!("Skipping table of contents entry '{title}' of type '{node_type}'");
        return Ok(None);
    };

    Ok(Some(TocNode {
        title,
        slug,
        id,
        kind,
    }))
}

fn page_ref(map: &Map<String, Value>, item: &Value) -> PageRef {
    let uri = str_field(map, &["uri", "path", "file"])
        .filter(|uri| has_markdown_extension(uri))
        .map(str::to_owned);
    PageRef {
        uri,
        inline_markdown: extract_markdown_from_node(item),
    }
}

/// Whether a path ends with one of [`MARKDOWN_EXTENSIONS`].
#[must_use]
pub fn has_markdown_extension(path: &str) -> bool {
    path.rsplit_once('.').is_some_and(|(_, ext)| {
        MARKDOWN_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

/// First non-empty string value among `keys`.
fn str_field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
