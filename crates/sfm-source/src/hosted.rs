//! Hosted Stoplight documentation source.
//!
//! Stoplight Elements sites are Next.js apps: the table of contents and most
//! page bodies ship inside the `__NEXT_DATA__` JSON blob of the landing page.
//! Pages without an embedded body are fetched as `<base>/<slug>.md`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::Source;
use crate::error::SourceError;
use crate::fetch::Fetch;
use crate::markdown::extract_markdown_from_node;
use crate::toc::{TocNode, parse_items};

/// `<script id="__NEXT_DATA__" ...>{json}</script>`, attributes in any order.
static NEXT_DATA_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<script[^>]*id=["']__NEXT_DATA__["'][^>]*>(.*?)</script>"#).unwrap()
});

/// `window.__NEXT_DATA__ = {` assignment fallback.
static NEXT_DATA_ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"window\.__NEXT_DATA__\s*=\s*\{").unwrap());

/// Keys that may hold the table of contents inside Next.js data.
const TOC_KEYS: [&str; 6] = ["tableOfContents", "toc", "tree", "items", "contents", "children"];

/// Reads documentation from a hosted Stoplight site.
pub struct HostedSource<F: Fetch> {
    fetcher: F,
    base_url: String,
    markdown_by_id: HashMap<String, String>,
    toc: Vec<TocNode>,
}

impl<F: Fetch> HostedSource<F> {
    /// Fetch the landing page and parse its table of contents.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Retrieval`] if the landing page cannot be
    /// fetched and [`SourceError::Format`] if it carries no Next.js data or no
    /// table of contents.
    pub fn connect(base_url: &str, fetcher: F) -> Result<Self, SourceError> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let html = fetcher.get(&base_url)?;

        let next_data = extract_next_data(&html).ok_or_else(|| {
            SourceError::format(
                &base_url,
                "unable to locate Next.js data in Stoplight documentation site",
            )
        })?;

        let markdown_by_id = collect_markdown_by_id(&next_data);
        debug!("Indexed {} embedded Stoplight documents", markdown_by_id.len());

        let raw_toc = find_table_of_contents(&next_data).ok_or_else(|| {
            SourceError::format(&base_url, "no table of contents in Stoplight data")
        })?;
        let toc = parse_items(raw_toc, &base_url)?;

        Ok(Self {
            fetcher,
            base_url,
            markdown_by_id,
            toc,
        })
    }
}

impl<F: Fetch> Source for HostedSource<F> {
    fn location(&self) -> String {
        self.base_url.clone()
    }

    fn load_tree(&self) -> Result<Vec<TocNode>, SourceError> {
        Ok(self.toc.clone())
    }

    fn markdown(&self, node: &TocNode) -> Result<String, SourceError> {
        if let Some(inline) = node.as_page().and_then(|p| p.inline_markdown.clone()) {
            return Ok(inline);
        }

        if let Some(referenced) = node.id.as_ref().and_then(|id| self.markdown_by_id.get(id)) {
            return Ok(referenced.clone());
        }

        match &node.slug {
            Some(slug) => self.fetcher.get(&format!("{}/{slug}.md", self.base_url)),
            None => Err(SourceError::DocumentNotFound {
                page: node.source_id().to_owned(),
                location: self.base_url.clone(),
            }),
        }
    }
}

/// Extract the Next.js data object embedded in a page.
fn extract_next_data(html: &str) -> Option<Value> {
    if let Some(caps) = NEXT_DATA_SCRIPT_RE.captures(html)
        && let Ok(value) = serde_json::from_str(caps[1].trim())
    {
        return Some(value);
    }

    let assign = NEXT_DATA_ASSIGN_RE.find(html)?;
    // The match ends with the opening brace.
    let start = assign.end() - 1;
    let json_text = extract_json_object(html, start)?;
    serde_json::from_str(json_text).ok()
}

/// Slice out a balanced `{...}` object starting at `start`.
///
/// Braces inside JSON strings (including escaped quotes) are ignored.
fn extract_json_object(source: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (offset, ch) in source[start..].char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&source[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Collect embedded markdown of every node that has an `id` and a `type`/`kind`.
///
/// The first body seen for an id wins.
fn collect_markdown_by_id(data: &Value) -> HashMap<String, String> {
    let mut bodies = HashMap::new();
    let mut stack = vec![data];
    while let Some(value) = stack.pop() {
        match value {
            Value::Object(map) => {
                let id = map.get("id").and_then(Value::as_str).filter(|s| !s.is_empty());
                let has_type = ["type", "kind"]
                    .iter()
                    .any(|k| map.get(*k).and_then(Value::as_str).is_some_and(|s| !s.is_empty()));
                if let Some(id) = id
                    && has_type
                    && !bodies.contains_key(id)
                    && let Some(markdown) = extract_markdown_from_node(value)
                {
                    bodies.insert(id.to_owned(), markdown);
                }
                stack.extend(map.values().rev());
            }
            Value::Array(items) => stack.extend(items.iter().rev()),
            _ => {}
        }
    }
    bodies
}

/// First list (depth-first, document order) that looks like a table of contents.
fn find_table_of_contents(data: &Value) -> Option<&[Value]> {
    let mut stack = vec![data];
    while let Some(value) = stack.pop() {
        match value {
            Value::Object(map) => {
                let candidate = TOC_KEYS
                    .iter()
                    .filter_map(|key| map.get(*key).and_then(Value::as_array))
                    .find(|items| looks_like_toc(items));
                if let Some(items) = candidate {
                    return Some(items.as_slice());
                }
                stack.extend(map.values().rev());
            }
            Value::Array(items) => stack.extend(items.iter().rev()),
            _ => {}
        }
    }
    None
}

fn looks_like_toc(items: &[Value]) -> bool {
    !items.is_empty()
        && items.iter().take(5).all(|item| {
            item.as_object()
                .is_some_and(|m| ["type", "kind", "title"].iter().any(|k| m.contains_key(*k)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceBundle;
    use crate::fetch::fake::FakeFetcher;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn next_data() -> Value {
        json!({
            "props": {
                "pageProps": {
                    "tableOfContents": [
                        {"id": "doc", "title": "Doc", "type": "markdown", "slug": "doc"}
                    ]
                }
            }
        })
    }

    #[test]
    fn test_parses_next_data_with_additional_script_attributes() {
        let base_url = "https://example.com/docs";
        let html = format!(
            r#"<html><head><script id="__NEXT_DATA__" type="application/json" data-ssr="true">{}</script></head></html>"#,
            next_data()
        );
        let fetcher = FakeFetcher::default()
            .with(base_url, &html)
            .with("https://example.com/docs/doc.md", "# Doc");

        let source = HostedSource::connect(base_url, fetcher).unwrap();
        let nodes = source.load_tree().unwrap();

        assert_eq!(nodes.len(), 1);
        assert!(source.markdown(&nodes[0]).unwrap().contains("# Doc"));
    }

    #[test]
    fn test_parses_window_assignment_fallback() {
        let base_url = "https://example.com/alt";
        let html = format!(
            "<html><head><script>window.__NEXT_DATA__ = {};</script></head></html>",
            next_data()
        );
        let fetcher = FakeFetcher::default()
            .with(base_url, &html)
            .with("https://example.com/alt/doc.md", "# Doc");

        let source = HostedSource::connect(base_url, fetcher).unwrap();
        let nodes = source.load_tree().unwrap();

        assert_eq!(nodes.len(), 1);
        assert!(source.markdown(&nodes[0]).unwrap().contains("# Doc"));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let html = format!(r#"<script id="__NEXT_DATA__">{}</script>"#, next_data());
        let fetcher = FakeFetcher::default().with("https://example.com/docs", &html);

        let source = HostedSource::connect("https://example.com/docs/", fetcher).unwrap();
        assert_eq!(source.location(), "https://example.com/docs");
    }

    #[test]
    fn test_markdown_prefers_indexed_node_body() {
        let data = json!({
            "props": {
                "toc": [{"id": "n1", "title": "Guide", "type": "article", "slug": "guide"}],
                "nodes": [{"id": "n1", "type": "article", "data": {"markdown": "Indexed body"}}]
            }
        });
        let html = format!(r#"<script id="__NEXT_DATA__">{data}</script>"#);
        let fetcher = FakeFetcher::default().with("https://example.com", &html);

        let source = HostedSource::connect("https://example.com", fetcher).unwrap();
        let nodes = source.load_tree().unwrap();

        assert_eq!(source.markdown(&nodes[0]).unwrap(), "Indexed body");
        assert_eq!(*source.fetcher.requested.borrow(), vec!["https://example.com"]);
    }

    #[test]
    fn test_landing_page_failure_is_retrieval_error() {
        let err = HostedSource::connect("https://example.com/missing", FakeFetcher::default())
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::Retrieval { .. }));
        assert!(err.to_string().contains("https://example.com/missing"));
    }

    #[test]
    fn test_missing_next_data_is_format_error() {
        let fetcher = FakeFetcher::default().with("https://example.com", "<html></html>");
        let err = HostedSource::connect("https://example.com", fetcher)
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::Format { .. }));
    }

    #[test]
    fn test_page_fetch_failure_aborts_bundle() {
        let html = format!(r#"<script id="__NEXT_DATA__">{}</script>"#, next_data());
        let fetcher = FakeFetcher::default().with("https://example.com", &html);

        let source = HostedSource::connect("https://example.com", fetcher).unwrap();
        let err = SourceBundle::load(&source).unwrap_err();
        assert!(matches!(err, SourceError::Retrieval { ref url, .. } if url == "https://example.com/doc.md"));
    }

    #[test]
    fn test_extract_json_object_ignores_braces_in_strings() {
        let text = r#"x = {"a": "}{", "b": {"c": "\"}"}} trailing"#;
        let start = text.find('{').unwrap();
        assert_eq!(
            extract_json_object(text, start),
            Some(r#"{"a": "}{", "b": {"c": "\"}"}}"#)
        );
    }

    #[test]
    fn test_extract_json_object_unbalanced() {
        assert_eq!(extract_json_object("{\"a\": {", 0), None);
    }

    #[test]
    fn test_find_table_of_contents_skips_non_toc_lists() {
        let data = json!({
            "items": [1, 2, 3],
            "nested": {"children": [{"title": "A", "type": "page"}]}
        });
        let toc = find_table_of_contents(&data).unwrap();
        assert_eq!(toc.len(), 1);
    }

    #[test]
    fn test_collect_markdown_by_id_requires_type() {
        let data = json!([
            {"id": "a", "type": "article", "markdown": "A"},
            {"id": "b", "markdown": "B"},
            {"wrapper": {"id": "c", "kind": "group", "body": {"markdown": "C"}}},
            {"id": "d", "type": "article"}
        ]);
        let bodies = collect_markdown_by_id(&data);
        let mut ids: Vec<_> = bodies.keys().cloned().collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(bodies["c"], "C");
    }
}
