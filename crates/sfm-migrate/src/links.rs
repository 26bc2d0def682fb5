//! Cross-page link rewriting.
//!
//! Link destinations are located with `pulldown-cmark` source offsets, so
//! only real links and reference definitions are touched. Code spans, code
//! blocks and link text stay byte-for-byte identical.

use std::ops::Range;

use pulldown_cmark::{Event, LinkType, Options, Parser, Tag};
use sfm_source::has_markdown_extension;

use crate::context::{Warning, Warnings};
use crate::paths::{PageRecord, PathMap};

/// Rewrites internal links in page bodies to target page paths.
pub struct LinkRewriter<'a> {
    map: &'a PathMap,
}

impl<'a> LinkRewriter<'a> {
    #[must_use]
    pub fn new(map: &'a PathMap) -> Self {
        Self { map }
    }

    /// Rewrite the links in `page`'s body.
    ///
    /// Resolved destinations become paths relative to the page's own target
    /// directory, keeping any `#anchor`. Internal-looking destinations that
    /// match no page are left as written and reported once each, as are
    /// resolved links whose source text cannot be located.
    pub fn rewrite(&self, page: &PageRecord, warnings: &mut Warnings) -> String {
        let body = page.body.as_str();
        let mut out = String::with_capacity(body.len());
        let mut cursor = 0;

        for (token, dest) in link_destinations(body) {
            if token.as_ref().is_some_and(|range| range.start < cursor) {
                continue;
            }
            let Some(replacement) = self.rewrite_destination(&dest, page, warnings) else {
                continue;
            };
            let Some(range) = token else {
                warnings.push(Warning::UnlocatedLink {
                    page: page.path.clone(),
                    target: dest,
                });
                continue;
            };
            out.push_str(&body[cursor..range.start]);
            out.push_str(&replacement);
            cursor = range.end;
        }

        out.push_str(&body[cursor..]);
        out
    }

    fn rewrite_destination(
        &self,
        dest: &str,
        page: &PageRecord,
        warnings: &mut Warnings,
    ) -> Option<String> {
        let (path, fragment) = internal_target(dest)?;

        let target = self.lookup(path, &page.source_id);
        let Some(target) = target else {
            warnings.push(Warning::UnresolvedLink {
                page: page.path.clone(),
                target: dest.to_owned(),
            });
            return None;
        };

        let rewritten = format!("{}{fragment}", relative_link(&page.path, &target.path));
        (rewritten != dest).then_some(rewritten)
    }

    /// Resolve against the referring document's own location first.
    fn lookup(&self, path: &str, source_id: &str) -> Option<&'a PageRecord> {
        if !path.starts_with('/')
            && let Some((source_dir, _)) = source_id.rsplit_once('/')
            && let Some(found) = self.map.resolve(&resolve_relative_path(path, source_dir))
        {
            return Some(found);
        }
        self.map.resolve(path)
    }
}

/// Rewrite every page body in `map` in place.
pub fn rewrite_all(map: &mut PathMap, warnings: &mut Warnings) {
    let bodies: Vec<String> = {
        let rewriter = LinkRewriter::new(map);
        map.records()
            .iter()
            .map(|page| rewriter.rewrite(page, warnings))
            .collect()
    };
    for (page, body) in map.records_mut().iter_mut().zip(bodies) {
        page.body = body;
    }
}

/// Parsed link destinations in document order, with the byte range of the
/// token that spells each one when it can be found.
fn link_destinations(body: &str) -> Vec<(Option<Range<usize>>, String)> {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM;
    let parser = Parser::new_ext(body, options);

    let mut found: Vec<(usize, Option<Range<usize>>, String)> = parser
        .reference_definitions()
        .iter()
        .map(|(_, def)| {
            let dest = def.dest.to_string();
            let token = locate_in_definition(body, def.span.clone(), &dest);
            (def.span.start, token, dest)
        })
        .collect();

    for (event, span) in parser.into_offset_iter() {
        if let Event::Start(Tag::Link {
            link_type: LinkType::Inline,
            dest_url,
            ..
        }) = event
        {
            let dest = dest_url.into_string();
            let token = locate_inline(body, span.clone(), &dest);
            found.push((span.start, token, dest));
        }
    }

    found.sort_by_key(|(start, _, _)| *start);
    found
        .into_iter()
        .map(|(_, token, dest)| (token, dest))
        .collect()
}

/// Find the destination token of `[text](dest ...)` within `span`.
///
/// Searches `](` from the end so brackets inside the link text are skipped.
fn locate_inline(body: &str, span: Range<usize>, dest: &str) -> Option<Range<usize>> {
    let text = body.get(span.clone())?;
    let mut search_end = text.len();
    while let Some(pos) = text[..search_end].rfind("](") {
        if let Some(range) = destination_at(text, pos + 2)
            && spells(text, &range, dest)
        {
            return Some(span.start + range.start..span.start + range.end);
        }
        search_end = pos;
    }
    None
}

/// Find the destination token of `[label]: dest ...` within `span`.
fn locate_in_definition(body: &str, span: Range<usize>, dest: &str) -> Option<Range<usize>> {
    let text = body.get(span.clone())?;
    let pos = text.find("]:")?;
    let range = destination_at(text, pos + 2)?;
    spells(text, &range, dest).then(|| span.start + range.start..span.start + range.end)
}

/// Whether the token at `range` parses to `dest`.
///
/// Tokens may spell the destination with backslash escapes or character
/// references, so anything but an exact match is re-parsed on its own.
fn spells(text: &str, range: &Range<usize>, dest: &str) -> bool {
    let raw = &text[range.clone()];
    if raw == dest {
        return true;
    }
    let angle = range.start > 0 && text.as_bytes()[range.start - 1] == b'<';
    parsed_destination(raw, angle).is_some_and(|parsed| parsed == dest)
}

/// Destination value of a raw token, as a standalone inline link.
fn parsed_destination(raw: &str, angle: bool) -> Option<String> {
    let source = if angle {
        format!("[x](<{raw}>)")
    } else {
        format!("[x]({raw})")
    };
    Parser::new(&source).find_map(|event| match event {
        Event::Start(Tag::Link { dest_url, .. }) => Some(dest_url.into_string()),
        _ => None,
    })
}

/// Destination token starting at or after `start` (whitespace skipped).
///
/// Angle-bracketed destinations exclude the brackets. Bare ones end at
/// whitespace or an unbalanced `)`.
fn destination_at(text: &str, start: usize) -> Option<Range<usize>> {
    let rest = text.get(start..)?;
    let begin = start + (rest.len() - rest.trim_start().len());

    if text[begin..].starts_with('<') {
        let end = text[begin + 1..].find('>')? + begin + 1;
        return Some(begin + 1..end);
    }

    let mut depth = 0usize;
    let mut escaped = false;
    let end = text[begin..]
        .char_indices()
        .find(|&(_, c)| {
            if escaped {
                escaped = false;
                return false;
            }
            match c {
                '\\' => {
                    escaped = true;
                    false
                }
                '(' => {
                    depth += 1;
                    false
                }
                ')' if depth == 0 => true,
                ')' => {
                    depth -= 1;
                    false
                }
                _ => c.is_whitespace(),
            }
        })
        .map_or(text.len(), |(i, _)| begin + i);

    Some(begin..end)
}

/// Split an internal-looking destination into path and `#fragment`.
///
/// Returns `None` for external URLs, pure fragments, bare `/` and
/// non-markdown assets.
fn internal_target(dest: &str) -> Option<(&str, &str)> {
    if dest.is_empty() || dest.starts_with('#') || dest.starts_with("//") || has_scheme(dest) {
        return None;
    }

    let (path, fragment) = match dest.find('#') {
        Some(pos) => (&dest[..pos], &dest[pos..]),
        None => (dest, ""),
    };

    let file = path.split('?').next().unwrap_or_default();
    if file.trim_matches('/').is_empty() {
        return None;
    }
    let last = file.rsplit('/').next().unwrap_or_default();
    if last.contains('.') && last.trim_matches('.') != "" && !has_markdown_extension(last) {
        return None;
    }

    Some((path, fragment))
}

/// Whether `dest` starts with a URL scheme such as `https:` or `mailto:`.
fn has_scheme(dest: &str) -> bool {
    dest.split_once(':').is_some_and(|(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Resolve a relative path against a base directory.
fn resolve_relative_path(relative: &str, base: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();

    for component in relative.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(component),
        }
    }

    segments.join("/")
}

/// Path of `to` relative to the directory containing `from`.
///
/// Both are `/`-separated paths relative to the same root.
pub(crate) fn relative_link(from: &str, to: &str) -> String {
    let mut from_dir: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    from_dir.pop();
    let target: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let target_dir = &target[..target.len().saturating_sub(1)];
    let common = from_dir
        .iter()
        .zip(target_dir)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts = vec![".."; from_dir.len() - common];
    parts.extend_from_slice(&target[common..]);
    parts.join("/")
}
