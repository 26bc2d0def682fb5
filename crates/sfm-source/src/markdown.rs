//! Inline markdown lookup inside Stoplight node JSON.

use serde_json::Value;

/// Locations where Stoplight nodes embed their markdown.
const MARKDOWN_PATHS: [&[&str]; 4] = [
    &["markdown"],
    &["data", "markdown"],
    &["document", "markdown"],
    &["body", "markdown"],
];

/// Keys holding the text when the markdown value is an object.
const TEXT_KEYS: [&str; 4] = ["content", "raw", "plain", "text"];

/// Extract markdown embedded in a node, if any.
///
/// The value at each known location is either the markdown string itself or
/// an object carrying it under one of the text keys.
pub(crate) fn extract_markdown_from_node(node: &Value) -> Option<String> {
    MARKDOWN_PATHS.iter().find_map(|path| {
        let value = path.iter().try_fold(node, |current, key| current.get(*key))?;
        match value {
            Value::String(text) => Some(text.clone()),
            Value::Object(map) => TEXT_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_owned),
            _ => None,
        }
    })
}
