//! Slug generation and per-sibling collision handling.

use std::collections::HashSet;

/// Convert text to a filesystem and URL safe slug.
///
/// Lower-cases ASCII alphanumerics and collapses every run of other
/// characters into a single dash. Returns an empty string when nothing
/// alphanumeric remains.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true; // Prevents leading dash

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// First non-empty slug among `candidates`, else `fallback`.
pub(crate) fn slug_from(candidates: &[&str], fallback: &str) -> String {
    candidates
        .iter()
        .map(|c| slugify(c))
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

/// Slugs already handed out within one sibling set.
#[derive(Debug, Default)]
pub(crate) struct SlugRegistry {
    taken: HashSet<String>,
}

impl SlugRegistry {
    /// Claim `base`, or the first free `base-N` with `N` starting at 2.
    pub(crate) fn claim(&mut self, base: &str) -> String {
        let mut candidate = base.to_owned();
        let mut counter = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}-{counter}");
            counter += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}
