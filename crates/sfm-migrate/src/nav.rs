//! Fern navigation entries built from the rewritten tree.

use serde::Serialize;

use crate::paths::{PathMap, RewrittenNode};

/// One entry of a Fern `navigation` list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NavEntry {
    /// Page reference.
    Page(NavPage),
    /// Section with nested entries.
    Section(NavSection),
}

/// `- page: Title` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavPage {
    /// Display title.
    pub page: String,
    pub slug: String,
    /// Page file path relative to the `docs.yml` directory.
    pub path: String,
}

/// `- section: Title` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavSection {
    /// Display title.
    pub section: String,
    pub slug: String,
    pub contents: Vec<NavEntry>,
}

impl NavEntry {
    /// Number of entries in this subtree, including itself.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Page(_) => 1,
            Self::Section(section) => 1 + section.contents.iter().map(Self::count).sum::<usize>(),
        }
    }
}

/// Convert the rewritten tree into navigation entries, preserving order.
#[must_use]
pub fn build_navigation(tree: &[RewrittenNode], map: &PathMap) -> Vec<NavEntry> {
    tree.iter()
        .filter_map(|node| match node {
            RewrittenNode::Page(index) => map.records().get(*index).map(|record| {
                NavEntry::Page(NavPage {
                    page: record.title.clone(),
                    slug: record.slug.clone(),
                    path: record.path.clone(),
                })
            }),
            RewrittenNode::Group {
                title,
                slug,
                children,
            } => Some(NavEntry::Section(NavSection {
                section: title.clone(),
                slug: slug.clone(),
                contents: build_navigation(children, map),
            })),
        })
        .collect()
}
