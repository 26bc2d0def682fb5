//! Merging generated navigation into an existing Fern `docs.yml`.
//!
//! The file is handled as an insertion-ordered YAML mapping. Only the
//! designated navigation list is touched; every other key keeps its value
//! and position.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::MigrateError;
use crate::nav::NavEntry;

const NAVIGATION_KEY: &str = "navigation";
const SECTION_KEY: &str = "section";
const CONTENTS_KEY: &str = "contents";

/// Where and how generated entries are merged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Title of the `navigation` item whose `contents` receive the entries.
    /// `None` targets the top-level `navigation` list itself.
    pub section: Option<String>,
    /// Append after existing entries instead of replacing them.
    pub append: bool,
}

/// What a merge did to the designated list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The list did not exist and was created.
    Created,
    /// Existing entries were discarded.
    Replaced { previous: usize },
    /// Entries were added after the existing ones.
    Appended { existing: usize },
}

/// A `docs.yml` file loaded for merging.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetConfig {
    path: PathBuf,
    root: Mapping,
    existed: bool,
}

impl TargetConfig {
    /// Load `path`. A missing or empty file is an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::ConfigShape`] if the file is not valid YAML
    /// or its top level is not a mapping, and [`MigrateError::Io`] if it
    /// cannot be read.
    pub fn load(path: &Path) -> Result<Self, MigrateError> {
        if !path.exists() {
            debug!("{} does not exist, starting from an empty config", path.display());
            return Ok(Self::empty(path));
        }
        let content = fs::read_to_string(path).map_err(|e| MigrateError::io(path, e))?;
        let mut config = Self::parse(path, &content)?;
        config.existed = true;
        Ok(config)
    }

    /// Parse YAML text as the content of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::ConfigShape`] on invalid YAML or a non-mapping
    /// top level.
    pub fn parse(path: &Path, content: &str) -> Result<Self, MigrateError> {
        if content.trim().is_empty() {
            return Ok(Self::empty(path));
        }
        let value: Value = serde_yaml::from_str(content)
            .map_err(|e| MigrateError::shape(path, format!("invalid YAML: {e}")))?;
        let root = match value {
            Value::Mapping(root) => root,
            Value::Null => Mapping::new(),
            _ => return Err(MigrateError::shape(path, "expected a mapping at the top level")),
        };
        Ok(Self {
            path: path.to_path_buf(),
            root,
            existed: false,
        })
    }

    fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            root: Mapping::new(),
            existed: false,
        }
    }

    /// Path the config was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file existed on disk when loaded.
    #[must_use]
    pub fn existed(&self) -> bool {
        self.existed
    }

    /// Top-level mapping.
    #[must_use]
    pub fn root(&self) -> &Mapping {
        &self.root
    }

    /// Merge `entries` into the designated navigation list.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::ConfigShape`] if `navigation` or the section's
    /// `contents` is not a list, and [`MigrateError::Yaml`] if the entries
    /// cannot be converted to YAML.
    pub fn merge(
        &mut self,
        entries: &[NavEntry],
        options: &MergeOptions,
    ) -> Result<MergeOutcome, MigrateError> {
        let Value::Sequence(new_entries) = serde_yaml::to_value(entries)? else {
            return Err(MigrateError::shape(&self.path, "navigation entries must form a list"));
        };

        if matches!(self.root.get(NAVIGATION_KEY), None | Some(Value::Null)) {
            debug!("Creating '{}' list in {}", NAVIGATION_KEY, self.path.display());
            self.root.insert(
                Value::String(NAVIGATION_KEY.to_owned()),
                Value::Sequence(Vec::new()),
            );
        }
        let Some(Value::Sequence(navigation)) = self.root.get_mut(NAVIGATION_KEY) else {
            return Err(MigrateError::shape(&self.path, "'navigation' must be a list"));
        };

        let target = match options.section.as_deref() {
            None => navigation,
            Some(title) => section_contents(navigation, title, &self.path)?,
        };

        Ok(merge_list(target, new_entries, options.append))
    }

    /// Serialise the mapping back to YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Yaml`] if serialisation fails.
    pub fn to_yaml(&self) -> Result<String, MigrateError> {
        if self.root.is_empty() {
            return Ok(String::new());
        }
        Ok(serde_yaml::to_string(&self.root)?)
    }
}

/// `contents` list of the navigation item titled `title`, created if missing.
fn section_contents<'a>(
    navigation: &'a mut Vec<Value>,
    title: &str,
    path: &Path,
) -> Result<&'a mut Vec<Value>, MigrateError> {
    let position = navigation.iter().position(|item| {
        item.get(SECTION_KEY).and_then(Value::as_str) == Some(title)
    });

    let index = if let Some(index) = position {
        index
    } else {
        debug!("Creating section '{}' in {}", title, path.display());
        let mut section = Mapping::new();
        section.insert(
            Value::String(SECTION_KEY.to_owned()),
            Value::String(title.to_owned()),
        );
        navigation.push(Value::Mapping(section));
        navigation.len() - 1
    };

    let Some(Value::Mapping(section)) = navigation.get_mut(index) else {
        return Err(MigrateError::shape(path, format!("section '{title}' must be a mapping")));
    };

    if matches!(section.get(CONTENTS_KEY), None | Some(Value::Null)) {
        section.insert(
            Value::String(CONTENTS_KEY.to_owned()),
            Value::Sequence(Vec::new()),
        );
    }

    match section.get_mut(CONTENTS_KEY) {
        Some(Value::Sequence(contents)) => Ok(contents),
        _ => Err(MigrateError::shape(
            path,
            format!("'contents' of section '{title}' must be a list"),
        )),
    }
}

fn merge_list(target: &mut Vec<Value>, entries: Vec<Value>, append: bool) -> MergeOutcome {
    let outcome = if append {
        MergeOutcome::Appended {
            existing: target.len(),
        }
    } else if target.is_empty() {
        MergeOutcome::Created
    } else {
        MergeOutcome::Replaced {
            previous: target.len(),
        }
    };

    if !append {
        target.clear();
    }
    target.extend(entries);
    outcome
}
