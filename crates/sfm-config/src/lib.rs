//! Configuration for SFM.
//!
//! Reads `sfm.toml` (found by walking up from the working directory, or
//! given explicitly) and layers command-line overrides from [`CliSettings`]
//! on top.
//!
//! ## Environment Variables
//!
//! Some string values may reference the environment:
//!
//! - `${VAR}` fails when VAR is unset
//! - `${VAR:-default}` falls back to `default`
//!
//! Expanded fields:
//! - `source.location`
//! - `hosted.user_agent`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Command-line overrides. `None` leaves the file value in place.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override source location (export directory or hosted docs URL).
    pub source: Option<String>,
    /// Override path to the Fern `docs.yml` file.
    pub docs_yml: Option<PathBuf>,
    /// Override Fern docs root directory.
    pub docs_root: Option<PathBuf>,
    /// Override generated pages directory.
    pub pages_dir: Option<PathBuf>,
    /// Override the navigation section title to merge into.
    pub section: Option<String>,
    /// Override append-vs-replace navigation mode.
    pub append_navigation: Option<bool>,
}

/// File name looked up during discovery.
const CONFIG_FILENAME: &str = "sfm.toml";

/// Page file extensions accepted by Fern.
const PAGE_EXTENSIONS: [&str; 2] = ["md", "mdx"];

/// Migration settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source configuration (location is a raw string from TOML).
    source: SourceConfigRaw,
    /// Target docs configuration (paths are relative strings from TOML).
    docs: DocsConfigRaw,
    /// Navigation merge configuration.
    pub navigation: NavigationConfig,
    /// Hosted Stoplight fetch configuration.
    pub hosted: HostedConfig,

    /// Resolved source location (set after loading).
    #[serde(skip)]
    pub source_resolved: Option<String>,
    /// `[docs]` with paths resolved against the config directory.
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// File the configuration came from, if any.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SourceConfigRaw {
    location: Option<String>,
}

/// `[docs]` table before path resolution.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    docs_yml: Option<String>,
    docs_root: Option<String>,
    pages_dir: Option<String>,
    page_extension: Option<String>,
}

/// Resolved target docs configuration.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Fern `docs.yml` navigation file.
    pub docs_yml: PathBuf,
    /// Root directory of Fern docs content.
    pub docs_root: PathBuf,
    /// Explicit pages directory. `None` means `<docs_root>/pages`.
    pub pages_dir: Option<PathBuf>,
    /// Extension of generated page files, without the dot.
    pub page_extension: String,
}

impl DocsConfig {
    /// Directory generated pages are written to.
    #[must_use]
    pub fn pages_dir(&self) -> PathBuf {
        self.pages_dir
            .clone()
            .unwrap_or_else(|| self.docs_root.join("pages"))
    }
}

/// Navigation merge configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Title of the `section` entry under `navigation` to merge into.
    ///
    /// When unset, the whole top-level `navigation` list is the target.
    pub section: Option<String>,
    /// Append generated entries instead of replacing existing ones.
    pub append: bool,
}

/// Hosted Stoplight site fetch configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HostedConfig {
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Global request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_owned(),
            timeout_secs: 30,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file {} does not exist", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Invalid configuration: {0}")]
    Validation(String),
    /// `${VAR}` reference could not be expanded.
    #[error("Cannot expand {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`source.location`").
        field: String,
        /// Error message (e.g., "${`DOCS_URL`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load `config_path`, or the discovered `sfm.toml`, or defaults.
    ///
    /// Overrides in `cli_settings` win over file values and are applied after
    /// relative paths have been resolved.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source) = &settings.source {
            self.source_resolved = Some(source.clone());
        }
        if let Some(docs_yml) = &settings.docs_yml {
            self.docs_resolved.docs_yml.clone_from(docs_yml);
        }
        if let Some(docs_root) = &settings.docs_root {
            self.docs_resolved.docs_root.clone_from(docs_root);
        }
        if let Some(pages_dir) = &settings.pages_dir {
            self.docs_resolved.pages_dir = Some(pages_dir.clone());
        }
        if let Some(section) = &settings.section {
            self.navigation.section = Some(section.clone());
        }
        if let Some(append) = settings.append_navigation {
            self.navigation.append = append;
        }
    }

    /// Get the source location, from the CLI or `[source] location`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if no source location was given.
    pub fn require_source(&self) -> Result<&str, ConfigError> {
        self.source_resolved.as_deref().ok_or_else(|| {
            ConfigError::Validation(
                "source location required (positional argument or [source] location)".into(),
            )
        })
    }

    /// Nearest `sfm.toml` in the working directory or its ancestors.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Defaults with paths under `base`.
    fn default_with_base(base: &Path) -> Self {
        Self {
            source: SourceConfigRaw::default(),
            docs: DocsConfigRaw::default(),
            navigation: NavigationConfig::default(),
            hosted: HostedConfig::default(),
            source_resolved: None,
            docs_resolved: DocsConfig {
                docs_yml: base.join("docs.yml"),
                docs_root: base.join("docs"),
                pages_dir: None,
                page_extension: "md".to_owned(),
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Check value ranges and required fields.
    ///
    /// Runs after a file is read and again once overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError::Validation` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_docs()?;
        self.validate_navigation()?;
        self.validate_hosted()?;
        if let Some(location) = &self.source_resolved {
            require_non_empty(location, "source.location")?;
        }
        Ok(())
    }

    fn validate_docs(&self) -> Result<(), ConfigError> {
        let ext = &self.docs_resolved.page_extension;
        if !PAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ConfigError::Validation(format!(
                "docs.page_extension must be one of {PAGE_EXTENSIONS:?}, got {ext:?}"
            )));
        }
        if self.docs_resolved.docs_yml.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "docs.docs_yml cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_navigation(&self) -> Result<(), ConfigError> {
        if let Some(section) = &self.navigation.section {
            require_non_empty(section, "navigation.section")?;
        }
        Ok(())
    }

    fn validate_hosted(&self) -> Result<(), ConfigError> {
        const MAX_TIMEOUT_SECS: u64 = 600;

        require_non_empty(&self.hosted.user_agent, "hosted.user_agent")?;
        if self.hosted.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "hosted.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        if self.hosted.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "hosted.timeout_secs cannot exceed {MAX_TIMEOUT_SECS}"
            )));
        }
        Ok(())
    }

    /// Expand `${VAR}` references in the fields that allow them.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref location) = self.source.location {
            self.source.location = Some(expand::expand_env(location, "source.location")?);
        }
        self.hosted.user_agent = expand::expand_env(&self.hosted.user_agent, "hosted.user_agent")?;
        Ok(())
    }

    /// Anchor relative `[docs]` paths at `config_dir`.
    ///
    /// A relative `source.location` that exists next to the config file is
    /// resolved too; URLs are kept verbatim.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.docs_resolved = DocsConfig {
            docs_yml: resolve(self.docs.docs_yml.as_deref(), "docs.yml"),
            docs_root: resolve(self.docs.docs_root.as_deref(), "docs"),
            pages_dir: self.docs.pages_dir.as_deref().map(|d| config_dir.join(d)),
            page_extension: self
                .docs
                .page_extension
                .as_deref()
                .unwrap_or("md")
                .trim_start_matches('.')
                .to_owned(),
        };

        self.source_resolved = self.source.location.as_ref().map(|location| {
            let candidate = config_dir.join(location);
            if !is_url(location) && candidate.exists() {
                candidate.to_string_lossy().into_owned()
            } else {
                location.clone()
            }
        });
    }
}

/// Check whether a source location is an http(s) URL.
#[must_use]
pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
