use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{MendError, MendResult};
use crate::position::Bound;
use crate::walker::PathFilter;

/// Settings for one run, constructed once at the boundary. Everything a run
/// can be told lives in this one explicit struct; there is no ambient global
/// state.
///
/// # Configuration Locations
///
/// Values are layered from YAML files in order of precedence:
///
/// 1. Custom config file passed via `--config`
/// 2. Local `.rustmend.yaml` in the current directory
/// 3. Global `$HOME/.config/rustmend/config.yaml`
///
/// # Configuration Format
///
/// Configuration files use YAML format:
///
/// ```yaml
/// root_path: "."
/// extensions: ["php", "phtml"]
/// include_extensionless: false
/// exclude_patterns: ["**/vendor/**"]
/// default_no: true
/// editor: "vim"
/// log_level: "warn"
/// ```
///
/// # CLI Integration
///
/// Command-line arguments take precedence over all file values; the merging
/// behavior is defined in [`RunConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Root directory to walk
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Extension entries to admit (shell wildcards allowed).
    /// `None` admits every file, as does an empty list.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,

    /// Also admit files without an extension
    #[serde(default)]
    pub include_extensionless: bool,

    /// Paths to drop, as glob patterns against the whole path
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Start bound: a `path:line` position or a percentage
    #[serde(default)]
    pub start: Option<Bound>,

    /// End bound (exclusive): a `path:line` position or a percentage
    #[serde(default)]
    pub end: Option<Bound>,

    /// Answer every patch with accept, without prompting
    #[serde(default)]
    pub accept_all: bool,

    /// Make reject the default prompt answer, and reject on
    /// unrecognized input
    #[serde(default)]
    pub default_no: bool,

    /// Editor command for manual edits; falls back to `$EDITOR`, then vim
    #[serde(default)]
    pub editor: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            extensions: None,
            include_extensionless: false,
            exclude_patterns: Vec::new(),
            start: None,
            end: None,
            accept_all: false,
            default_no: false,
            editor: None,
            log_level: default_log_level(),
        }
    }
}

impl RunConfig {
    /// Loads configuration from the default locations
    pub fn load() -> MendResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally layering an explicit file on top of
    /// the default locations. An explicit file that does not exist is an
    /// error; missing default files are fine.
    pub fn load_from(config_path: Option<&Path>) -> MendResult<Self> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(MendError::config_error(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
        }

        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("rustmend/config.yaml")),
            Some(PathBuf::from(".rustmend.yaml")),
            config_path.map(PathBuf::from),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| MendError::config_error(e.to_string()))
    }

    /// Merges CLI arguments over file values; CLI wins wherever it deviates
    /// from the defaults.
    pub fn merge_with_cli(mut self, cli: RunConfig) -> Self {
        if cli.root_path != default_root_path() {
            self.root_path = cli.root_path;
        }
        if cli.extensions.is_some() {
            self.extensions = cli.extensions;
        }
        if cli.include_extensionless {
            self.include_extensionless = true;
        }
        if !cli.exclude_patterns.is_empty() {
            self.exclude_patterns = cli.exclude_patterns;
        }
        if cli.start.is_some() {
            self.start = cli.start;
        }
        if cli.end.is_some() {
            self.end = cli.end;
        }
        if cli.accept_all {
            self.accept_all = true;
        }
        if cli.default_no {
            self.default_no = true;
        }
        if cli.editor.is_some() {
            self.editor = cli.editor;
        }
        if cli.log_level != default_log_level() {
            self.log_level = cli.log_level;
        }
        self
    }

    /// The file filter this configuration describes. An empty extension list
    /// means no restriction, same as `None`.
    pub fn path_filter(&self) -> PathFilter {
        let extensions = match &self.extensions {
            Some(entries) if entries.is_empty() => None,
            other => other.clone(),
        };
        PathFilter {
            root: self.root_path.clone(),
            extensions,
            include_extensionless: self.include_extensionless,
            exclude_patterns: self.exclude_patterns.clone(),
        }
    }

    /// Editor command for manual edits: the configured override, else
    /// `$EDITOR`, else vim.
    pub fn resolve_editor(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.is_empty()))
            .unwrap_or_else(|| "vim".to_string())
    }
}
