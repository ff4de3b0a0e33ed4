//! Project file structure (sluice.toml).

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::paths::BuildTarget;

/// Raw project file as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    #[serde(default)]
    pub targets: TargetsSection,

    #[serde(default)]
    pub transforms: TransformsSection,

    #[serde(default)]
    pub serve: ServeSection,

    /// Asset categories by name
    #[serde(default)]
    pub category: BTreeMap<String, CategoryConfig>,

    /// Named tasks
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Watch bindings used by `serve`
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

/// Root directories of the three build targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetsSection {
    #[serde(default = "default_temp")]
    pub temp: String,
    #[serde(default = "default_dev")]
    pub dev: String,
    #[serde(default = "default_dist")]
    pub dist: String,
}

impl Default for TargetsSection {
    fn default() -> Self {
        Self {
            temp: default_temp(),
            dev: default_dev(),
            dist: default_dist(),
        }
    }
}

fn default_temp() -> String {
    ".temp".to_string()
}
fn default_dev() -> String {
    "html&css".to_string()
}
fn default_dist() -> String {
    "dist".to_string()
}

/// Settings shared by every transform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformsSection {
    /// Directory `include-partials` resolves partials against
    #[serde(default = "default_partials")]
    pub partials: String,

    /// Directive prefix for `include-partials`
    #[serde(default = "default_include_prefix")]
    pub include_prefix: String,

    /// Browserslist queries for `autoprefix`
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

impl Default for TransformsSection {
    fn default() -> Self {
        Self {
            partials: default_partials(),
            include_prefix: default_include_prefix(),
            browsers: default_browsers(),
        }
    }
}

fn default_partials() -> String {
    "src/partials".to_string()
}
fn default_include_prefix() -> String {
    "@@".to_string()
}
fn default_browsers() -> Vec<String> {
    vec!["> 1%".to_string()]
}

/// Development server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServeSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Open a browser once the server is listening
    #[serde(default = "default_open")]
    pub open: bool,

    /// Quiet period before a watch binding triggers
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Tasks run once before serving
    #[serde(default)]
    pub build: Vec<String>,

    /// Target whose root is served
    #[serde(default = "default_serve_target")]
    pub target: BuildTarget,
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open: default_open(),
            debounce_ms: default_debounce_ms(),
            build: Vec::new(),
            target: default_serve_target(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_open() -> bool {
    true
}
fn default_debounce_ms() -> u64 {
    200
}
fn default_serve_target() -> BuildTarget {
    BuildTarget::Temp
}

/// One asset category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryConfig {
    /// Directory the source globs are relative to
    pub base: String,

    /// Source globs
    pub sources: Vec<String>,

    /// Sub-directory under each target root
    #[serde(default)]
    pub output: String,
}

/// Where a pipeline reads its files from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    /// The category's source base and globs
    #[default]
    Source,
    /// The category's destination directory for the pipeline's target
    Output,
}

/// A task declaration. Exactly one of `category`, `clean`, `series` or
/// `parallel` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Category a pipeline task processes
    pub category: Option<String>,

    /// Target a pipeline writes to
    pub target: Option<BuildTarget>,

    #[serde(default)]
    pub from: InputSource,

    /// Glob filter; defaults to the category's sources, or `**/*` when
    /// reading from output
    #[serde(default)]
    pub sources: Vec<String>,

    /// Transform names applied in order
    #[serde(default)]
    pub transforms: Vec<String>,

    /// Remove the destination directory before writing
    #[serde(default)]
    pub replace: bool,

    /// Target root removed by a clean task
    pub clean: Option<BuildTarget>,

    /// Sub-tasks run in order
    pub series: Option<Vec<String>>,

    /// Sub-tasks run concurrently
    pub parallel: Option<Vec<String>>,

    pub description: Option<String>,
}

/// A watch binding: when a file matching `globs` changes, run `tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Globs relative to the project root
    pub globs: Vec<String>,

    /// Tasks run in order once the debounce window elapses
    pub tasks: Vec<String>,
}
