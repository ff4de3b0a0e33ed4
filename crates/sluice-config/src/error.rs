//! Configuration errors.

use std::path::PathBuf;

/// Errors in the project file, the path table or the task graph.
///
/// All of these are detected before any pipeline touches the filesystem.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("Invalid build targets: {0}")]
    InvalidTargets(String),

    #[error("Category '{category}': {message}")]
    InvalidCategory { category: String, message: String },

    #[error("Task '{task}' uses unknown category '{category}'")]
    UnknownCategory { task: String, category: String },

    #[error("Task '{task}': {message}")]
    InvalidTask { task: String, message: String },

    #[error("Task '{task}' uses unknown transform '{transform}'")]
    UnknownTransform { task: String, transform: String },

    #[error("{referenced_by} references unknown task '{task}'")]
    UnknownTask { referenced_by: String, task: String },

    #[error("Task '{0}' is defined more than once")]
    DuplicateTask(String),

    #[error("Cycle detected in task graph involving '{0}'")]
    Cycle(String),

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Watch binding #{index}: {message}")]
    InvalidWatch { index: usize, message: String },

    #[error("Invalid serve settings: {0}")]
    InvalidServe(String),
}
