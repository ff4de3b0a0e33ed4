//! Pipeline and task errors.

use std::path::PathBuf;

use sluice_transforms::TransformError;

/// Errors raised while executing a single pipeline or clean step.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by [`TaskGraph::run`](crate::TaskGraph::run).
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task '{task}' failed: {source}")]
    Failed {
        task: String,
        #[source]
        source: PipelineError,
    },

    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    #[error("Task '{task}' did not complete: {message}")]
    Aborted { task: String, message: String },
}

impl TaskError {
    /// Name of the leaf task that failed, if known.
    pub fn task(&self) -> &str {
        match self {
            TaskError::Failed { task, .. } | TaskError::Aborted { task, .. } => task,
            TaskError::UnknownTask(task) => task,
        }
    }
}
