//! Trait definitions for file set transforms.

use std::path::PathBuf;

use crate::fileset::FileSet;

/// Context shared by every transform in a project.
#[derive(Debug, Clone)]
pub struct TransformContext {
    /// Directory that `include-partials` resolves includes against
    pub partials_dir: PathBuf,

    /// Marker that introduces includes and variables (e.g. "@@")
    pub include_prefix: String,

    /// Browserslist queries used for vendor prefixing
    pub browsers: Vec<String>,
}

impl Default for TransformContext {
    fn default() -> Self {
        Self {
            partials_dir: PathBuf::from("src/partials"),
            include_prefix: "@@".to_string(),
            browsers: vec!["> 1%".to_string()],
        }
    }
}

/// Errors that can occur while applying a transform.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("{transform}: {path}: {message}")]
    Syntax {
        transform: String,
        path: String,
        message: String,
    },

    #[error("{transform}: {path}: {source}")]
    Io {
        transform: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{transform}: {path}: file is not valid UTF-8")]
    NotText { transform: String, path: String },

    #[error("{transform}: {message}")]
    Config { transform: String, message: String },
}

impl TransformError {
    /// Build a syntax/processing error for a file.
    pub fn syntax(
        transform: impl Into<String>,
        path: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::Syntax {
            transform: transform.into(),
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Logical path of the file that caused the error, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Syntax { path, .. } | Self::Io { path, .. } | Self::NotText { path, .. } => {
                Some(path)
            }
            Self::Config { .. } => None,
        }
    }
}

/// A named step that turns one file set into another.
///
/// Implementations are opaque to the pipeline: any compiler, minifier or
/// optimizer can sit behind this contract.
pub trait Transform: Send + Sync {
    /// Registry name (e.g. "sass", "minify-css")
    fn name(&self) -> &str;

    /// Apply the transform to a file set.
    fn apply(&self, files: FileSet, ctx: &TransformContext) -> Result<FileSet, TransformError>;
}

/// Borrow a file's contents as text or fail with [`TransformError::NotText`].
pub(crate) fn require_text<'a>(
    transform: &str,
    path: &str,
    contents: &'a [u8],
) -> Result<&'a str, TransformError> {
    std::str::from_utf8(contents).map_err(|_| TransformError::NotText {
        transform: transform.to_string(),
        path: path.to_string(),
    })
}
