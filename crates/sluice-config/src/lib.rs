//! Project configuration for sluice.
//!
//! Loads `sluice.toml`, resolves the [`PathTable`] of asset categories and
//! build targets, and validates task and watch declarations before any
//! pipeline runs.

pub mod defaults;
pub mod error;
pub mod glob;
pub mod loader;
pub mod model;
pub mod paths;
pub mod validate;

pub use defaults::{DEFAULT_CONFIG, DEFAULT_SOURCES};
pub use error::ConfigError;
pub use glob::{build_globset, literal_prefix, normalize};
pub use loader::Project;
pub use model::{InputSource, ProjectFile, ServeSection, TransformsSection};
pub use paths::{BuildTarget, PathEntry, PathTable};
pub use validate::{PipelineDecl, TaskDecl, TaskDeclKind, WatchBinding, RESERVED_TASK};
