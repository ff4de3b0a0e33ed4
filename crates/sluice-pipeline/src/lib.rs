//! Pipelines and task graph execution for sluice.
//!
//! A [`Pipeline`] reads one asset category, runs its transforms in order and
//! writes the result to a build target. A [`TaskGraph`] names pipelines and
//! composes them into series and parallel groups.

pub mod assemble;
pub mod error;
pub mod events;
pub mod graph;
pub mod pipeline;
pub mod source;

pub use assemble::{build_graph, transform_context};
pub use error::{PipelineError, TaskError};
pub use events::{BuildEvent, EventBus};
pub use graph::{RunReport, TaskGraph, TaskGraphBuilder, TaskKind};
pub use pipeline::Pipeline;
pub use source::SourceSet;
