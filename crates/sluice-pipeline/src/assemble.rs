//! Build a [`TaskGraph`] from a validated project.

use std::sync::Arc;

use sluice_config::{ConfigError, Project, TaskDeclKind};
use sluice_transforms::{TransformContext, TransformRegistry};

use crate::events::EventBus;
use crate::graph::{TaskGraph, TaskGraphBuilder, TaskKind};
use crate::pipeline::Pipeline;

/// Transform settings for a project, with paths resolved against its root.
pub fn transform_context(project: &Project) -> TransformContext {
    let settings = project.transforms();
    TransformContext {
        partials_dir: project.partials_dir(),
        include_prefix: settings.include_prefix.clone(),
        browsers: settings.browsers.clone(),
    }
}

/// Resolve every task declaration into a finalized graph.
///
/// Categories come from the project's path table and transform names from
/// `registry`.
pub fn build_graph(
    project: &Project,
    registry: &TransformRegistry,
    events: EventBus,
) -> Result<TaskGraph, ConfigError> {
    let mut builder = TaskGraphBuilder::new(transform_context(project), events);

    for decl in project.tasks() {
        let kind = match &decl.kind {
            TaskDeclKind::Pipeline(pipeline) => {
                let entry = project.paths().entry(&pipeline.category).ok_or_else(|| {
                    ConfigError::UnknownCategory {
                        task: decl.name.clone(),
                        category: pipeline.category.clone(),
                    }
                })?;

                let transforms = pipeline
                    .transforms
                    .iter()
                    .map(|name| {
                        registry.get(name).ok_or_else(|| ConfigError::UnknownTransform {
                            task: decl.name.clone(),
                            transform: name.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                TaskKind::Pipeline(Arc::new(Pipeline::new(
                    &decl.name,
                    entry,
                    pipeline,
                    transforms,
                )?))
            }
            TaskDeclKind::Clean(target) => {
                TaskKind::Clean(project.paths().target_root(*target).to_path_buf())
            }
            TaskDeclKind::Series(names) => TaskKind::Series(names.clone()),
            TaskDeclKind::Parallel(names) => TaskKind::Parallel(names.clone()),
        };
        builder.define_task(&decl.name, kind);
    }

    let graph = builder.finalize()?;
    tracing::debug!("Task graph ready with {} tasks", project.tasks().len());
    Ok(graph)
}
