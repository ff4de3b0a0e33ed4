//! Run named tasks.

use std::time::Instant;

use anyhow::Result;
use sluice_config::{Project, RESERVED_TASK};
use sluice_pipeline::{build_graph, EventBus, TaskError, TaskGraph};
use sluice_transforms::TransformRegistry;

use super::serve::{self, ServeOptions};

/// Run the requested tasks in order. `serve` starts the dev server.
pub async fn run(project: Project, tasks: Vec<String>, options: ServeOptions) -> Result<()> {
    let graph = build_graph(
        &project,
        &TransformRegistry::with_builtins(),
        EventBus::default(),
    )?;

    check_tasks(&graph, &tasks)?;

    for task in &tasks {
        if task == RESERVED_TASK {
            serve::run(&project, &graph, &options).await?;
            continue;
        }

        let start = Instant::now();
        let report = graph.run(task).await?;
        tracing::info!(
            "Finished '{}': {} tasks, {} files in {}ms",
            task,
            report.tasks.len(),
            report.files,
            start.elapsed().as_millis()
        );
    }

    Ok(())
}

/// Reject unknown names before anything runs.
fn check_tasks(graph: &TaskGraph, tasks: &[String]) -> Result<(), TaskError> {
    match tasks
        .iter()
        .find(|t| t.as_str() != RESERVED_TASK && !graph.contains(t))
    {
        Some(unknown) => Err(TaskError::UnknownTask(unknown.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn project(root: &Path) -> Project {
        Project::load(&root.join("sluice.toml")).unwrap()
    }

    #[test]
    fn rejects_unknown_tasks_up_front() {
        let temp = TempDir::new().unwrap();
        let project = project(temp.path());
        let graph = build_graph(
            &project,
            &TransformRegistry::with_builtins(),
            EventBus::default(),
        )
        .unwrap();

        let names = vec!["serve".to_string(), "build:dist".to_string()];
        assert!(check_tasks(&graph, &names).is_ok());

        let names = vec!["build:dist".to_string(), "deploy".to_string()];
        let err = check_tasks(&graph, &names).unwrap_err();
        assert_eq!(err.to_string(), "Unknown task 'deploy'");
    }

    #[tokio::test]
    async fn failing_task_is_reported_by_name() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/scss")).unwrap();
        fs::write(temp.path().join("src/scss/spaces.scss"), ".grid {\n  gap: 1px;\n").unwrap();

        let options = ServeOptions {
            port: None,
            open: false,
        };
        let err = run(
            project(temp.path()),
            vec!["build:dist".to_string()],
            options,
        )
        .await
        .unwrap_err();

        let message = format!("{err:#}");
        assert!(message.starts_with("Task 'copy:dist:css' failed: sass:"), "{message}");
        assert!(!temp.path().join("dist/css/spaces.css").exists());
    }

    #[tokio::test]
    async fn runs_tasks_in_order() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/assets/img")).unwrap();
        fs::write(temp.path().join("src/assets/img/a.svg"), "<svg/>").unwrap();

        let options = ServeOptions {
            port: None,
            open: false,
        };
        run(
            project(temp.path()),
            vec!["copy:dist:assets".to_string(), "clean:dev".to_string()],
            options,
        )
        .await
        .unwrap();

        assert!(temp.path().join("dist/assets/img/a.svg").exists());
    }
}
