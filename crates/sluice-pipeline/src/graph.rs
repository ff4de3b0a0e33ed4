//! Task graph: named leaves and composites, validated once and then run.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use sluice_config::ConfigError;
use sluice_transforms::TransformContext;
use tokio::task::JoinSet;

use crate::error::{PipelineError, TaskError};
use crate::events::{BuildEvent, EventBus};
use crate::pipeline::Pipeline;

/// What a task does when run.
#[derive(Debug, Clone)]
pub enum TaskKind {
    /// Run a pipeline
    Pipeline(Arc<Pipeline>),
    /// Remove a directory tree
    Clean(PathBuf),
    /// Run sub-tasks one after another, stopping at the first failure
    Series(Vec<String>),
    /// Run sub-tasks concurrently
    Parallel(Vec<String>),
}

impl TaskKind {
    fn children(&self) -> &[String] {
        match self {
            TaskKind::Series(names) | TaskKind::Parallel(names) => names,
            _ => &[],
        }
    }
}

/// Summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Leaf tasks in completion order
    pub tasks: Vec<String>,
    /// Files written by pipelines
    pub files: usize,
}

impl RunReport {
    fn merge(&mut self, other: RunReport) {
        self.tasks.extend(other.tasks);
        self.files += other.files;
    }
}

/// Collects task definitions; [`finalize`](Self::finalize) validates them.
#[derive(Debug)]
pub struct TaskGraphBuilder {
    tasks: Vec<(String, TaskKind)>,
    context: TransformContext,
    events: EventBus,
}

impl TaskGraphBuilder {
    pub fn new(context: TransformContext, events: EventBus) -> Self {
        Self {
            tasks: Vec::new(),
            context,
            events,
        }
    }

    pub fn define_task(&mut self, name: impl Into<String>, kind: TaskKind) -> &mut Self {
        self.tasks.push((name.into(), kind));
        self
    }

    /// Reject duplicate names, unknown sub-tasks and cycles.
    pub fn finalize(self) -> Result<TaskGraph, ConfigError> {
        let mut tasks = HashMap::with_capacity(self.tasks.len());
        for (name, kind) in self.tasks {
            if tasks.contains_key(&name) {
                return Err(ConfigError::DuplicateTask(name));
            }
            tasks.insert(name, kind);
        }

        check_references(&tasks)?;

        Ok(TaskGraph {
            inner: Arc::new(GraphInner {
                tasks,
                context: self.context,
                events: self.events,
            }),
        })
    }
}

fn check_references(tasks: &HashMap<String, TaskKind>) -> Result<(), ConfigError> {
    let mut names: Vec<&String> = tasks.keys().collect();
    names.sort();

    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in &names {
        graph.add_node(name.as_str());
    }
    for name in &names {
        for child in tasks[*name].children() {
            if !tasks.contains_key(child) {
                return Err(ConfigError::UnknownTask {
                    referenced_by: format!("Task '{}'", name),
                    task: child.clone(),
                });
            }
            graph.add_edge(name.as_str(), child.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_) => Ok(()),
        Err(cycle) => Err(ConfigError::Cycle(cycle.node_id().to_string())),
    }
}

struct GraphInner {
    tasks: HashMap<String, TaskKind>,
    context: TransformContext,
    events: EventBus,
}

/// A validated, acyclic task graph. Cheap to clone.
#[derive(Clone)]
pub struct TaskGraph {
    inner: Arc<GraphInner>,
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.inner.tasks.keys().collect();
        names.sort();
        f.debug_struct("TaskGraph").field("tasks", &names).finish()
    }
}

type TaskFuture = Pin<Box<dyn Future<Output = Result<RunReport, TaskError>> + Send>>;

impl TaskGraph {
    pub fn contains(&self, name: &str) -> bool {
        self.inner.tasks.contains_key(name)
    }

    pub fn kind(&self, name: &str) -> Option<&TaskKind> {
        self.inner.tasks.get(name)
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Run one task to completion.
    pub async fn run(&self, name: &str) -> Result<RunReport, TaskError> {
        if !self.contains(name) {
            return Err(TaskError::UnknownTask(name.to_string()));
        }
        self.run_task(name.to_string()).await
    }

    /// Run several tasks in order, stopping at the first failure.
    pub async fn run_all<S: AsRef<str>>(&self, names: &[S]) -> Result<RunReport, TaskError> {
        let mut report = RunReport::default();
        for name in names {
            report.merge(self.run(name.as_ref()).await?);
        }
        Ok(report)
    }

    fn run_task(&self, name: String) -> TaskFuture {
        let graph = self.clone();
        Box::pin(async move {
            let kind = graph
                .inner
                .tasks
                .get(&name)
                .cloned()
                .ok_or_else(|| TaskError::UnknownTask(name.clone()))?;

            match kind {
                TaskKind::Series(children) => {
                    tracing::debug!("[{}] series of {}", name, children.len());
                    let mut report = RunReport::default();
                    for child in children {
                        report.merge(graph.run_task(child).await?);
                    }
                    Ok(report)
                }
                TaskKind::Parallel(children) => {
                    tracing::debug!("[{}] {} in parallel", name, children.len());
                    graph.run_parallel(name, children).await
                }
                TaskKind::Pipeline(pipeline) => graph.run_pipeline(name, pipeline).await,
                TaskKind::Clean(dir) => graph.run_clean(name, dir).await,
            }
        })
    }

    /// Every started sibling finishes; the first error is returned.
    async fn run_parallel(
        &self,
        name: String,
        children: Vec<String>,
    ) -> Result<RunReport, TaskError> {
        let mut set = JoinSet::new();
        for child in children {
            set.spawn(self.run_task(child));
        }

        let mut report = RunReport::default();
        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(child_report)) => report.merge(child_report),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(TaskError::Aborted {
                        task: name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    async fn run_pipeline(
        &self,
        name: String,
        pipeline: Arc<Pipeline>,
    ) -> Result<RunReport, TaskError> {
        let inner = Arc::clone(&self.inner);
        let result =
            tokio::task::spawn_blocking(move || pipeline.execute(&inner.context, &inner.events))
                .await;

        match result {
            Ok(Ok(files)) => Ok(RunReport {
                tasks: vec![name],
                files: files.len(),
            }),
            Ok(Err(source)) => {
                self.inner.events.publish(BuildEvent::Failed {
                    task: name.clone(),
                    message: source.to_string(),
                });
                Err(TaskError::Failed { task: name, source })
            }
            Err(e) => Err(TaskError::Aborted {
                task: name,
                message: e.to_string(),
            }),
        }
    }

    async fn run_clean(&self, name: String, dir: PathBuf) -> Result<RunReport, TaskError> {
        let target = dir.clone();
        let result = tokio::task::spawn_blocking(move || {
            if target.exists() {
                std::fs::remove_dir_all(&target).map_err(|e| PipelineError::Remove {
                    path: target.clone(),
                    source: e,
                })?;
            }
            Ok::<_, PipelineError>(())
        })
        .await;

        match result {
            Ok(Ok(())) => {
                tracing::info!("[{}] removed {}", name, dir.display());
                Ok(RunReport {
                    tasks: vec![name],
                    files: 0,
                })
            }
            Ok(Err(source)) => Err(TaskError::Failed { task: name, source }),
            Err(e) => Err(TaskError::Aborted {
                task: name,
                message: e.to_string(),
            }),
        }
    }
}
