//! Task and watch binding validation.
//!
//! Turns the raw `[task.*]` and `[[watch]]` tables into typed declarations.
//! Cycle detection happens when the task graph is finalized.

use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::glob::build_globset;
use crate::model::{InputSource, ServeSection, TaskConfig, WatchConfig};
use crate::paths::{BuildTarget, PathTable};

/// Task name handled by the CLI itself.
pub const RESERVED_TASK: &str = "serve";

/// A validated task declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDecl {
    pub name: String,
    pub description: Option<String>,
    pub kind: TaskDeclKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDeclKind {
    Pipeline(PipelineDecl),
    Clean(BuildTarget),
    Series(Vec<String>),
    Parallel(Vec<String>),
}

impl TaskDeclKind {
    /// Short label used by `--list`.
    pub fn label(&self) -> &'static str {
        match self {
            TaskDeclKind::Pipeline(_) => "pipeline",
            TaskDeclKind::Clean(_) => "clean",
            TaskDeclKind::Series(_) => "series",
            TaskDeclKind::Parallel(_) => "parallel",
        }
    }

    /// Names of the sub-tasks of a composite.
    pub fn children(&self) -> &[String] {
        match self {
            TaskDeclKind::Series(names) | TaskDeclKind::Parallel(names) => names,
            _ => &[],
        }
    }
}

/// A pipeline leaf: read a category, transform, write to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDecl {
    pub category: String,
    pub target: BuildTarget,
    pub input: InputSource,
    /// Globs relative to the input directory
    pub sources: Vec<String>,
    pub transforms: Vec<String>,
    pub replace: bool,
}

/// A validated watch binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    pub globs: Vec<String>,
    pub tasks: Vec<String>,
}

/// Validate every task against the path table and each other.
pub fn validate_tasks(
    tasks: &BTreeMap<String, TaskConfig>,
    paths: &PathTable,
) -> Result<Vec<TaskDecl>, ConfigError> {
    let mut decls = Vec::with_capacity(tasks.len());

    for (name, cfg) in tasks {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidTask {
                task: name.clone(),
                message: "task names must not be empty".to_string(),
            });
        }
        if name == RESERVED_TASK {
            return Err(ConfigError::InvalidTask {
                task: name.clone(),
                message: format!("'{}' is reserved for the dev server", RESERVED_TASK),
            });
        }

        let kind = task_kind(name, cfg, paths)?;
        decls.push(TaskDecl {
            name: name.clone(),
            description: cfg.description.clone(),
            kind,
        });
    }

    for decl in &decls {
        for child in decl.kind.children() {
            if !tasks.contains_key(child) {
                return Err(ConfigError::UnknownTask {
                    referenced_by: format!("Task '{}'", decl.name),
                    task: child.clone(),
                });
            }
        }
    }

    Ok(decls)
}

fn task_kind(name: &str, cfg: &TaskConfig, paths: &PathTable) -> Result<TaskDeclKind, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidTask {
        task: name.to_string(),
        message,
    };

    let kinds = [
        cfg.category.is_some(),
        cfg.clean.is_some(),
        cfg.series.is_some(),
        cfg.parallel.is_some(),
    ];
    match kinds.iter().filter(|set| **set).count() {
        0 => {
            return Err(invalid(
                "one of category, clean, series or parallel is required".to_string(),
            ))
        }
        1 => {}
        _ => {
            return Err(invalid(
                "only one of category, clean, series or parallel may be set".to_string(),
            ))
        }
    }

    if let Some(category) = &cfg.category {
        let entry = paths.entry(category).ok_or_else(|| ConfigError::UnknownCategory {
            task: name.to_string(),
            category: category.clone(),
        })?;

        if cfg.replace && cfg.from == InputSource::Output {
            return Err(invalid(
                "replace cannot be used on a task that reads its own output".to_string(),
            ));
        }

        let sources = if !cfg.sources.is_empty() {
            cfg.sources.clone()
        } else {
            match cfg.from {
                InputSource::Source => entry.sources.clone(),
                InputSource::Output => vec!["**/*".to_string()],
            }
        };
        build_globset(&sources)?;

        // Root categories prune stale top-level files; globs stay top-level.
        if cfg.replace && entry.writes_to_root() {
            if let Some(glob) = sources.iter().find(|g| g.contains('/')) {
                return Err(invalid(format!(
                    "replace on category '{}' (writes to the target root) needs top-level \
                     globs, found '{}'",
                    category, glob
                )));
            }
        }

        return Ok(TaskDeclKind::Pipeline(PipelineDecl {
            category: category.clone(),
            target: cfg.target.unwrap_or(BuildTarget::Temp),
            input: cfg.from,
            sources,
            transforms: cfg.transforms.clone(),
            replace: cfg.replace,
        }));
    }

    let pipeline_only = cfg.target.is_some()
        || cfg.from != InputSource::Source
        || !cfg.sources.is_empty()
        || !cfg.transforms.is_empty()
        || cfg.replace;
    if pipeline_only {
        return Err(invalid(
            "target, from, sources, transforms and replace only apply to pipeline tasks"
                .to_string(),
        ));
    }

    if let Some(target) = cfg.clean {
        return Ok(TaskDeclKind::Clean(target));
    }

    let kind = match (&cfg.series, &cfg.parallel) {
        (Some(names), _) => TaskDeclKind::Series(names.clone()),
        (_, Some(names)) => TaskDeclKind::Parallel(names.clone()),
        (None, None) => return Err(invalid("no task kind set".to_string())),
    };
    if kind.children().is_empty() {
        return Err(invalid(format!(
            "{} must name at least one task",
            kind.label()
        )));
    }
    if kind.children().iter().any(|n| n == RESERVED_TASK) {
        return Err(invalid(format!(
            "'{}' cannot be used as a sub-task",
            RESERVED_TASK
        )));
    }

    Ok(kind)
}

/// Validate watch bindings: non-empty, compilable globs and known tasks.
pub fn validate_watch(
    watch: &[WatchConfig],
    tasks: &BTreeMap<String, TaskConfig>,
) -> Result<Vec<WatchBinding>, ConfigError> {
    watch
        .iter()
        .enumerate()
        .map(|(index, binding)| {
            if binding.globs.is_empty() {
                return Err(ConfigError::InvalidWatch {
                    index,
                    message: "at least one glob is required".to_string(),
                });
            }
            if binding.tasks.is_empty() {
                return Err(ConfigError::InvalidWatch {
                    index,
                    message: "at least one task is required".to_string(),
                });
            }
            build_globset(&binding.globs)?;

            for task in &binding.tasks {
                if !tasks.contains_key(task) {
                    return Err(ConfigError::UnknownTask {
                        referenced_by: format!("Watch binding #{}", index),
                        task: task.clone(),
                    });
                }
            }

            Ok(WatchBinding {
                globs: binding.globs.clone(),
                tasks: binding.tasks.clone(),
            })
        })
        .collect()
}

/// Validate the `[serve]` section.
pub fn validate_serve(
    serve: &ServeSection,
    tasks: &BTreeMap<String, TaskConfig>,
) -> Result<(), ConfigError> {
    if serve.host.trim().is_empty() {
        return Err(ConfigError::InvalidServe("host must not be empty".to_string()));
    }
    if serve.debounce_ms == 0 {
        return Err(ConfigError::InvalidServe(
            "debounce_ms must be greater than zero".to_string(),
        ));
    }
    for task in &serve.build {
        if !tasks.contains_key(task) {
            return Err(ConfigError::UnknownTask {
                referenced_by: "[serve] build".to_string(),
                task: task.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryConfig, TargetsSection};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn paths() -> PathTable {
        let mut categories = BTreeMap::new();
        categories.insert(
            "css".to_string(),
            CategoryConfig {
                base: "src/scss".to_string(),
                sources: vec!["main.scss".to_string()],
                output: "css".to_string(),
            },
        );
        categories.insert(
            "index".to_string(),
            CategoryConfig {
                base: "src".to_string(),
                sources: vec!["*.html".to_string()],
                output: String::new(),
            },
        );
        PathTable::new(Path::new("/site"), &TargetsSection::default(), &categories).unwrap()
    }

    fn pipeline(category: &str) -> TaskConfig {
        TaskConfig {
            category: Some(category.to_string()),
            ..Default::default()
        }
    }

    fn series(names: &[&str]) -> TaskConfig {
        TaskConfig {
            series: Some(names.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn builds_declarations() {
        let mut tasks = BTreeMap::new();
        tasks.insert("scss".to_string(), pipeline("css"));
        tasks.insert(
            "minify:css".to_string(),
            TaskConfig {
                target: Some(BuildTarget::Dist),
                from: InputSource::Output,
                transforms: vec!["minify-css".to_string()],
                ..pipeline("css")
            },
        );
        tasks.insert("build".to_string(), series(&["scss", "minify:css"]));

        let decls = validate_tasks(&tasks, &paths()).unwrap();
        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["build", "minify:css", "scss"]);

        let TaskDeclKind::Pipeline(minify) = &decls[1].kind else {
            panic!("expected a pipeline");
        };
        assert_eq!(minify.sources, vec!["**/*".to_string()]);
        assert_eq!(minify.target, BuildTarget::Dist);

        let TaskDeclKind::Pipeline(scss) = &decls[2].kind else {
            panic!("expected a pipeline");
        };
        assert_eq!(scss.sources, vec!["main.scss".to_string()]);
        assert_eq!(scss.target, BuildTarget::Temp);
    }

    #[test]
    fn rejects_unknown_sub_task() {
        let mut tasks = BTreeMap::new();
        tasks.insert("scss".to_string(), pipeline("css"));
        tasks.insert("build".to_string(), series(&["scss", "missing"]));

        let err = validate_tasks(&tasks, &paths()).unwrap_err();
        assert!(
            matches!(err, ConfigError::UnknownTask { ref task, .. } if task == "missing"),
            "{err}"
        );
    }

    #[test]
    fn rejects_unknown_category() {
        let mut tasks = BTreeMap::new();
        tasks.insert("fonts".to_string(), pipeline("fonts"));

        let err = validate_tasks(&tasks, &paths()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCategory { .. }));
    }

    #[test]
    fn rejects_ambiguous_and_empty_kinds() {
        let mut tasks = BTreeMap::new();
        tasks.insert(
            "both".to_string(),
            TaskConfig {
                clean: Some(BuildTarget::Dist),
                ..pipeline("css")
            },
        );
        assert!(validate_tasks(&tasks, &paths()).is_err());

        let mut tasks = BTreeMap::new();
        tasks.insert("nothing".to_string(), TaskConfig::default());
        assert!(validate_tasks(&tasks, &paths()).is_err());

        let mut tasks = BTreeMap::new();
        tasks.insert("empty".to_string(), series(&[]));
        assert!(validate_tasks(&tasks, &paths()).is_err());
    }

    #[test]
    fn replace_on_root_category_needs_top_level_globs() {
        let mut tasks = BTreeMap::new();
        tasks.insert(
            "index".to_string(),
            TaskConfig {
                replace: true,
                ..pipeline("index")
            },
        );
        let decls = validate_tasks(&tasks, &paths()).unwrap();
        assert!(matches!(&decls[0].kind, TaskDeclKind::Pipeline(p) if p.replace));

        tasks.insert(
            "index".to_string(),
            TaskConfig {
                replace: true,
                sources: vec!["**/*.html".to_string()],
                ..pipeline("index")
            },
        );
        let err = validate_tasks(&tasks, &paths()).unwrap_err();
        assert!(err.to_string().contains("needs top-level globs"), "{err}");
    }

    #[test]
    fn rejects_reserved_name() {
        let mut tasks = BTreeMap::new();
        tasks.insert("serve".to_string(), pipeline("css"));

        assert!(validate_tasks(&tasks, &paths()).is_err());
    }

    #[test]
    fn validates_watch_bindings() {
        let mut tasks = BTreeMap::new();
        tasks.insert("scss".to_string(), pipeline("css"));

        let ok = validate_watch(
            &[WatchConfig {
                globs: vec!["src/scss/**/*.scss".to_string()],
                tasks: vec!["scss".to_string()],
            }],
            &tasks,
        )
        .unwrap();
        assert_eq!(ok.len(), 1);

        let err = validate_watch(
            &[WatchConfig {
                globs: vec!["src/**/*.html".to_string()],
                tasks: vec!["html".to_string()],
            }],
            &tasks,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Watch binding #0 references unknown task 'html'"
        );
    }

    #[test]
    fn validates_serve_build_list() {
        let mut tasks = BTreeMap::new();
        tasks.insert("scss".to_string(), pipeline("css"));

        let mut serve = ServeSection {
            build: vec!["scss".to_string()],
            ..Default::default()
        };
        assert!(validate_serve(&serve, &tasks).is_ok());

        serve.build.push("vendor".to_string());
        assert!(validate_serve(&serve, &tasks).is_err());
    }
}
