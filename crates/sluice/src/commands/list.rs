//! Print the task table.

use sluice_config::{InputSource, Project, TaskDecl, TaskDeclKind, RESERVED_TASK};

/// Print every task with its kind and what it does.
pub fn run(project: &Project) {
    let width = project
        .tasks()
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(0)
        .max(RESERVED_TASK.len());

    for task in project.tasks() {
        println!(
            "{:<width$}  {:<8}  {}",
            task.name,
            task.kind.label(),
            describe(task),
            width = width
        );
    }
    println!(
        "{:<width$}  {:<8}  build, serve and watch",
        RESERVED_TASK,
        "server",
        width = width
    );
}

/// One-line summary: the description if set, otherwise the task's shape.
fn describe(task: &TaskDecl) -> String {
    if let Some(description) = &task.description {
        return description.clone();
    }

    match &task.kind {
        TaskDeclKind::Pipeline(p) => {
            let from = match p.input {
                InputSource::Source => "",
                InputSource::Output => " (in place)",
            };
            let transforms = if p.transforms.is_empty() {
                "copy".to_string()
            } else {
                p.transforms.join(" > ")
            };
            format!("{} -> {}{}: {}", p.category, p.target, from, transforms)
        }
        TaskDeclKind::Clean(target) => format!("remove {}", target),
        TaskDeclKind::Series(names) => names.join(", "),
        TaskDeclKind::Parallel(names) => names.join(" | "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_config::{BuildTarget, PipelineDecl};

    fn decl(kind: TaskDeclKind) -> TaskDecl {
        TaskDecl {
            name: "t".to_string(),
            description: None,
            kind,
        }
    }

    #[test]
    fn describes_task_shapes() {
        let pipeline = decl(TaskDeclKind::Pipeline(PipelineDecl {
            category: "css".to_string(),
            target: BuildTarget::Dist,
            input: InputSource::Output,
            sources: vec!["**/*.css".to_string()],
            transforms: vec!["autoprefix".to_string(), "minify-css".to_string()],
            replace: false,
        }));
        assert_eq!(
            describe(&pipeline),
            "css -> dist (in place): autoprefix > minify-css"
        );

        assert_eq!(describe(&decl(TaskDeclKind::Clean(BuildTarget::Dev))), "remove dev");
        assert_eq!(
            describe(&decl(TaskDeclKind::Parallel(vec![
                "a".to_string(),
                "b".to_string()
            ]))),
            "a | b"
        );
    }

    #[test]
    fn prefers_description() {
        let mut task = decl(TaskDeclKind::Series(vec!["a".to_string()]));
        task.description = Some("Build everything".to_string());
        assert_eq!(describe(&task), "Build everything");
    }
}
