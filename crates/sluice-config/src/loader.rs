//! Loading and validating a project.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::defaults::DEFAULT_CONFIG;
use crate::error::ConfigError;
use crate::model::{ProjectFile, ServeSection, TransformsSection};
use crate::paths::PathTable;
use crate::validate::{validate_serve, validate_tasks, validate_watch, TaskDecl, WatchBinding};

/// A fully validated project.
#[derive(Debug, Clone)]
pub struct Project {
    config_path: Option<PathBuf>,
    paths: PathTable,
    tasks: Vec<TaskDecl>,
    watch: Vec<WatchBinding>,
    serve: ServeSection,
    transforms: TransformsSection,
}

impl Project {
    /// Load a project file.
    ///
    /// When `path` does not exist the built-in default project is used,
    /// rooted at the directory `path` would live in.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let root = project_root(path)?;

        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;
            let project = Self::parse(&content, path, &root)?;
            tracing::info!("Loaded {}", path.display());
            Ok(Self {
                config_path: Some(path.to_path_buf()),
                ..project
            })
        } else {
            tracing::info!(
                "{} not found, using the built-in project definition",
                path.display()
            );
            Self::parse(DEFAULT_CONFIG, Path::new("<built-in>"), &root)
        }
    }

    /// Parse and validate project file contents. `origin` names the source
    /// in error messages.
    pub fn parse(content: &str, origin: &Path, root: &Path) -> Result<Self, ConfigError> {
        let file: ProjectFile = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_file(file, root)
    }

    /// Validate an already parsed project file.
    pub fn from_file(file: ProjectFile, root: &Path) -> Result<Self, ConfigError> {
        let paths = PathTable::new(root, &file.targets, &file.category)?;
        paths.ensure_outside_targets(
            "the partials directory",
            &paths.root().join(&file.transforms.partials),
        )?;
        let tasks = validate_tasks(&file.task, &paths)?;
        let watch = validate_watch(&file.watch, &file.task)?;
        validate_serve(&file.serve, &file.task)?;

        tracing::debug!(
            "{} categories, {} tasks, {} watch bindings",
            file.category.len(),
            tasks.len(),
            watch.len()
        );

        Ok(Self {
            config_path: None,
            paths,
            tasks,
            watch,
            serve: file.serve,
            transforms: file.transforms,
        })
    }

    /// Project file this was loaded from, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    /// Task declarations in name order.
    pub fn tasks(&self) -> &[TaskDecl] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&TaskDecl> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn watch(&self) -> &[WatchBinding] {
        &self.watch
    }

    pub fn serve(&self) -> &ServeSection {
        &self.serve
    }

    pub fn transforms(&self) -> &TransformsSection {
        &self.transforms
    }

    /// Partials directory resolved against the project root.
    pub fn partials_dir(&self) -> PathBuf {
        self.root().join(&self.transforms.partials)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.serve.debounce_ms)
    }
}

fn project_root(config_path: &Path) -> Result<PathBuf, ConfigError> {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if dir.is_absolute() {
        return Ok(dir);
    }
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Read {
        path: dir.clone(),
        source: e,
    })?;
    Ok(cwd.join(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::BuildTarget;
    use crate::validate::TaskDeclKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn falls_back_to_builtin_project() {
        let temp = TempDir::new().unwrap();
        let project = Project::load(&temp.path().join("sluice.toml")).unwrap();

        assert!(project.config_path().is_none());
        assert_eq!(project.root(), temp.path());
        assert_eq!(
            project.paths().dest("css", BuildTarget::Temp).unwrap(),
            temp.path().join(".temp/css")
        );
        assert_eq!(project.watch().len(), 4);
        assert_eq!(project.debounce(), Duration::from_millis(200));
    }

    #[test]
    fn builtin_build_series_match_the_original_order() {
        let temp = TempDir::new().unwrap();
        let project = Project::load(&temp.path().join("sluice.toml")).unwrap();

        let dist = project.task("build:dist").unwrap();
        assert_eq!(
            dist.kind,
            TaskDeclKind::Series(
                [
                    "copy:dist:css",
                    "copy:dist:html",
                    "copy:dist:docs",
                    "copy:dist:html:index",
                    "copy:dist:assets",
                    "minify:css",
                    "minify:html",
                    "minify:html:index",
                    "optimize:img",
                    "copy:dist:vendor",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect()
            )
        );
        assert_eq!(
            project.serve().build,
            vec!["scss", "html", "docs", "index", "assets", "vendor"]
        );
    }

    #[test]
    fn loads_project_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sluice.toml");
        fs::write(
            &path,
            r#"
[targets]
temp = "out/temp"

[category.css]
base = "styles"
sources = ["*.scss"]
output = "css"

[task.scss]
category = "css"
transforms = ["sass"]
"#,
        )
        .unwrap();

        let project = Project::load(&path).unwrap();
        assert_eq!(project.config_path(), Some(path.as_path()));
        assert_eq!(
            project.paths().target_root(BuildTarget::Temp),
            temp.path().join("out/temp")
        );
        assert_eq!(project.tasks().len(), 1);
        assert!(project.watch().is_empty());
    }

    #[test]
    fn rejects_partials_inside_a_target() {
        let content = r#"
[transforms]
partials = "dist/partials"

[category.css]
base = "styles"
sources = ["*.scss"]
output = "css"
"#;

        let err = Project::parse(content, Path::new("sluice.toml"), Path::new("/site")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTargets(_)));
        assert!(err.to_string().contains("partials directory"), "{err}");
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sluice.toml");
        fs::write(&path, "[task.scss\ncategory = ").unwrap();

        let err = Project::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("sluice.toml"));
    }
}
