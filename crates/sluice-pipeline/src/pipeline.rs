//! Pipeline: collect a category's files, transform them, write them out.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use sluice_config::{BuildTarget, ConfigError, InputSource, PathEntry, PipelineDecl};
use sluice_transforms::{FileSet, Transform, TransformContext};

use crate::error::PipelineError;
use crate::events::{BuildEvent, EventBus};
use crate::source::SourceSet;

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A pipeline bound to one category and one build target.
pub struct Pipeline {
    task: String,
    category: String,
    target: BuildTarget,
    sources: SourceSet,
    dest: PathBuf,
    transforms: Vec<Arc<dyn Transform>>,
    replace: Replace,
}

/// What happens to existing output before a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replace {
    /// Overwrite changed files, keep everything else
    Keep,
    /// Remove the destination directory
    Directory,
    /// Remove top-level files matching the sources that were not rewritten
    Stale,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("task", &self.task)
            .field("category", &self.category)
            .field("target", &self.target)
            .field("sources", &self.sources)
            .field("dest", &self.dest)
            .field(
                "transforms",
                &self.transforms.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("replace", &self.replace)
            .finish()
    }
}

impl Pipeline {
    /// Bind a pipeline declaration to its category and resolved transforms.
    pub fn new(
        task: impl Into<String>,
        entry: &PathEntry,
        decl: &PipelineDecl,
        transforms: Vec<Arc<dyn Transform>>,
    ) -> Result<Self, ConfigError> {
        let dest = entry.dest(decl.target).to_path_buf();
        let input = match decl.input {
            InputSource::Source => entry.base.clone(),
            InputSource::Output => dest.clone(),
        };

        let replace = match (decl.replace, entry.writes_to_root()) {
            (false, _) => Replace::Keep,
            (true, false) => Replace::Directory,
            (true, true) => Replace::Stale,
        };

        Ok(Self {
            task: task.into(),
            category: entry.category.clone(),
            target: decl.target,
            sources: SourceSet::new(input, &decl.sources)?,
            dest,
            transforms,
            replace,
        })
    }

    /// Directory files are read from.
    pub fn input_dir(&self) -> &Path {
        self.sources.base()
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Run the pipeline.
    ///
    /// Transforms run strictly in order. Nothing is written unless every
    /// transform succeeds, so a failure leaves the previous output in place.
    pub fn execute(
        &self,
        ctx: &TransformContext,
        events: &EventBus,
    ) -> Result<FileSet, PipelineError> {
        let start = Instant::now();

        let mut files = self.sources.collect()?;
        for transform in &self.transforms {
            let count = files.len();
            files = transform.apply(files, ctx)?;
            tracing::debug!(
                "[{}] {}: {} -> {} files",
                self.task,
                transform.name(),
                count,
                files.len()
            );
        }

        self.write(&files)?;

        tracing::info!(
            "[{}] wrote {} files to {} in {}ms",
            self.task,
            files.len(),
            self.dest.display(),
            start.elapsed().as_millis()
        );

        events.publish(BuildEvent::Completed {
            task: self.task.clone(),
            category: self.category.clone(),
            target: self.target,
            dest: self.dest.clone(),
            paths: files.paths().map(str::to_string).collect(),
        });

        Ok(files)
    }

    fn write(&self, files: &FileSet) -> Result<(), PipelineError> {
        if self.replace == Replace::Directory && self.dest.exists() {
            fs::remove_dir_all(&self.dest).map_err(|e| PipelineError::Remove {
                path: self.dest.clone(),
                source: e,
            })?;
        }

        for (path, entry) in files.iter() {
            write_atomic(&self.dest.join(path), &entry.contents)?;
        }

        if self.replace == Replace::Stale {
            self.prune_stale(files)?;
        }

        Ok(())
    }

    /// Remove files directly under `dest` that the sources select but this
    /// run did not produce.
    fn prune_stale(&self, files: &FileSet) -> Result<(), PipelineError> {
        let entries = match fs::read_dir(&self.dest) {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !self.sources.matches(&name) || files.contains(&name) {
                continue;
            }

            fs::remove_file(&path).map_err(|e| PipelineError::Remove {
                path: path.clone(),
                source: e,
            })?;
            tracing::debug!("[{}] removed stale {}", self.task, path.display());
        }

        Ok(())
    }
}

/// Write a file through a sibling temp file and a rename.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PipelineError> {
    let write_err = |e| PipelineError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(write_err)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = parent.join(format!(
        ".{}.{}-{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    fs::write(&temp, contents).map_err(write_err)?;
    fs::rename(&temp, path).map_err(|e| {
        let _ = fs::remove_file(&temp);
        write_err(e)
    })
}
