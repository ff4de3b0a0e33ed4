//! Sass/SCSS compilation via `grass`.

use crate::fileset::{extension, with_extension, FileEntry, FileSet};
use crate::traits::{require_text, Transform, TransformContext, TransformError};

/// Compiles `.scss` and `.sass` files to CSS.
///
/// Partials (file names starting with `_`) are only reachable through
/// `@use`/`@import` and are dropped from the output set.
#[derive(Debug, Default, Clone, Copy)]
pub struct SassTransform;

impl SassTransform {
    pub fn new() -> Self {
        Self
    }
}

impl Transform for SassTransform {
    fn name(&self) -> &str {
        "sass"
    }

    fn apply(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        let mut out = FileSet::new();

        for (path, entry) in files {
            let ext = extension(&path);
            let syntax = match ext.as_deref() {
                Some("scss") => grass::InputSyntax::Scss,
                Some("sass") => grass::InputSyntax::Sass,
                _ => {
                    out.insert(&path, entry);
                    continue;
                }
            };

            if is_partial(&path) {
                tracing::trace!("skipping partial {}", path);
                continue;
            }

            let display_path = entry
                .origin
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| path.clone());

            let source = require_text(self.name(), &display_path, &entry.contents)?;

            let mut options = grass::Options::default().input_syntax(syntax);
            if let Some(dir) = entry.origin.as_ref().and_then(|p| p.parent()) {
                options = options.load_path(dir);
            }

            let css = grass::from_string(source.to_string(), &options)
                .map_err(|e| TransformError::syntax(self.name(), &display_path, e))?;

            let css_path = with_extension(&path, "css");
            tracing::debug!("compiled {} -> {}", path, css_path);

            let compiled = match entry.origin {
                Some(origin) => FileEntry::with_origin(css, origin),
                None => FileEntry::new(css),
            };
            out.insert(css_path, compiled);
        }

        Ok(out)
    }
}

fn is_partial(path: &str) -> bool {
    path.rsplit('/').next().is_some_and(|name| name.starts_with('_'))
}
