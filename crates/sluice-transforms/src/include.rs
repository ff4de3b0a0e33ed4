//! Partial inclusion for HTML sources.
//!
//! Supports the `@@include('file.html', {"key": "value"})` directive. Included
//! files are resolved against the partials directory and may reference the
//! JSON context through `@@key` (dotted keys reach into nested objects).
//! Includes nest; each level sees its parent's context merged with its own.

use std::fs;
use std::path::{Path, PathBuf};

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::fileset::{extension, FileEntry, FileSet};
use crate::traits::{require_text, Transform, TransformContext, TransformError};

const MAX_DEPTH: usize = 32;

/// Expands `@@include` directives in `.html` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct IncludePartialsTransform;

impl Transform for IncludePartialsTransform {
    fn name(&self) -> &str {
        "include-partials"
    }

    fn apply(&self, files: FileSet, ctx: &TransformContext) -> Result<FileSet, TransformError> {
        let expander = Expander::new(self.name(), ctx)?;
        let mut out = FileSet::new();

        for (path, entry) in files {
            if !matches!(extension(&path).as_deref(), Some("html" | "htm")) {
                out.insert(&path, entry);
                continue;
            }

            let source = require_text(self.name(), &path, &entry.contents)?;
            let mut stack = Vec::new();
            let expanded = expander.expand(&path, source, &Map::new(), &mut stack)?;

            out.insert(
                &path,
                FileEntry {
                    contents: expanded.into_bytes(),
                    origin: entry.origin,
                },
            );
        }

        Ok(out)
    }
}

struct Expander<'a> {
    transform: &'a str,
    partials_dir: &'a Path,
    include: Regex,
    variable: Regex,
}

impl<'a> Expander<'a> {
    fn new(transform: &'a str, ctx: &'a TransformContext) -> Result<Self, TransformError> {
        let prefix = regex::escape(&ctx.include_prefix);
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| TransformError::Config {
                transform: transform.to_string(),
                message: format!("invalid include prefix {:?}: {}", ctx.include_prefix, e),
            })
        };

        Ok(Self {
            transform,
            partials_dir: &ctx.partials_dir,
            include: compile(format!(
                r#"(?s){}include\(\s*["']([^"']+)["']\s*(?:,\s*(\{{.*?\}}))?\s*\)"#,
                prefix
            ))?,
            variable: compile(format!(
                r"{}([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)",
                prefix
            ))?,
        })
    }

    /// Expand includes in `content`, which belongs to `current` (a logical
    /// path or a partial's file path, used in error messages).
    fn expand(
        &self,
        current: &str,
        content: &str,
        vars: &Map<String, Value>,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String, TransformError> {
        if stack.len() > MAX_DEPTH {
            return Err(TransformError::syntax(
                self.transform,
                current,
                format!("includes nested deeper than {} levels", MAX_DEPTH),
            ));
        }

        let content = self.substitute(content, vars);

        let mut out = String::with_capacity(content.len());
        let mut last = 0;

        for caps in self.include.captures_iter(&content) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&content[last..whole.start()]);
            last = whole.end();

            let name = &caps[1];
            let mut child_vars = vars.clone();
            if let Some(json) = caps.get(2) {
                let parsed: Map<String, Value> = serde_json::from_str(json.as_str())
                    .map_err(|e| {
                        TransformError::syntax(
                            self.transform,
                            current,
                            format!("invalid include context for '{}': {}", name, e),
                        )
                    })?;
                child_vars.extend(parsed);
            }

            let partial = self.partials_dir.join(name);
            let canonical = partial.canonicalize().map_err(|_| {
                TransformError::syntax(
                    self.transform,
                    current,
                    format!(
                        "partial '{}' not found in {}",
                        name,
                        self.partials_dir.display()
                    ),
                )
            })?;

            if stack.contains(&canonical) {
                return Err(TransformError::syntax(
                    self.transform,
                    current,
                    format!("include cycle through '{}'", name),
                ));
            }

            let partial_display = partial.display().to_string();
            let bytes = fs::read(&canonical).map_err(|source| TransformError::Io {
                transform: self.transform.to_string(),
                path: partial_display.clone(),
                source,
            })?;
            let text = require_text(self.transform, &partial_display, &bytes)?;

            stack.push(canonical);
            let expanded = self.expand(&partial_display, text, &child_vars, stack)?;
            stack.pop();

            out.push_str(&expanded);
        }

        out.push_str(&content[last..]);
        Ok(out)
    }

    /// Replace `@@key` references that resolve in `vars`; others stay as-is.
    fn substitute(&self, content: &str, vars: &Map<String, Value>) -> String {
        if vars.is_empty() {
            return content.to_string();
        }

        self.variable
            .replace_all(content, |caps: &Captures| {
                let key = &caps[1];
                // Fall back to the longest dotted prefix that resolves, so
                // `@@name.html` still substitutes `name`.
                let mut end = key.len();
                loop {
                    if let Some(value) = lookup(vars, &key[..end]) {
                        return format!("{}{}", render(value), &key[end..]);
                    }
                    match key[..end].rfind('.') {
                        Some(dot) => end = dot,
                        None => return caps[0].to_string(),
                    }
                }
            })
            .into_owned()
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lookup<'v>(vars: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    let mut parts = key.split('.');
    let mut current = vars.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}
