//! CSS post-processing using lightningcss.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::fileset::{extension, FileEntry, FileSet};
use crate::traits::{require_text, Transform, TransformContext, TransformError};

/// How a stylesheet is printed back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CssMode {
    /// Add vendor prefixes for the configured browsers, keep formatting
    Prefix,
    /// Compact output
    Minify,
    /// Pretty-printed output, no rewriting
    Beautify,
}

/// Adds vendor prefixes for the browsers in [`TransformContext::browsers`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoprefixTransform;

/// Minifies stylesheets.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinifyCssTransform;

/// Re-prints stylesheets with consistent indentation.
#[derive(Debug, Default, Clone, Copy)]
pub struct BeautifyCssTransform;

impl Transform for AutoprefixTransform {
    fn name(&self) -> &str {
        "autoprefix"
    }

    fn apply(&self, files: FileSet, ctx: &TransformContext) -> Result<FileSet, TransformError> {
        let browsers = resolve_browsers(self.name(), &ctx.browsers)?;
        map_stylesheets(self.name(), files, CssMode::Prefix, browsers)
    }
}

impl Transform for MinifyCssTransform {
    fn name(&self) -> &str {
        "minify-css"
    }

    fn apply(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        map_stylesheets(self.name(), files, CssMode::Minify, None)
    }
}

impl Transform for BeautifyCssTransform {
    fn name(&self) -> &str {
        "beautify-css"
    }

    fn apply(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        map_stylesheets(self.name(), files, CssMode::Beautify, None)
    }
}

fn resolve_browsers(transform: &str, queries: &[String]) -> Result<Option<Browsers>, TransformError> {
    if queries.is_empty() {
        return Ok(None);
    }

    Browsers::from_browserslist(queries.iter().map(|q| q.as_str())).map_err(|e| {
        TransformError::Config {
            transform: transform.to_string(),
            message: format!("invalid browserslist query {:?}: {}", queries, e),
        }
    })
}

fn map_stylesheets(
    transform: &str,
    files: FileSet,
    mode: CssMode,
    browsers: Option<Browsers>,
) -> Result<FileSet, TransformError> {
    let mut out = FileSet::new();

    for (path, entry) in files {
        if extension(&path).as_deref() != Some("css") {
            out.insert(&path, entry);
            continue;
        }

        let source = require_text(transform, &path, &entry.contents)?;
        let css = process_css(&path, source, mode, browsers)
            .map_err(|message| TransformError::syntax(transform, &path, message))?;

        out.insert(
            &path,
            FileEntry {
                contents: css.into_bytes(),
                origin: entry.origin,
            },
        );
    }

    Ok(out)
}

fn process_css(
    filename: &str,
    css: &str,
    mode: CssMode,
    browsers: Option<Browsers>,
) -> Result<String, String> {
    let targets = Targets {
        browsers,
        ..Targets::default()
    };

    let options = ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };

    let mut stylesheet =
        StyleSheet::parse(css, options).map_err(|e| format!("CSS parse error: {}", e))?;

    if mode != CssMode::Beautify {
        stylesheet
            .minify(MinifyOptions {
                targets,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;
    }

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: mode == CssMode::Minify,
            targets,
            ..Default::default()
        })
        .map_err(|e| format!("CSS print error: {}", e))?;

    Ok(printed.code)
}
