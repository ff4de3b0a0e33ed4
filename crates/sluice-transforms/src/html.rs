//! HTML whitespace minification.

use std::sync::LazyLock;

use regex::Regex;

use crate::fileset::{extension, FileEntry, FileSet};
use crate::traits::{require_text, Transform, TransformContext, TransformError};

/// Elements whose contents are emitted verbatim.
static PROTECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
    )
    .expect("valid protected-element regex")
});

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("valid markup regex"));

static TAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^</?\s*([A-Za-z0-9!-]+)").expect("valid tag name regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Tags around which whitespace never affects rendering.
const BLOCK_TAGS: &[&str] = &[
    "!doctype", "address", "article", "aside", "base", "blockquote", "body", "br", "dd", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4",
    "h5", "h6", "head", "header", "hr", "html", "li", "link", "main", "meta", "nav", "noscript",
    "ol", "option", "p", "section", "select", "table", "tbody", "td", "tfoot", "th", "thead",
    "title", "tr", "ul",
];

/// Collapses insignificant whitespace and strips comments in `.html` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinifyHtmlTransform;

impl Transform for MinifyHtmlTransform {
    fn name(&self) -> &str {
        "minify-html"
    }

    fn apply(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        let mut out = FileSet::new();

        for (path, entry) in files {
            if !matches!(extension(&path).as_deref(), Some("html" | "htm")) {
                out.insert(&path, entry);
                continue;
            }

            let source = require_text(self.name(), &path, &entry.contents)?;
            let minified = minify_html(source);

            out.insert(
                &path,
                FileEntry {
                    contents: minified.into_bytes(),
                    origin: entry.origin,
                },
            );
        }

        Ok(out)
    }
}

#[derive(Debug)]
enum Piece<'a> {
    /// Markup emitted as-is; `block` decides whether surrounding whitespace matters
    Markup { raw: &'a str, block: bool },
    Text(String),
}

impl Piece<'_> {
    fn is_block(&self) -> bool {
        matches!(self, Piece::Markup { block: true, .. })
    }
}

/// Minify an HTML document.
pub fn minify_html(source: &str) -> String {
    let mut pieces = Vec::new();
    let mut last = 0;

    for m in PROTECTED.find_iter(source) {
        tokenize(&source[last..m.start()], &mut pieces);
        pieces.push(Piece::Markup {
            raw: m.as_str(),
            block: true,
        });
        last = m.end();
    }
    tokenize(&source[last..], &mut pieces);

    let mut out = String::with_capacity(source.len());
    for (i, piece) in pieces.iter().enumerate() {
        match piece {
            Piece::Markup { raw, .. } => out.push_str(raw),
            Piece::Text(text) => {
                let prev_block = i == 0 || pieces[i - 1].is_block();
                let next_block = i + 1 == pieces.len() || pieces[i + 1].is_block();

                let collapsed = WHITESPACE.replace_all(text, " ");
                let mut trimmed: &str = &collapsed;
                if prev_block {
                    trimmed = trimmed.trim_start();
                }
                if next_block {
                    trimmed = trimmed.trim_end();
                }
                out.push_str(trimmed);
            }
        }
    }

    out
}

fn tokenize<'a>(segment: &'a str, pieces: &mut Vec<Piece<'a>>) {
    let mut last = 0;

    for m in MARKUP.find_iter(segment) {
        push_text(&segment[last..m.start()], pieces);
        last = m.end();

        let raw = m.as_str();
        if let Some(comment) = raw.strip_prefix("<!--") {
            // conditional comments carry markup for old browsers
            if comment.starts_with("[if") || comment.starts_with("<![endif]") {
                pieces.push(Piece::Markup { raw, block: true });
            }
            continue;
        }

        let block = TAG_NAME
            .captures(raw)
            .and_then(|c| c.get(1))
            .map(|name| BLOCK_TAGS.contains(&name.as_str().to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        pieces.push(Piece::Markup { raw, block });
    }

    push_text(&segment[last..], pieces);
}

fn push_text<'a>(text: &str, pieces: &mut Vec<Piece<'a>>) {
    if text.is_empty() {
        return;
    }
    if let Some(Piece::Text(prev)) = pieces.last_mut() {
        prev.push_str(text);
    } else {
        pieces.push(Piece::Text(text.to_string()));
    }
}
