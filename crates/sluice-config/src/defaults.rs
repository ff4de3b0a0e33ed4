//! Built-in project definition.
//!
//! Used when no project file exists and written out by `sluice --init`.

/// Default sluice.toml.
pub const DEFAULT_CONFIG: &str = r#"# sluice project file

[targets]
# Served while watching
temp = ".temp"
# Readable development build
dev = "html&css"
# Minified distribution build
dist = "dist"

[transforms]
partials = "src/partials"
include_prefix = "@@"
browsers = ["> 1%"]

[serve]
host = "127.0.0.1"
port = 3000
open = true
debounce_ms = 200
build = ["scss", "html", "docs", "index", "assets", "vendor"]

# Categories

[category.css]
base = "src/scss"
sources = ["spaces/**/*.scss", "spaces.scss"]
output = "css"

[category.html]
base = "src/html"
sources = ["**/*.html"]
output = "html"

[category.docs]
base = "src/docs"
sources = ["**/*.html"]
output = "docs"

[category.index]
base = "src"
sources = ["*.html"]
output = ""

[category.assets]
base = "src/assets"
sources = ["**/*.*"]
output = "assets"

[category.vendor]
base = "node_modules"
sources = ["**/*.*"]
output = "node_modules"

# Watch output

[task.scss]
description = "Compile stylesheets into the temp target"
category = "css"
transforms = ["sass", "autoprefix"]

[task.html]
category = "html"
transforms = ["include-partials"]

[task.docs]
category = "docs"
transforms = ["include-partials"]

[task.index]
category = "index"
transforms = ["include-partials"]

[task.assets]
category = "assets"

[task.vendor]
category = "vendor"

# Development build
# copy tasks replace their previous output once every transform succeeds

[task."copy:dev:css"]
category = "css"
target = "dev"
transforms = ["sass", "autoprefix"]
replace = true

[task."copy:dev:html"]
category = "html"
target = "dev"
transforms = ["include-partials"]
replace = true

[task."copy:dev:docs"]
category = "docs"
target = "dev"
transforms = ["include-partials"]
replace = true

[task."copy:dev:html:index"]
category = "index"
target = "dev"
transforms = ["include-partials"]
replace = true

[task."copy:dev:assets"]
category = "assets"
target = "dev"
replace = true

[task."copy:dev:vendor"]
category = "vendor"
target = "dev"
replace = true

[task."beautify:css"]
category = "css"
target = "dev"
from = "output"
sources = ["spaces.css"]
transforms = ["beautify-css"]

[task."clean:dev"]
clean = "dev"

[task."build:dev"]
description = "Readable build into the dev target"
series = [
    "copy:dev:css",
    "copy:dev:html",
    "copy:dev:docs",
    "copy:dev:html:index",
    "copy:dev:assets",
    "beautify:css",
    "copy:dev:vendor",
]

# Distribution build

[task."copy:dist:css"]
category = "css"
target = "dist"
transforms = ["sass", "autoprefix"]
replace = true

[task."copy:dist:html"]
category = "html"
target = "dist"
transforms = ["include-partials"]
replace = true

[task."copy:dist:docs"]
category = "docs"
target = "dist"
transforms = ["include-partials"]
replace = true

[task."copy:dist:html:index"]
category = "index"
target = "dist"
transforms = ["include-partials"]
replace = true

[task."copy:dist:assets"]
category = "assets"
target = "dist"
replace = true

[task."copy:dist:vendor"]
category = "vendor"
target = "dist"
replace = true

[task."minify:css"]
category = "css"
target = "dist"
from = "output"
sources = ["spaces.css"]
transforms = ["minify-css"]

[task."minify:html"]
category = "html"
target = "dist"
from = "output"
sources = ["**/*.html"]
transforms = ["minify-html"]

[task."minify:html:index"]
category = "index"
target = "dist"
from = "output"
sources = ["*.html"]
transforms = ["minify-html"]

[task."optimize:img"]
category = "assets"
target = "dist"
from = "output"
sources = ["img/**/*"]
transforms = ["optimize-image"]

[task."clean:dist"]
clean = "dist"

[task."build:dist"]
description = "Minified build into the dist target"
series = [
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

# Watch bindings used by `sluice serve`

[[watch]]
globs = ["src/scss/spaces/**/*.scss", "src/scss/spaces.scss"]
tasks = ["scss"]

[[watch]]
globs = [
    "src/html/**/*.html",
    "src/*.html",
    "src/docs/**/*.html",
    "src/partials/**/*.html",
]
tasks = ["html", "docs", "index"]

[[watch]]
globs = ["src/assets/**/*.*"]
tasks = ["assets"]

[[watch]]
globs = ["node_modules/**/*.*"]
tasks = ["vendor"]
"#;

/// Source skeleton created by `sluice --init`: (path, contents).
pub const DEFAULT_SOURCES: &[(&str, &str)] = &[
    ("src/scss/spaces.scss", DEFAULT_STYLESHEET),
    ("src/scss/spaces/_base.scss", DEFAULT_BASE_PARTIAL),
    ("src/partials/head.html", DEFAULT_HEAD_PARTIAL),
    ("src/index.html", DEFAULT_INDEX),
    ("src/html/.gitkeep", ""),
    ("src/docs/.gitkeep", ""),
    ("src/assets/img/.gitkeep", ""),
];

const DEFAULT_STYLESHEET: &str = r#"@import "spaces/base";
"#;

const DEFAULT_BASE_PARTIAL: &str = r#"$text: #222;

body {
  color: $text;
  font-family: system-ui, sans-serif;
}
"#;

const DEFAULT_HEAD_PARTIAL: &str = r#"<head>
  <meta charset="utf-8">
  <title>@@title</title>
  <link rel="stylesheet" href="/css/spaces.css">
</head>
"#;

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html>
@@include('head.html', {"title": "Home"})
<body>
  <h1>It works</h1>
</body>
</html>
"#;
