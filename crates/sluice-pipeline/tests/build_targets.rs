//! End-to-end builds of the built-in project against a fixture source tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use sluice_config::Project;
use sluice_pipeline::{build_graph, BuildEvent, EventBus, TaskError, TaskGraph};
use sluice_transforms::TransformRegistry;
use tempfile::TempDir;
use walkdir::WalkDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(root, "src/scss/spaces.scss", "@import \"spaces/base\";\n");
    write(
        root,
        "src/scss/spaces/_base.scss",
        "$gap: 4px;\n.grid {\n  display: flex;\n  gap: $gap * 2;\n}\n",
    );
    write(
        root,
        "src/partials/head.html",
        "<head>\n  <title>@@title</title>\n</head>\n",
    );
    write(
        root,
        "src/index.html",
        "<!DOCTYPE html>\n<html>\n@@include('head.html', {\"title\": \"Home\"})\n<body>\n  <p>Hello    world</p>\n</body>\n</html>\n",
    );
    write(
        root,
        "src/html/about.html",
        "<html>\n@@include('head.html', {\"title\": \"About\"})\n<body></body>\n</html>\n",
    );
    write(root, "src/docs/guide.html", "<div>\n  <p>Guide</p>\n</div>\n");
    write(root, "src/assets/fonts/LICENSE.txt", "font license\n");

    temp
}

fn graph(root: &Path) -> TaskGraph {
    let project = Project::load(&root.join("sluice.toml")).unwrap();
    build_graph(&project, &TransformRegistry::with_builtins(), EventBus::default()).unwrap()
}

fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).unwrap().to_string_lossy().into_owned();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

#[tokio::test]
async fn dist_build_is_idempotent() {
    let temp = fixture();
    let graph = graph(temp.path());
    let dist = temp.path().join("dist");

    graph.run("build:dist").await.unwrap();
    let first = snapshot(&dist);

    graph.run("build:dist").await.unwrap();
    let second = snapshot(&dist);

    assert_eq!(first, second);
    assert!(first.contains_key("css/spaces.css"));
    assert!(first.contains_key("html/about.html"));
    assert!(first.contains_key("docs/guide.html"));
    assert!(first.contains_key("assets/fonts/LICENSE.txt"));

    let css = String::from_utf8(first["css/spaces.css"].clone()).unwrap();
    assert!(css.contains(".grid{"), "{css}");
    assert!(css.contains("gap:8px"), "{css}");

    let index = String::from_utf8(first["index.html"].clone()).unwrap();
    assert!(index.contains("<title>Home</title>"), "{index}");
    assert!(index.contains("<p>Hello world</p>"), "{index}");
    assert!(!index.contains("@@"), "{index}");
}

#[tokio::test]
async fn rebuild_drops_output_of_deleted_sources() {
    let temp = fixture();
    let graph = graph(temp.path());
    let dist = temp.path().join("dist");
    write(temp.path(), "src/html/old.html", "<p>old</p>");
    write(temp.path(), "src/extra.html", "<p>extra</p>");

    graph.run("build:dist").await.unwrap();
    assert!(dist.join("html/old.html").exists());
    assert!(dist.join("extra.html").exists());

    fs::remove_file(temp.path().join("src/html/old.html")).unwrap();
    fs::remove_file(temp.path().join("src/extra.html")).unwrap();
    graph.run("build:dist").await.unwrap();

    assert!(!dist.join("html/old.html").exists());
    assert!(!dist.join("extra.html").exists());
    assert!(dist.join("html/about.html").exists());
    assert!(dist.join("index.html").exists());
    assert!(dist.join("css/spaces.css").exists());
}

#[tokio::test]
async fn dist_build_with_stylesheet_error_keeps_previous_dist_css() {
    let temp = fixture();
    let graph = graph(temp.path());
    let css_path = temp.path().join("dist/css/spaces.css");

    graph.run("build:dist").await.unwrap();
    let before = fs::read(&css_path).unwrap();

    write(
        temp.path(),
        "src/scss/spaces/_base.scss",
        ".grid {\n  display: flex;\n",
    );
    let err = graph.run("build:dist").await.unwrap_err();

    assert_eq!(err.task(), "copy:dist:css");
    let message = err.to_string();
    assert!(
        message.starts_with("Task 'copy:dist:css' failed: sass:"),
        "{message}"
    );
    assert!(message.contains("spaces.scss"), "{message}");
    assert_eq!(fs::read(&css_path).unwrap(), before);
}

#[tokio::test]
async fn dev_build_keeps_css_readable() {
    let temp = fixture();
    let graph = graph(temp.path());

    let report = graph.run("build:dev").await.unwrap();
    assert_eq!(report.tasks.first().map(String::as_str), Some("copy:dev:css"));

    let css = fs::read_to_string(temp.path().join("html&css/css/spaces.css")).unwrap();
    assert!(css.contains("\n"), "{css}");
    assert!(css.contains("gap: 8px"), "{css}");
}

#[tokio::test]
async fn stylesheet_syntax_error_keeps_previous_css() {
    let temp = fixture();
    let graph = graph(temp.path());
    let css_path = temp.path().join(".temp/css/spaces.css");

    graph.run("scss").await.unwrap();
    let before = fs::read(&css_path).unwrap();

    write(
        temp.path(),
        "src/scss/spaces/_base.scss",
        ".grid {\n  display: flex;\n",
    );
    let mut events = graph.events().subscribe();
    let err = graph.run("scss").await.unwrap_err();

    assert!(matches!(err, TaskError::Failed { ref task, .. } if task == "scss"));
    assert_eq!(fs::read(&css_path).unwrap(), before);
    match events.recv().await.unwrap() {
        BuildEvent::Failed { task, message } => {
            assert_eq!(task, "scss");
            assert!(message.starts_with("sass:"), "{message}");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn serve_build_populates_temp_target() {
    let temp = fixture();
    let project = Project::load(&temp.path().join("sluice.toml")).unwrap();
    let graph =
        build_graph(&project, &TransformRegistry::with_builtins(), EventBus::default()).unwrap();

    let report = graph.run_all(&project.serve().build).await.unwrap();

    assert_eq!(
        report.tasks,
        vec!["scss", "html", "docs", "index", "assets", "vendor"]
    );
    let temp_root = temp.path().join(".temp");
    assert!(temp_root.join("css/spaces.css").exists());
    assert!(temp_root.join("index.html").exists());
    assert!(!temp_root.join("node_modules").exists());
}
